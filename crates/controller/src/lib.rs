//! Put/get/compact interaction flows for the key-value store and the status
//! board that presents their outcomes.

mod board;
mod interaction;
mod outcome;

pub use board::{Applied, InputFields, Pending, Session, StatusBoard, StatusLine, Ticket};
pub use interaction::InteractionController;
pub use outcome::{
    Field, GET_PROMPT, InteractionError, Operation, Outcome, OutcomeKind, PUT_PROMPT, Phase,
};
