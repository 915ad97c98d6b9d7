use std::sync::Arc;

use client_sdk::KvApi;
use tokio::sync::Mutex;
use tracing::debug;

use crate::interaction::InteractionController;
use crate::outcome::{Field, Operation, Outcome, OutcomeKind, Phase};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub kind: OutcomeKind,
}

impl StatusLine {
    pub fn style(&self) -> &'static str {
        self.kind.style()
    }
}

/// Identifies one invocation on a status slot. Sequence numbers grow per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    operation: Operation,
    seq: u64,
}

impl Ticket {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputFields {
    pub put_key: String,
    pub put_value: String,
    pub get_key: String,
}

impl InputFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::PutKey => &self.put_key,
            Field::PutValue => &self.put_value,
            Field::GetKey => &self.get_key,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::PutKey => self.put_key = value,
            Field::PutValue => self.put_value = value,
            Field::GetKey => self.get_key = value,
        }
    }

    pub fn clear(&mut self, fields: &[Field]) {
        for field in fields {
            self.set(*field, String::new());
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    issued: u64,
    applied: Option<u64>,
    phase: Phase,
    line: Option<StatusLine>,
}

/// Display state: one status slot per operation plus the input fields.
///
/// Outcomes are applied through tickets so a reply that resolves after a
/// newer one on the same slot cannot overwrite it.
#[derive(Debug, Default)]
pub struct StatusBoard {
    put: Slot,
    get: Slot,
    compact: Slot,
    fields: InputFields,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &InputFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut InputFields {
        &mut self.fields
    }

    pub fn status(&self, operation: Operation) -> Option<&StatusLine> {
        self.slot(operation).line.as_ref()
    }

    pub fn phase(&self, operation: Operation) -> Phase {
        self.slot(operation).phase
    }

    pub fn begin(&mut self, operation: Operation) -> Ticket {
        let slot = self.slot_mut(operation);
        slot.issued += 1;
        slot.phase = Phase::Requesting;
        Ticket {
            operation,
            seq: slot.issued,
        }
    }

    /// Applies `outcome` unless a newer invocation on the same slot has
    /// already been applied. Returns whether the board changed.
    pub fn apply(&mut self, ticket: Ticket, outcome: &Outcome) -> bool {
        let slot = self.slot_mut(ticket.operation);
        if slot.applied.is_some_and(|last| ticket.seq < last) {
            debug!(
                operation = ticket.operation.as_str(),
                seq = ticket.seq,
                "ignoring superseded outcome"
            );
            return false;
        }

        slot.applied = Some(ticket.seq);
        slot.phase = if ticket.seq == slot.issued {
            Phase::from(outcome.kind)
        } else {
            Phase::Requesting
        };
        slot.line = Some(StatusLine {
            text: outcome.message.clone(),
            kind: outcome.kind,
        });
        self.fields.clear(&outcome.cleared_fields);
        true
    }

    fn slot(&self, operation: Operation) -> &Slot {
        match operation {
            Operation::Put => &self.put,
            Operation::Get => &self.get,
            Operation::Compact => &self.compact,
        }
    }

    fn slot_mut(&mut self, operation: Operation) -> &mut Slot {
        match operation {
            Operation::Put => &mut self.put,
            Operation::Get => &mut self.get,
            Operation::Compact => &mut self.compact,
        }
    }
}

/// An invocation whose ticket is issued and whose input was captured.
#[derive(Debug, Clone)]
pub struct Pending {
    ticket: Ticket,
    fields: InputFields,
}

impl Pending {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

#[derive(Debug, Clone)]
pub struct Applied {
    pub ticket: Ticket,
    pub outcome: Outcome,
    pub applied: bool,
}

/// A controller bound to a shared board. Invocations may overlap; each
/// captures its input at `begin` and applies its outcome on completion.
pub struct Session<A> {
    controller: Arc<InteractionController<A>>,
    board: Arc<Mutex<StatusBoard>>,
}

impl<A> Clone for Session<A> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            board: Arc::clone(&self.board),
        }
    }
}

impl<A: KvApi> Session<A> {
    pub fn new(api: A) -> Self {
        Self {
            controller: Arc::new(InteractionController::new(api)),
            board: Arc::new(Mutex::new(StatusBoard::new())),
        }
    }

    pub fn board(&self) -> Arc<Mutex<StatusBoard>> {
        Arc::clone(&self.board)
    }

    /// Lets `edit` update the input fields, then snapshots them and issues
    /// a ticket, all under one lock.
    pub async fn begin(
        &self,
        operation: Operation,
        edit: impl FnOnce(&mut InputFields),
    ) -> Pending {
        let mut board = self.board.lock().await;
        edit(board.fields_mut());
        Pending {
            fields: board.fields().clone(),
            ticket: board.begin(operation),
        }
    }

    pub async fn complete(&self, pending: Pending) -> Applied {
        let Pending { ticket, fields } = pending;
        let outcome = match ticket.operation {
            Operation::Put => {
                self.controller
                    .submit_put(&fields.put_key, &fields.put_value)
                    .await
            }
            Operation::Get => self.controller.fetch_get(&fields.get_key).await,
            Operation::Compact => self.controller.trigger_compact().await,
        };

        let applied = self.board.lock().await.apply(ticket, &outcome);
        Applied {
            ticket,
            outcome,
            applied,
        }
    }

    /// Runs `operation` with the current field contents.
    pub async fn submit(&self, operation: Operation) -> Applied {
        let pending = self.begin(operation, |_| {}).await;
        self.complete(pending).await
    }
}
