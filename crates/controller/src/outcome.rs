use client_sdk::TransportError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PUT_PROMPT: &str = "Please enter both key and value.";
pub const GET_PROMPT: &str = "Please enter a key.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Put,
    Get,
    Compact,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Get => "get",
            Self::Compact => "compact",
        }
    }
}

/// User input fields. Serialized names match the web page's element ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    PutKey,
    PutValue,
    GetKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    ValidationError,
    ServerError,
    NetworkError,
}

impl OutcomeKind {
    pub fn is_error(self) -> bool {
        self != Self::Success
    }

    /// Display style; every error kind renders the same way.
    pub fn style(self) -> &'static str {
        if self.is_error() { "error" } else { "success" }
    }
}

/// Per-invocation state machine:
/// `Idle -> Validating -> {ValidationFailed | Requesting} -> {Succeeded | ServerError | NetworkError}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    ValidationFailed,
    Requesting,
    Succeeded,
    ServerError,
    NetworkError,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ValidationFailed | Self::Succeeded | Self::ServerError | Self::NetworkError
        )
    }
}

impl From<OutcomeKind> for Phase {
    fn from(kind: OutcomeKind) -> Self {
        match kind {
            OutcomeKind::Success => Self::Succeeded,
            OutcomeKind::ValidationError => Self::ValidationFailed,
            OutcomeKind::ServerError => Self::ServerError,
            OutcomeKind::NetworkError => Self::NetworkError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Error: {0}")]
    Server(String),
    #[error("Key '{key}' not found.")]
    NotFound { key: String },
    #[error("Network error: {0}")]
    Network(String),
}

impl InteractionError {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Validation(_) => OutcomeKind::ValidationError,
            Self::Server(_) | Self::NotFound { .. } => OutcomeKind::ServerError,
            Self::Network(_) => OutcomeKind::NetworkError,
        }
    }
}

impl From<TransportError> for InteractionError {
    fn from(err: TransportError) -> Self {
        Self::Network(err.describe())
    }
}

/// Result of one invocation, ready for a presentation layer to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub operation: Operation,
    pub kind: OutcomeKind,
    pub message: String,
    #[serde(default)]
    pub cleared_fields: Vec<Field>,
}

impl Outcome {
    pub fn success(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind: OutcomeKind::Success,
            message: message.into(),
            cleared_fields: Vec::new(),
        }
    }

    pub fn failure(operation: Operation, err: &InteractionError) -> Self {
        Self {
            operation,
            kind: err.kind(),
            message: err.to_string(),
            cleared_fields: Vec::new(),
        }
    }

    pub fn with_cleared_fields(mut self, fields: &[Field]) -> Self {
        self.cleared_fields = fields.to_vec();
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind.is_error()
    }
}
