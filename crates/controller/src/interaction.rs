use client_sdk::{ApiReply, KvApi};
use common::PutRequest;
use tracing::{debug, trace};

use crate::outcome::{
    Field, GET_PROMPT, InteractionError, Operation, Outcome, PUT_PROMPT, Phase,
};

/// Runs the put/get/compact flows against a store and turns each reply into
/// an [`Outcome`]. Holds no UI state: current input comes in as arguments.
#[derive(Debug, Clone)]
pub struct InteractionController<A> {
    api: A,
}

impl<A: KvApi> InteractionController<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn submit_put(&self, key: &str, value: &str) -> Outcome {
        let outcome = match self.put_inner(key, value).await {
            Ok(message) => Outcome::success(Operation::Put, format!("Put successful: {message}"))
                .with_cleared_fields(&[Field::PutKey, Field::PutValue]),
            Err(err) => Outcome::failure(Operation::Put, &err),
        };
        finish(outcome)
    }

    pub async fn fetch_get(&self, key: &str) -> Outcome {
        let outcome = match self.get_inner(key).await {
            Ok(message) => Outcome::success(Operation::Get, message),
            Err(err) => Outcome::failure(Operation::Get, &err),
        };
        finish(outcome)
    }

    pub async fn trigger_compact(&self) -> Outcome {
        let outcome = match self.compact_inner().await {
            Ok(message) => Outcome::success(Operation::Compact, format!("Compaction: {message}")),
            Err(err) => Outcome::failure(Operation::Compact, &err),
        };
        finish(outcome)
    }

    async fn put_inner(&self, key: &str, value: &str) -> Result<String, InteractionError> {
        enter(Operation::Put, Phase::Validating);
        if key.is_empty() || value.is_empty() {
            return Err(InteractionError::Validation(PUT_PROMPT));
        }

        enter(Operation::Put, Phase::Requesting);
        let request = PutRequest {
            key: key.to_string(),
            value: value.to_string(),
        };
        match self.api.put(&request).await? {
            ApiReply::Success(reply) => Ok(reply.message),
            ApiReply::Rejected { error, .. } => Err(InteractionError::Server(error)),
        }
    }

    async fn get_inner(&self, key: &str) -> Result<String, InteractionError> {
        enter(Operation::Get, Phase::Validating);
        if key.is_empty() {
            return Err(InteractionError::Validation(GET_PROMPT));
        }

        enter(Operation::Get, Phase::Requesting);
        match self.api.get(key).await? {
            ApiReply::Success(result) if result.found => {
                Ok(format!("Key: {}, Value: {}", result.key, result.value))
            }
            ApiReply::Success(result) => Err(InteractionError::NotFound {
                // fall back to the requested key when the store omits `Key`
                key: if result.key.is_empty() {
                    key.to_string()
                } else {
                    result.key
                },
            }),
            ApiReply::Rejected { error, .. } => Err(InteractionError::Server(error)),
        }
    }

    async fn compact_inner(&self) -> Result<String, InteractionError> {
        // nothing to validate
        enter(Operation::Compact, Phase::Validating);
        enter(Operation::Compact, Phase::Requesting);
        match self.api.compact().await? {
            ApiReply::Success(reply) => Ok(reply.message),
            ApiReply::Rejected { error, .. } => Err(InteractionError::Server(error)),
        }
    }
}

fn enter(operation: Operation, phase: Phase) {
    trace!(operation = operation.as_str(), ?phase, "interaction phase");
}

fn finish(outcome: Outcome) -> Outcome {
    debug!(
        operation = outcome.operation.as_str(),
        phase = ?Phase::from(outcome.kind),
        message = %outcome.message,
        "interaction finished"
    );
    outcome
}
