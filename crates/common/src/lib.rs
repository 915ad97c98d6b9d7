use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PutRequest {
    pub key: String,
    pub value: String,
}

/// Success body shared by `/put` and `/compact`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

pub type PutResponse = MessageResponse;
pub type CompactResponse = MessageResponse;

/// Success body of `/get/{key}`.
///
/// The store answers with capitalized `Key`/`Value` next to a lowercase
/// `found`; that casing is kept on the wire. Lowercase `key`/`value` are
/// accepted on decode as well, and a not-found body may omit `Value`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetResult {
    pub found: bool,
    #[serde(rename = "Key", alias = "key", default)]
    pub key: String,
    #[serde(rename = "Value", alias = "value", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }
}
