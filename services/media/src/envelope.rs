//! Uniform success/failure shape handed to presentation code

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, MediaError};

/// `{"success": true, "data": …}` or `{"success": false, "error": "…", "kind": "…"}`.
///
/// A failed metadata write also carries `orphaned_key`, the blob left behind
/// without a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphaned_key: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
            orphaned_key: None,
        }
    }

    pub fn failure(error: &MediaError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
            orphaned_key: error.orphaned_key().map(str::to_string),
        }
    }
}

impl<T> From<Result<T, MediaError>> for Envelope<T> {
    fn from(result: Result<T, MediaError>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(err) => Envelope::failure(&err),
        }
    }
}
