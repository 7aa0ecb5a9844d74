// SPDX-License-Identifier: Apache-2.0
//! The uniform response envelope (spec §7, §4.8).

use crate::error::{CoreError, ErrorCode};
use serde::{Deserialize, Serialize};

/// Error details attached to a failed envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Stable upper-snake-case code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Optional structured diagnostic details.
    pub details: Option<serde_json::Value>,
    /// Optional retry hint in seconds.
    pub retry_after_seconds: Option<u64>,
}

impl From<&CoreError> for ErrorPayload {
    fn from(err: &CoreError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            details: None,
            retry_after_seconds: err.retry_after_seconds(),
        }
    }
}

/// The uniform response envelope every `Analyze`-family operation returns
/// (spec §7):
/// `{ success, from_cache, processing_time_ms, result?, error? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the request completed successfully.
    pub success: bool,
    /// Whether `result` was served from the cache rather than freshly computed.
    pub from_cache: bool,
    /// Wall-clock processing time for this request.
    pub processing_time_ms: u64,
    /// The artifact, present iff `success`.
    pub result: Option<T>,
    /// Error details, present iff `!success`.
    pub error: Option<ErrorPayload>,
}

impl<T> Envelope<T> {
    /// Build a successful envelope.
    pub fn ok(result: T, from_cache: bool, processing_time_ms: u64) -> Self {
        Self {
            success: true,
            from_cache,
            processing_time_ms,
            result: Some(result),
            error: None,
        }
    }

    /// Build a failed envelope from a [`CoreError`].
    pub fn err(error: &CoreError, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            from_cache: false,
            processing_time_ms,
            result: None,
            error: Some(ErrorPayload::from(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_has_no_error() {
        let envelope = Envelope::ok(42, true, 5);
        assert!(envelope.success);
        assert!(envelope.from_cache);
        assert_eq!(envelope.result, Some(42));
        assert!(envelope.error.is_none());
    }

    #[test]
    fn err_envelope_carries_code() {
        let err = CoreError::NotFound {
            what: "image_hash".into(),
        };
        let envelope: Envelope<()> = Envelope::err(&err, 3);
        assert!(!envelope.success);
        assert_eq!(envelope.error.unwrap().code, ErrorCode::NotFoundError);
    }
}
