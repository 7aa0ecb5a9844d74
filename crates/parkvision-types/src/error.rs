// SPDX-License-Identifier: Apache-2.0
//! Core error taxonomy (spec §7). Every variant carries a stable
//! upper-snake-case [`ErrorCode`] so the coordinator can build a
//! [`crate::envelope::ErrorPayload`] without re-deriving the code from the
//! error's `Display` text.

use thiserror::Error;

/// Stable, upper-snake-case error code surfaced to clients.
///
/// `CacheError` deliberately has no code here — per spec §7 it is never
/// surfaced to clients; callers must handle it before it reaches an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed input, out-of-range parameter, or unsupported format.
    ValidationError,
    /// Unknown `image_hash` or cache key when one was required.
    NotFoundError,
    /// Carried through from the (external) rate-limit collaborator.
    RateLimitExceeded,
    /// Transient upstream vision-provider failure.
    VisionServiceError,
    /// Object-store failure.
    StorageError,
    /// Circuit-open or a required collaborator is down.
    ServiceUnavailableError,
    /// Operation exceeded its deadline.
    TimeoutError,
    /// Catch-all for internal transform failures.
    ProcessingError,
}

impl ErrorCode {
    /// The stable upper-snake-case string sent to clients.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFoundError => "NOT_FOUND_ERROR",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::VisionServiceError => "VISION_SERVICE_ERROR",
            Self::StorageError => "STORAGE_ERROR",
            Self::ServiceUnavailableError => "SERVICE_UNAVAILABLE_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::ProcessingError => "PROCESSING_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "VALIDATION_ERROR" => Ok(Self::ValidationError),
            "NOT_FOUND_ERROR" => Ok(Self::NotFoundError),
            "RATE_LIMIT_EXCEEDED" => Ok(Self::RateLimitExceeded),
            "VISION_SERVICE_ERROR" => Ok(Self::VisionServiceError),
            "STORAGE_ERROR" => Ok(Self::StorageError),
            "SERVICE_UNAVAILABLE_ERROR" => Ok(Self::ServiceUnavailableError),
            "TIMEOUT_ERROR" => Ok(Self::TimeoutError),
            "PROCESSING_ERROR" => Ok(Self::ProcessingError),
            other => Err(serde::de::Error::custom(format!(
                "unknown error code: {other}"
            ))),
        }
    }
}

/// Core error taxonomy shared across every `parkvision-*` component.
///
/// `Cache` is intentionally excluded — per spec §7 a cache failure degrades
/// the request to MISS-and-skip-write and is logged, never surfaced.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `spec.md` §7 `ValidationError` (400).
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable explanation.
        message: String,
    },

    /// `spec.md` §7 `NotFoundError` (404).
    #[error("not found: {what}")]
    NotFound {
        /// What was not found (e.g. `"image_hash"`).
        what: String,
    },

    /// `spec.md` §7 `RateLimitExceeded` (429).
    #[error("rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimitExceeded {
        /// Hint for when the client may retry.
        retry_after_seconds: u64,
    },

    /// `spec.md` §7 `VisionServiceError` (502).
    #[error("vision service error: {message}")]
    VisionService {
        /// Human-readable explanation.
        message: String,
        /// Whether the failure is transient (safe to retry) per spec §4.7.
        transient: bool,
        /// Optional hint for when to retry.
        retry_after_seconds: Option<u64>,
    },

    /// `spec.md` §7 `StorageError` (502).
    #[error("storage error: {message}")]
    Storage {
        /// Human-readable explanation.
        message: String,
        /// Whether the failure is transient (safe to retry).
        transient: bool,
    },

    /// `spec.md` §7 `ServiceUnavailableError` (503).
    #[error("service unavailable: {message}")]
    ServiceUnavailable {
        /// Human-readable explanation.
        message: String,
        /// Hint for when the client may retry (e.g. circuit recovery time).
        retry_after_seconds: u64,
    },

    /// `spec.md` §7 `TimeoutError` (504).
    #[error("operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// How long the operation ran before timing out.
        elapsed_ms: u64,
    },

    /// `spec.md` §7 `ProcessingError` (500) — catch-all for internal transform
    /// failures.
    #[error("processing error in {operation}: {context}")]
    Processing {
        /// The operation that failed (e.g. `"nature_analysis"`).
        operation: String,
        /// Diagnostic context.
        context: String,
    },
}

impl CoreError {
    /// Map this error to its stable [`ErrorCode`].
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { .. } => ErrorCode::ValidationError,
            Self::NotFound { .. } => ErrorCode::NotFoundError,
            Self::RateLimitExceeded { .. } => ErrorCode::RateLimitExceeded,
            Self::VisionService { .. } => ErrorCode::VisionServiceError,
            Self::Storage { .. } => ErrorCode::StorageError,
            Self::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailableError,
            Self::Timeout { .. } => ErrorCode::TimeoutError,
            Self::Processing { .. } => ErrorCode::ProcessingError,
        }
    }

    /// `retry_after_seconds` to surface in an envelope, if any.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::RateLimitExceeded {
                retry_after_seconds,
            }
            | Self::ServiceUnavailable {
                retry_after_seconds,
                ..
            } => Some(*retry_after_seconds),
            Self::VisionService {
                retry_after_seconds,
                ..
            } => *retry_after_seconds,
            _ => None,
        }
    }

    /// Whether a per-job retry policy (spec §4.7) should retry this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable { .. } | Self::Timeout { .. }
        ) || matches!(self, Self::VisionService { transient: true, .. })
            || matches!(self, Self::Storage { transient: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_is_not_transient() {
        let err = CoreError::Validation {
            message: "bad".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn transient_vision_error_is_retryable() {
        let err = CoreError::VisionService {
            message: "5xx".into(),
            transient: true,
            retry_after_seconds: Some(3),
        };
        assert!(err.is_transient());
        assert_eq!(err.retry_after_seconds(), Some(3));
    }

    #[test]
    fn terminal_vision_error_is_not_retryable() {
        let err = CoreError::VisionService {
            message: "bad request".into(),
            transient: false,
            retry_after_seconds: None,
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn error_code_strings_are_upper_snake_case() {
        assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
        assert_eq!(ErrorCode::NotFoundError.as_str(), "NOT_FOUND_ERROR");
        assert_eq!(
            ErrorCode::ServiceUnavailableError.as_str(),
            "SERVICE_UNAVAILABLE_ERROR"
        );
    }
}
