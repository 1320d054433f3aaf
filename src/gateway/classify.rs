//! Failure classification for provider attempts.
//!
//! Every provider adapter reports failures as a [`ProviderError`], and the
//! router decides what to do next from its [`FailureClass`]. The fallback
//! unit is "try another model", so almost everything classifies as
//! retryable-at-the-sequence-level; only failures that no other model could
//! fix abort the whole sequence.

use chrono::{DateTime, Utc};
use std::fmt;

/// A classified failure raised by one provider attempt.
///
/// The classification is decided once, at the point the failure is mapped
/// from transport or wire metadata; it is never re-classified later.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        reset_at: Option<DateTime<Utc>>,
    },
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unexpected HTTP status {status}: {message}")]
    Unexpected { status: u16, message: String },
}

/// What the router should do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Transient provider-side condition; advance to the next candidate.
    Retryable,
    /// This model will not work, but another candidate still may.
    ModelFatal,
    /// Independent of model choice; abort the whole fallback sequence.
    SequenceFatal,
}

impl FailureClass {
    pub fn aborts_sequence(&self) -> bool {
        matches!(self, FailureClass::SequenceFatal)
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureClass::Retryable => "retryable",
            FailureClass::ModelFatal => "model-fatal",
            FailureClass::SequenceFatal => "sequence-fatal",
        };
        f.write_str(s)
    }
}

impl ProviderError {
    /// Map an HTTP status to a classified failure.
    ///
    /// 429 and 5xx are transient. 401/403 mean the vendor credentials are
    /// broken, 404 means the model does not exist at this vendor; both still
    /// allow moving on to the next candidate. 400/422 mean the request
    /// payload itself was rejected, which no other model would accept.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => ProviderError::RateLimited {
                message,
                reset_at: None,
            },
            500..=599 => ProviderError::Unavailable(message),
            401 | 403 => ProviderError::Authentication(message),
            404 => ProviderError::ModelUnavailable(message),
            400 | 422 => ProviderError::InvalidRequest(message),
            _ => ProviderError::Unexpected { status, message },
        }
    }

    pub fn classify(&self) -> FailureClass {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Network(_)
            | ProviderError::Unavailable(_)
            | ProviderError::MalformedResponse(_) => FailureClass::Retryable,
            ProviderError::Authentication(_)
            | ProviderError::ModelUnavailable(_)
            | ProviderError::Unexpected { .. } => FailureClass::ModelFatal,
            ProviderError::InvalidRequest(_) => FailureClass::SequenceFatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.classify() == FailureClass::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_failures_are_retryable() {
        let errors = [
            ProviderError::RateLimited {
                message: "slow down".to_string(),
                reset_at: None,
            },
            ProviderError::Timeout("no response within 30s".to_string()),
            ProviderError::Network("connection reset".to_string()),
            ProviderError::Unavailable("upstream 503".to_string()),
            ProviderError::MalformedResponse("truncated JSON".to_string()),
        ];
        for err in errors {
            assert_eq!(err.classify(), FailureClass::Retryable, "{err}");
        }
    }

    #[test]
    fn per_model_failures_do_not_abort_the_sequence() {
        let errors = [
            ProviderError::Authentication("bad key".to_string()),
            ProviderError::ModelUnavailable("no such model".to_string()),
            ProviderError::Unexpected {
                status: 402,
                message: "payment required".to_string(),
            },
        ];
        for err in errors {
            assert_eq!(err.classify(), FailureClass::ModelFatal, "{err}");
            assert!(!err.classify().aborts_sequence());
        }
    }

    #[test]
    fn invalid_request_is_sequence_fatal() {
        let err = ProviderError::InvalidRequest("messages must be non-empty".to_string());
        assert_eq!(err.classify(), FailureClass::SequenceFatal);
        assert!(err.classify().aborts_sequence());
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            ProviderError::from_status(429, String::new()),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(503, String::new()),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            ProviderError::from_status(401, String::new()),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            ProviderError::from_status(404, String::new()),
            ProviderError::ModelUnavailable(_)
        ));
        assert!(matches!(
            ProviderError::from_status(400, String::new()),
            ProviderError::InvalidRequest(_)
        ));
        assert!(matches!(
            ProviderError::from_status(418, String::new()),
            ProviderError::Unexpected { status: 418, .. }
        ));
    }
}
