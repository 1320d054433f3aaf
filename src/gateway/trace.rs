use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation metadata for one logical mission.
///
/// The `correlation_id` is fixed for the life of the mission and shared by
/// every downstream call it makes. Each individual provider attempt gets its
/// own `request_id` via [`TraceContext::for_attempt`]; the original value is
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    correlation_id: Uuid,
    request_id: Option<Uuid>,
}

impl TraceContext {
    /// Start a trace for a new mission with a fresh correlation id.
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            request_id: None,
        }
    }

    /// Continue a trace started elsewhere (e.g. carried in from a ticket
    /// webhook) under its existing correlation id.
    pub fn with_correlation(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            request_id: None,
        }
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn request_id(&self) -> Option<Uuid> {
        self.request_id
    }

    /// Derive the trace for one provider attempt: same correlation id, fresh
    /// request id.
    pub fn for_attempt(&self) -> Self {
        Self {
            correlation_id: self.correlation_id,
            request_id: Some(Uuid::new_v4()),
        }
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new()
    }
}
