//! Observability sink for provider attempts.
//!
//! The router emits one event per attempt through an [`AttemptObserver`];
//! it does not own the sink's transport. The default [`TracingObserver`]
//! forwards events to the `tracing` subscriber, which is what production
//! deployments ship to their log pipeline. Tests inject their own observer
//! to assert on emitted correlation and request ids.

use crate::gateway::router::{AttemptOutcome, AttemptRecord};
use tracing::{info, warn};
use uuid::Uuid;

/// Receives one event per candidate attempt: trace correlation id, model,
/// outcome, latency, and token usage when the provider reported it.
pub trait AttemptObserver: Send + Sync {
    fn record_attempt(&self, correlation_id: Uuid, attempt: &AttemptRecord);
}

/// Emits attempt events as structured `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn record_attempt(&self, correlation_id: Uuid, attempt: &AttemptRecord) {
        let latency_ms = attempt.latency.as_millis() as u64;
        match &attempt.outcome {
            AttemptOutcome::Succeeded => {
                info!(
                    correlation_id = %correlation_id,
                    request_id = ?attempt.request_id,
                    model = %attempt.model,
                    latency_ms,
                    input_tokens = attempt.usage.and_then(|u| u.input_tokens),
                    output_tokens = attempt.usage.and_then(|u| u.output_tokens),
                    total_tokens = attempt.usage.and_then(|u| u.total_tokens),
                    "attempt succeeded"
                );
            }
            AttemptOutcome::Failed { class, message } => {
                warn!(
                    correlation_id = %correlation_id,
                    request_id = ?attempt.request_id,
                    model = %attempt.model,
                    latency_ms,
                    class = %class,
                    "attempt failed: {message}"
                );
            }
        }
    }
}

/// Rough prompt-size estimate from a character count, ~4 chars per token.
/// Only used for log lines; never for billing.
pub fn estimate_tokens(chars: usize) -> u64 {
    chars.div_ceil(4) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(0), 0);
        assert_eq!(estimate_tokens(1), 1);
        assert_eq!(estimate_tokens(4), 1);
        assert_eq!(estimate_tokens(9), 3);
    }
}
