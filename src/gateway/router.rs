//! Priority-ordered fallback across candidate models.
//!
//! [`ModelRouter::reason`] tries each candidate strictly in configured
//! order, consults the allowlist before spending a network call, classifies
//! every failure, and returns the first success or a terminal aggregate
//! failure. One invocation serves one reasoning request end to end; no two
//! provider calls within it run concurrently. The router holds no mutable
//! state, so a single instance is shared safely across concurrent missions.

use crate::gateway::allowlist::{ModelAllowlist, ModelNotAllowed};
use crate::gateway::classify::{FailureClass, ProviderError};
use crate::gateway::trace::TraceContext;
use crate::gateway::types::{LlmResponse, ModelId, Prompt, ProviderKind, TokenUsage};
use crate::observe::{AttemptObserver, TracingObserver, estimate_tokens};
use crate::providers::ProviderRegistry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Why one candidate did not produce the winning response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    NotAllowed(#[from] ModelNotAllowed),
    #[error("no adapter registered for provider '{0}'")]
    NoAdapter(ProviderKind),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// One entry of the exhaustion report: which model failed and why.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{model}: {error}")]
pub struct AttemptFailure {
    pub model: ModelId,
    pub error: AttemptError,
}

/// Terminal outcome of one `reason()` call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Sequence-fatal misconfiguration detected before any attempt.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Every candidate was tried and none succeeded. Failures are listed in
    /// attempt order so callers can diagnose the whole sequence.
    #[error("all {} candidate models failed", .failures.len())]
    AllModelsExhausted { failures: Vec<AttemptFailure> },
    /// The caller aborted the mission while an attempt was in flight.
    #[error("reasoning cancelled")]
    Cancelled,
    /// A provider reported a failure that no other candidate could fix;
    /// remaining candidates were abandoned.
    #[error("fatal failure from '{model}': {source}")]
    Fatal {
        model: ModelId,
        #[source]
        source: ProviderError,
    },
}

impl From<crate::gateway::types::PromptError> for GatewayError {
    fn from(err: crate::gateway::types::PromptError) -> Self {
        GatewayError::Configuration(err.to_string())
    }
}

/// Outcome of one attempt, kept for observability.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Succeeded,
    Failed { class: FailureClass, message: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded)
    }
}

/// Record of one candidate attempt within a fallback sequence.
///
/// `request_id` is `None` when the candidate never reached its adapter
/// (allowlist rejection, missing adapter). `usage` is present only for
/// successful calls whose provider reported it.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub model: ModelId,
    pub request_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub latency: Duration,
    pub usage: Option<TokenUsage>,
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    fn skipped(model: ModelId, message: String) -> Self {
        Self {
            model,
            request_id: None,
            started_at: Utc::now(),
            latency: Duration::ZERO,
            usage: None,
            outcome: AttemptOutcome::Failed {
                class: FailureClass::ModelFatal,
                message,
            },
        }
    }
}

/// The winning response plus the full attempt history of the sequence.
#[derive(Debug)]
pub struct Reply {
    pub response: LlmResponse,
    pub attempts: Vec<AttemptRecord>,
}

impl Reply {
    pub fn winning_model(&self) -> &ModelId {
        &self.response.model
    }

    /// Usage summed across every attempt that reported it. Callers that
    /// meter cost per mission want this rather than the winner's usage
    /// alone.
    pub fn total_usage(&self) -> Option<TokenUsage> {
        self.attempts
            .iter()
            .filter_map(|a| a.usage)
            .reduce(TokenUsage::combined)
    }
}

/// Priority router over interchangeable LLM providers.
pub struct ModelRouter {
    allowlist: ModelAllowlist,
    providers: ProviderRegistry,
    attempt_timeout: Duration,
    observer: Arc<dyn AttemptObserver>,
}

impl ModelRouter {
    pub fn new(
        allowlist: ModelAllowlist,
        providers: ProviderRegistry,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            allowlist,
            providers,
            attempt_timeout,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Try `candidates` in order until one succeeds.
    ///
    /// Candidate order is respected exactly as given: no reordering, no
    /// deduplication, first success wins. Per-candidate failures never
    /// escape on their own; the caller sees either the winning [`Reply`],
    /// a sequence-fatal error, the aggregate
    /// [`GatewayError::AllModelsExhausted`], or
    /// [`GatewayError::Cancelled`].
    pub async fn reason(
        &self,
        prompt: &Prompt,
        candidates: &[ModelId],
        trace: &TraceContext,
        cancel: &CancellationToken,
    ) -> Result<Reply, GatewayError> {
        if candidates.is_empty() {
            return Err(GatewayError::Configuration(
                "no candidate models configured".to_string(),
            ));
        }
        if self.allowlist.is_empty() {
            return Err(GatewayError::Configuration(
                "model allowlist is empty".to_string(),
            ));
        }

        let prompt_chars: usize = prompt.messages().iter().map(|m| m.content().len()).sum();
        debug!(
            correlation_id = %trace.correlation_id(),
            candidates = candidates.len(),
            est_prompt_tokens = estimate_tokens(prompt_chars),
            "starting fallback sequence"
        );

        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(candidates.len());
        let mut failures: Vec<AttemptFailure> = Vec::new();

        for candidate in candidates {
            if let Err(rejection) = self.allowlist.assert_allowed(candidate) {
                self.record_skip(trace, &mut attempts, candidate, rejection.to_string());
                failures.push(AttemptFailure {
                    model: candidate.clone(),
                    error: rejection.into(),
                });
                continue;
            }

            let Some(adapter) = self.providers.get(candidate.provider()) else {
                let error = AttemptError::NoAdapter(candidate.provider());
                self.record_skip(trace, &mut attempts, candidate, error.to_string());
                failures.push(AttemptFailure {
                    model: candidate.clone(),
                    error,
                });
                continue;
            };

            let attempt_trace = trace.for_attempt();
            let started_at = Utc::now();
            let started = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                result = tokio::time::timeout(
                    self.attempt_timeout,
                    adapter.generate(prompt, candidate, &attempt_trace),
                ) => match result {
                    Ok(inner) => inner,
                    Err(_) => Err(ProviderError::Timeout(format!(
                        "no response within {:?}",
                        self.attempt_timeout
                    ))),
                },
            };
            let latency = started.elapsed();

            match outcome {
                Ok(response) => {
                    let record = AttemptRecord {
                        model: candidate.clone(),
                        request_id: attempt_trace.request_id(),
                        started_at,
                        latency,
                        usage: response.usage,
                        outcome: AttemptOutcome::Succeeded,
                    };
                    self.observer.record_attempt(trace.correlation_id(), &record);
                    attempts.push(record);
                    return Ok(Reply { response, attempts });
                }
                Err(error) => {
                    let class = error.classify();
                    let record = AttemptRecord {
                        model: candidate.clone(),
                        request_id: attempt_trace.request_id(),
                        started_at,
                        latency,
                        usage: None,
                        outcome: AttemptOutcome::Failed {
                            class,
                            message: error.to_string(),
                        },
                    };
                    self.observer.record_attempt(trace.correlation_id(), &record);
                    attempts.push(record);

                    if class.aborts_sequence() {
                        return Err(GatewayError::Fatal {
                            model: candidate.clone(),
                            source: error,
                        });
                    }
                    failures.push(AttemptFailure {
                        model: candidate.clone(),
                        error: error.into(),
                    });
                }
            }
        }

        Err(GatewayError::AllModelsExhausted { failures })
    }

    fn record_skip(
        &self,
        trace: &TraceContext,
        attempts: &mut Vec<AttemptRecord>,
        candidate: &ModelId,
        message: String,
    ) {
        let record = AttemptRecord::skipped(candidate.clone(), message);
        self.observer.record_attempt(trace.correlation_id(), &record);
        attempts.push(record);
    }
}
