//! The reasoning gateway core.
//!
//! Turns an agent's prompt into a validated, metered response from one of
//! several interchangeable LLM providers, falling back across a prioritized
//! candidate list when a provider fails. The router consults the allowlist
//! before every attempt, classifies failures as retryable or fatal, and
//! threads trace correlation and token accounting through the whole
//! sequence.

pub mod allowlist;
pub mod classify;
pub mod router;
pub mod trace;
pub mod types;


pub use allowlist::{ModelAllowlist, ModelNotAllowed};
pub use classify::{FailureClass, ProviderError};
pub use router::{
    AttemptError, AttemptFailure, AttemptOutcome, AttemptRecord, GatewayError, ModelRouter, Reply,
};
pub use trace::TraceContext;
pub use types::{
    GenerationOptions, LlmResponse, Message, MessageRole, ModelId, ModelIdError, OutputFormat,
    Prompt, PromptError, ProviderKind, StructuredOutputSchema, TokenUsage,
};
