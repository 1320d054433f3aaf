//! # Factory Gateway
//!
//! Reasoning gateway for software-factory agents: turns a prompt into a
//! validated, metered response from one of several interchangeable LLM
//! providers, with automatic fallback across a prioritized list of models
//! when a provider fails.
//!
//! ## Architecture Overview
//!
//! - **[`gateway`]**: The core router with allowlist enforcement, failure
//!   classification, and trace/metric propagation
//! - **[`providers`]**: One adapter per vendor (OpenAI, Anthropic, Gemini,
//!   DeepSeek) behind a single capability interface
//! - **[`observe`]**: Per-attempt observability events
//! - **[`config`]**: Settings discovery, environment overrides
//! - **[`cli`]**: Command-line interface for the `fgw` binary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use factory_gateway::config::ConfigDiscovery;
//! use factory_gateway::gateway::{ModelRouter, Prompt, TraceContext};
//! use factory_gateway::providers::ProviderRegistry;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = ConfigDiscovery::discover()?;
//!     let router = ModelRouter::new(
//!         settings.allowlist(),
//!         ProviderRegistry::from_settings(&settings)?,
//!         settings.attempt_timeout(),
//!     );
//!
//!     let prompt = Prompt::from_text(Some("You review merge requests."), "Review this diff")?;
//!     let reply = router
//!         .reason(
//!             &prompt,
//!             &settings.priority()?,
//!             &TraceContext::new(),
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!
//!     println!("{} answered: {}", reply.winning_model(), reply.response.content);
//!     Ok(())
//! }
//! ```

/// The reasoning core: priority router, allowlist, failure classification,
/// trace context, and the value types they share.
pub mod gateway;

/// Provider adapters, one per vendor, behind a single capability interface
/// selected via a lookup table.
pub mod providers;

/// Observability sink receiving one event per provider attempt.
pub mod observe;

/// Configuration discovery and loading.
pub mod config;

/// Command-line interface for the `fgw` binary.
pub mod cli;

/// Environment constants and path utilities.
pub mod env;

// Re-export the core surface
pub use gateway::{
    FailureClass, GatewayError, GenerationOptions, LlmResponse, Message, MessageRole,
    ModelAllowlist, ModelId, ModelRouter, OutputFormat, Prompt, ProviderError, ProviderKind,
    Reply, StructuredOutputSchema, TokenUsage, TraceContext,
};
pub use providers::{ProviderAdapter, ProviderRegistry};
