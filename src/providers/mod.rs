//! Provider adapters: one concrete implementation per vendor.
//!
//! Every adapter performs the actual network call for its vendor's wire
//! format and reports failures as classified [`ProviderError`] values. The
//! router looks adapters up in a [`ProviderRegistry`] keyed by
//! [`ProviderKind`]; selection is a table lookup, not inheritance. Adapters
//! are stateless from the router's perspective; connection pooling lives
//! inside the shared `reqwest` client.

pub mod anthropic;
pub mod deepseek;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicAdapter;
pub use deepseek::DeepSeekAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

use crate::config::{ConfigError, GatewaySettings};
use crate::gateway::classify::ProviderError;
use crate::gateway::trace::TraceContext;
use crate::gateway::types::{LlmResponse, ModelId, Prompt, ProviderKind};
use futures::future::BoxFuture;
use reqwest::RequestBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Capability interface every vendor adapter implements.
///
/// `generate` performs one network call for one model and either returns a
/// validated response or a failure with enough metadata for classification.
/// Adapters never see the fallback sequence; retry-across-models is the
/// router's job.
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn generate<'a>(
        &'a self,
        prompt: &'a Prompt,
        model: &'a ModelId,
        trace: &'a TraceContext,
    ) -> BoxFuture<'a, Result<LlmResponse, ProviderError>>;
}

/// Lookup table from provider kind to its adapter.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.adapters.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Build adapters for every provider that has credentials configured.
    ///
    /// Providers without an API key are skipped with a warning rather than
    /// failing startup; candidates routed to them surface as per-model
    /// failures instead of blocking missions that never use them.
    pub fn from_settings(settings: &GatewaySettings) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let mut registry = Self::new();

        let base_url = |raw: &Option<String>, provider| -> Result<Option<Url>, ConfigError> {
            raw.as_deref()
                .map(|raw| {
                    Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
                        provider,
                        source,
                    })
                })
                .transpose()
        };

        let providers = &settings.providers;
        if let Some(key) = providers.openai.api_key.clone() {
            let base = base_url(&providers.openai.base_url, ProviderKind::OpenAi)?;
            registry.register(Arc::new(
                OpenAiAdapter::new(client.clone(), key, base)
                    .map_err(|source| ConfigError::InvalidBaseUrl {
                        provider: ProviderKind::OpenAi,
                        source,
                    })?,
            ));
        }
        if let Some(key) = providers.anthropic.api_key.clone() {
            let base = base_url(&providers.anthropic.base_url, ProviderKind::Anthropic)?;
            registry.register(Arc::new(
                AnthropicAdapter::new(client.clone(), key, base).map_err(|source| {
                    ConfigError::InvalidBaseUrl {
                        provider: ProviderKind::Anthropic,
                        source,
                    }
                })?,
            ));
        }
        if let Some(key) = providers.gemini.api_key.clone() {
            let base = base_url(&providers.gemini.base_url, ProviderKind::Gemini)?;
            registry.register(Arc::new(
                GeminiAdapter::new(client.clone(), key, base).map_err(|source| {
                    ConfigError::InvalidBaseUrl {
                        provider: ProviderKind::Gemini,
                        source,
                    }
                })?,
            ));
        }
        if let Some(key) = providers.deepseek.api_key.clone() {
            let base = base_url(&providers.deepseek.base_url, ProviderKind::DeepSeek)?;
            registry.register(Arc::new(
                DeepSeekAdapter::new(client.clone(), key, base).map_err(|source| {
                    ConfigError::InvalidBaseUrl {
                        provider: ProviderKind::DeepSeek,
                        source,
                    }
                })?,
            ));
        }

        for kind in [
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::Gemini,
            ProviderKind::DeepSeek,
        ] {
            if registry.get(kind).is_none() {
                warn!(provider = %kind, "no API key configured; provider not registered");
            }
        }
        debug!(registered = registry.adapters.len(), "provider registry built");

        Ok(registry)
    }
}

/// Join a request path onto a configured base URL, treating the base as a
/// directory. `Url::join` drops the last path segment of a base without a
/// trailing slash, which silently breaks overrides like
/// `https://proxy.internal/v1`.
pub(crate) fn join_endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    if base.path().ends_with('/') {
        base.join(path)
    } else {
        let mut base = base.clone();
        base.set_path(&format!("{}/", base.path()));
        base.join(path)
    }
}

/// Attach correlation headers so provider-side logs can be joined with ours.
pub(crate) fn trace_headers(request: RequestBuilder, trace: &TraceContext) -> RequestBuilder {
    let request = request.header("x-correlation-id", trace.correlation_id().to_string());
    match trace.request_id() {
        Some(request_id) => request.header("x-request-id", request_id.to_string()),
        None => request,
    }
}

/// Map transport-level reqwest failures into classified provider errors.
pub(crate) fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else if err.is_connect() {
        ProviderError::Network(format!("connection failed: {err}"))
    } else {
        ProviderError::Network(err.to_string())
    }
}

const MAX_ERROR_BODY_CHARS: usize = 300;

/// Error bodies can be huge HTML pages; keep only a useful prefix.
pub(crate) fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        let prefix: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{prefix}...")
    }
}
