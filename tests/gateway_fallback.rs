//! End-to-end wiring: settings file -> allowlist/priority/timeout -> router
//! fallback over injected adapters.

use factory_gateway::gateway::{
    GatewayError, LlmResponse, ModelId, ModelRouter, Prompt, ProviderError, TraceContext,
};
use factory_gateway::providers::{ProviderAdapter, ProviderRegistry};
use factory_gateway::{ProviderKind, config::GatewaySettings};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Fails a fixed number of times with a transient error, then succeeds.
struct FlakyAdapter {
    kind: ProviderKind,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyAdapter {
    fn new(kind: ProviderKind, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failures_left: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        })
    }
}

impl ProviderAdapter for FlakyAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn generate<'a>(
        &'a self,
        _prompt: &'a Prompt,
        model: &'a ModelId,
        _trace: &'a TraceContext,
    ) -> BoxFuture<'a, Result<LlmResponse, ProviderError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                    left.checked_sub(1)
                })
                .is_ok()
            {
                return Err(ProviderError::Unavailable("upstream 503".to_string()));
            }
            Ok(LlmResponse {
                model: model.clone(),
                content: format!("answer from {model}"),
                usage: None,
                structured: None,
                provider_payload: None,
            })
        })
    }
}

fn settings() -> GatewaySettings {
    toml::from_str(
        r#"
        model_priority = ["openai:gpt-5", "openai:gpt-5-mini", "anthropic:claude-sonnet-4-5"]
        allowed_models = ["openai:gpt-5", "openai:gpt-5-mini", "anthropic:claude-sonnet-4-5"]
        attempt_timeout_secs = 5
        "#,
    )
    .unwrap()
}

fn router_from(settings: &GatewaySettings, adapters: Vec<Arc<dyn ProviderAdapter>>) -> ModelRouter {
    let mut registry = ProviderRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    ModelRouter::new(settings.allowlist(), registry, settings.attempt_timeout())
}

#[tokio::test]
async fn mission_falls_through_the_configured_priority_list() {
    let settings = settings();
    let openai = FlakyAdapter::new(ProviderKind::OpenAi, 2);
    let anthropic = FlakyAdapter::new(ProviderKind::Anthropic, 0);
    let router = router_from(&settings, vec![openai.clone(), anthropic.clone()]);

    let prompt = Prompt::from_text(Some("You scaffold services."), "Plan the module layout").unwrap();
    let reply = router
        .reason(
            &prompt,
            &settings.priority().unwrap(),
            &TraceContext::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // Both openai candidates burn a transient failure each; anthropic wins.
    assert_eq!(
        reply.winning_model().qualified_name(),
        "anthropic:claude-sonnet-4-5"
    );
    assert_eq!(openai.calls.load(Ordering::SeqCst), 2);
    assert_eq!(anthropic.calls.load(Ordering::SeqCst), 1);
    assert_eq!(reply.attempts.len(), 3);
}

#[tokio::test]
async fn mission_exhausts_when_every_provider_stays_down() {
    let settings = settings();
    let openai = FlakyAdapter::new(ProviderKind::OpenAi, usize::MAX);
    let anthropic = FlakyAdapter::new(ProviderKind::Anthropic, usize::MAX);
    let router = router_from(&settings, vec![openai, anthropic]);

    let prompt = Prompt::from_text(None, "Plan the module layout").unwrap();
    let err = router
        .reason(
            &prompt,
            &settings.priority().unwrap(),
            &TraceContext::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let GatewayError::AllModelsExhausted { failures } = err else {
        panic!("expected AllModelsExhausted, got {err:?}");
    };
    assert_eq!(failures.len(), 3);
    assert!(failures.iter().all(|f| f.to_string().contains("503")));
}

#[tokio::test]
async fn allowlist_narrowing_is_respected_end_to_end() {
    let mut settings = settings();
    settings.allowed_models = vec!["openai:gpt-5-mini".to_string()];

    let openai = FlakyAdapter::new(ProviderKind::OpenAi, 0);
    let anthropic = FlakyAdapter::new(ProviderKind::Anthropic, 0);
    let router = router_from(&settings, vec![openai.clone(), anthropic.clone()]);

    let prompt = Prompt::from_text(None, "Plan the module layout").unwrap();
    let reply = router
        .reason(
            &prompt,
            &settings.priority().unwrap(),
            &TraceContext::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply.winning_model().qualified_name(), "openai:gpt-5-mini");
    // Only the allowed candidate ever reached an adapter.
    assert_eq!(openai.calls.load(Ordering::SeqCst), 1);
    assert_eq!(anthropic.calls.load(Ordering::SeqCst), 0);
}
