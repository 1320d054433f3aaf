//! DeepSeek adapter.
//!
//! DeepSeek serves an OpenAI-compatible chat-completions API behind its own
//! base URL, so this adapter reuses the shared wire mapping from
//! [`super::openai`] and differs only in endpoint and identity.

use crate::gateway::classify::ProviderError;
use crate::gateway::trace::TraceContext;
use crate::gateway::types::{LlmResponse, ModelId, Prompt, ProviderKind};
use crate::providers::openai::{ChatResponse, build_chat_request, parse_chat_response};
use crate::providers::{
    ProviderAdapter, join_endpoint, map_transport_error, trace_headers, truncate_body,
};
use futures::future::BoxFuture;
use reqwest::Client;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1/";

pub struct DeepSeekAdapter {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl DeepSeekAdapter {
    pub fn new(
        client: Client,
        api_key: String,
        base_url: Option<Url>,
    ) -> Result<Self, url::ParseError> {
        let base = match base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        Ok(Self {
            client,
            api_key,
            endpoint: join_endpoint(&base, "chat/completions")?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ProviderAdapter for DeepSeekAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DeepSeek
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a Prompt,
        model: &'a ModelId,
        trace: &'a TraceContext,
    ) -> BoxFuture<'a, Result<LlmResponse, ProviderError>> {
        Box::pin(async move {
            let request = build_chat_request(prompt, model);
            let response = trace_headers(
                self.client
                    .post(self.endpoint.clone())
                    .bearer_auth(&self.api_key),
                trace,
            )
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::from_status(
                    status.as_u16(),
                    truncate_body(&body),
                ));
            }

            let body: ChatResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
            parse_chat_response(prompt, model, body)
        })
    }
}
