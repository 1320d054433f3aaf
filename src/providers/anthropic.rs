//! Anthropic adapter (messages wire format).
//!
//! Anthropic takes the system prompt as a top-level field rather than a
//! message turn, so system and developer turns are folded into one system
//! block and only user/assistant turns go into `messages`. `max_tokens` is
//! mandatory on this API; a conservative default applies when the prompt
//! does not set one.

use crate::gateway::classify::ProviderError;
use crate::gateway::trace::TraceContext;
use crate::gateway::types::{
    LlmResponse, MessageRole, ModelId, Prompt, ProviderKind, TokenUsage,
};
use crate::providers::{
    ProviderAdapter, join_endpoint, map_transport_error, trace_headers, truncate_body,
};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl AnthropicAdapter {
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
            endpoint: join_endpoint(&base, "messages")?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a Prompt,
        model: &'a ModelId,
        trace: &'a TraceContext,
    ) -> BoxFuture<'a, Result<LlmResponse, ProviderError>> {
        Box::pin(async move {
            let request = build_messages_request(prompt, model);
            let response = trace_headers(
                self.client
                    .post(self.endpoint.clone())
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", API_VERSION),
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

            let body: MessagesResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
            parse_messages_response(prompt, model, body)
        })
    }
}

// ── messages wire types ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

pub(crate) fn build_messages_request<'a>(
    prompt: &'a Prompt,
    model: &'a ModelId,
) -> MessagesRequest<'a> {
    let generation = prompt.generation();

    let system_parts: Vec<&str> = prompt
        .messages()
        .iter()
        .filter(|m| matches!(m.role(), MessageRole::System | MessageRole::Developer))
        .map(|m| m.content())
        .collect();
    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    let messages = prompt
        .messages()
        .iter()
        .filter(|m| matches!(m.role(), MessageRole::User | MessageRole::Assistant))
        .map(|m| WireMessage {
            role: m.role().as_str(),
            content: m.content(),
        })
        .collect();

    MessagesRequest {
        model: model.name(),
        max_tokens: generation.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        messages,
        system,
        temperature: generation.temperature,
        top_p: generation.top_p,
        stop_sequences: generation.stop.iter().map(String::as_str).collect(),
    }
}

pub(crate) fn parse_messages_response(
    prompt: &Prompt,
    model: &ModelId,
    body: MessagesResponse,
) -> Result<LlmResponse, ProviderError> {
    let content: String = body
        .content
        .iter()
        .filter(|block| block.kind.as_deref() == Some("text") || block.kind.is_none())
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("");
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "response contained no text output".to_string(),
        ));
    }

    // The messages API has no native JSON mode; parse opportunistically and
    // only fail when the caller demanded structure.
    let structured = if prompt.expects_json() {
        let value = serde_json::from_str(&content).map_err(|e| {
            ProviderError::MalformedResponse(format!("expected JSON body: {e}"))
        })?;
        Some(value)
    } else {
        None
    };

    let usage = body.usage.map(|u| TokenUsage {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
        total_tokens: None,
    });

    let provider_payload = serde_json::json!({
        "id": body.id,
        "model": body.model,
        "stop_reason": body.stop_reason,
    });

    Ok(LlmResponse {
        model: model.clone(),
        content,
        usage,
        structured,
        provider_payload: Some(provider_payload),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::{GenerationOptions, Message};

    fn model() -> ModelId {
        ModelId::new(ProviderKind::Anthropic, "claude-sonnet-4-5").unwrap()
    }

    #[test]
    fn system_turns_are_folded_into_the_system_field() {
        let prompt = Prompt::new(vec![
            Message::system("you are a reviewer").unwrap(),
            Message::new(MessageRole::Developer, "be strict").unwrap(),
            Message::user("review this diff").unwrap(),
        ])
        .unwrap();

        let value = serde_json::to_value(build_messages_request(&prompt, &model())).unwrap();
        assert_eq!(value["system"], "you are a reviewer\n\nbe strict");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn max_tokens_defaults_when_unset() {
        let prompt = Prompt::from_text(None, "hi").unwrap();
        let value = serde_json::to_value(build_messages_request(&prompt, &model())).unwrap();
        assert_eq!(value["max_tokens"], DEFAULT_MAX_TOKENS);

        let prompt = prompt
            .with_generation(GenerationOptions {
                max_output_tokens: Some(512),
                ..Default::default()
            })
            .unwrap();
        let value = serde_json::to_value(build_messages_request(&prompt, &model())).unwrap();
        assert_eq!(value["max_tokens"], 512);
    }

    #[test]
    fn parse_joins_text_blocks_and_maps_usage() {
        let prompt = Prompt::from_text(None, "hi").unwrap();
        let body: MessagesResponse = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "model": "claude-sonnet-4-5",
            "content": [
                {"type": "text", "text": "part one, "},
                {"type": "text", "text": "part two"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 20, "output_tokens": 6}
        }))
        .unwrap();

        let response = parse_messages_response(&prompt, &model(), body).unwrap();
        assert_eq!(response.content, "part one, part two");
        let usage = response.usage.unwrap();
        assert_eq!(usage.input_tokens, Some(20));
        assert_eq!(usage.output_tokens, Some(6));
        assert_eq!(usage.total_tokens, None);
    }

    #[test]
    fn parse_rejects_empty_content() {
        let prompt = Prompt::from_text(None, "hi").unwrap();
        let body: MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": []
        }))
        .unwrap();
        assert!(matches!(
            parse_messages_response(&prompt, &model(), body),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn default_endpoint() {
        let adapter =
            AnthropicAdapter::new(Client::new(), "sk-ant-test".to_string(), None).unwrap();
        assert_eq!(
            adapter.endpoint().as_str(),
            "https://api.anthropic.com/v1/messages"
        );
    }
}
