//! OpenAI adapter (chat-completions wire format).
//!
//! The request/response mapping lives in free functions so it can be tested
//! without HTTP, and so the DeepSeek adapter can reuse it: DeepSeek exposes
//! an OpenAI-compatible surface behind its own base URL.

use crate::gateway::classify::ProviderError;
use crate::gateway::trace::TraceContext;
use crate::gateway::types::{LlmResponse, ModelId, Prompt, ProviderKind, TokenUsage};
use crate::providers::{
    ProviderAdapter, join_endpoint, map_transport_error, trace_headers, truncate_body,
};
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl OpenAiAdapter {
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

impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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

// ── chat-completions wire types ──────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat<'a> {
    JsonObject,
    JsonSchema { json_schema: JsonSchemaSpec<'a> },
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

pub(crate) fn build_chat_request<'a>(prompt: &'a Prompt, model: &'a ModelId) -> ChatRequest<'a> {
    let generation = prompt.generation();
    let response_format = match prompt.schema() {
        Some(schema) => Some(ResponseFormat::JsonSchema {
            json_schema: JsonSchemaSpec {
                name: &schema.name,
                schema: &schema.schema,
                strict: schema.strict,
            },
        }),
        None if generation.json_mode() => Some(ResponseFormat::JsonObject),
        None => None,
    };

    ChatRequest {
        model: model.name(),
        messages: prompt
            .messages()
            .iter()
            .map(|m| WireMessage {
                role: m.role().as_str(),
                content: m.content(),
            })
            .collect(),
        max_tokens: generation.max_output_tokens,
        temperature: generation.temperature,
        top_p: generation.top_p,
        seed: generation.seed,
        stop: generation.stop.iter().map(String::as_str).collect(),
        response_format,
    }
}

pub(crate) fn parse_chat_response(
    prompt: &Prompt,
    model: &ModelId,
    body: ChatResponse,
) -> Result<LlmResponse, ProviderError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("response had no choices".to_string()))?;

    let content = choice.message.content.unwrap_or_default().trim().to_string();
    if content.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "response contained no text output".to_string(),
        ));
    }

    let structured = if prompt.expects_json() {
        let value = serde_json::from_str(&content).map_err(|e| {
            ProviderError::MalformedResponse(format!("expected JSON body: {e}"))
        })?;
        Some(value)
    } else {
        None
    };

    let usage = body.usage.map(|u| TokenUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let provider_payload = serde_json::json!({
        "id": body.id,
        "model": body.model,
        "finish_reason": choice.finish_reason,
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
    use crate::gateway::types::{GenerationOptions, OutputFormat, StructuredOutputSchema};

    fn model() -> ModelId {
        ModelId::new(ProviderKind::OpenAi, "gpt-5").unwrap()
    }

    #[test]
    fn request_carries_messages_and_sampling_knobs() {
        let prompt = Prompt::from_text(Some("be terse"), "hello")
            .unwrap()
            .with_generation(GenerationOptions {
                max_output_tokens: Some(256),
                temperature: Some(0.1),
                stop: vec!["END".to_string()],
                ..Default::default()
            })
            .unwrap();

        let value = serde_json::to_value(build_chat_request(&prompt, &model())).unwrap();
        assert_eq!(value["model"], "gpt-5");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hello");
        assert_eq!(value["max_tokens"], 256);
        assert_eq!(value["stop"][0], "END");
        assert!(value.get("response_format").is_none());
        assert!(value.get("seed").is_none());
    }

    #[test]
    fn json_mode_sets_response_format() {
        let prompt = Prompt::from_text(None, "hello")
            .unwrap()
            .with_generation(GenerationOptions {
                format: OutputFormat::Json,
                ..Default::default()
            })
            .unwrap();
        let value = serde_json::to_value(build_chat_request(&prompt, &model())).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[test]
    fn schema_takes_precedence_over_json_mode() {
        let prompt = Prompt::from_text(None, "hello")
            .unwrap()
            .with_schema(StructuredOutputSchema {
                name: "review".to_string(),
                schema: serde_json::json!({"type": "object"}),
                strict: true,
            });
        let value = serde_json::to_value(build_chat_request(&prompt, &model())).unwrap();
        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(value["response_format"]["json_schema"]["name"], "review");
        assert_eq!(value["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn parse_maps_content_and_usage() {
        let prompt = Prompt::from_text(None, "hello").unwrap();
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-5-2025",
            "choices": [{"message": {"content": "  hi there  "}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }))
        .unwrap();

        let response = parse_chat_response(&prompt, &model(), body).unwrap();
        assert_eq!(response.content, "hi there");
        let usage = response.usage.unwrap();
        assert_eq!(usage.input_tokens, Some(12));
        assert_eq!(usage.total_tokens, Some(15));
        assert_eq!(response.provider_payload.unwrap()["finish_reason"], "stop");
    }

    #[test]
    fn parse_rejects_empty_content() {
        let prompt = Prompt::from_text(None, "hello").unwrap();
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": ""}}]
        }))
        .unwrap();
        assert!(matches!(
            parse_chat_response(&prompt, &model(), body),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn parse_requires_json_when_prompt_expects_it() {
        let prompt = Prompt::from_text(None, "hello")
            .unwrap()
            .with_generation(GenerationOptions {
                format: OutputFormat::Json,
                ..Default::default()
            })
            .unwrap();

        let good: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "{\"ok\": true}"}}]
        }))
        .unwrap();
        let response = parse_chat_response(&prompt, &model(), good).unwrap();
        assert_eq!(response.structured.unwrap()["ok"], true);

        let bad: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"content": "not json"}}]
        }))
        .unwrap();
        assert!(matches!(
            parse_chat_response(&prompt, &model(), bad),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn default_endpoint() {
        let adapter =
            OpenAiAdapter::new(Client::new(), "sk-test".to_string(), None).unwrap();
        assert_eq!(
            adapter.endpoint().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
