//! Gemini adapter (`generateContent` wire format).
//!
//! The model name is part of the request path, so the endpoint is built per
//! call rather than in the constructor. Roles map onto Gemini's two-role
//! scheme: assistant turns become `model`, system/developer turns go into
//! `systemInstruction`, everything else is `user`.

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

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl GeminiAdapter {
    pub fn new(
        client: Client,
        api_key: String,
        base_url: Option<Url>,
    ) -> Result<Self, url::ParseError> {
        let base_url = match base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    fn endpoint_for(&self, model: &ModelId) -> Result<Url, ProviderError> {
        join_endpoint(
            &self.base_url,
            &format!("models/{}:generateContent", model.name()),
        )
        .map_err(|e| ProviderError::ModelUnavailable(format!("bad model path: {e}")))
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a Prompt,
        model: &'a ModelId,
        trace: &'a TraceContext,
    ) -> BoxFuture<'a, Result<LlmResponse, ProviderError>> {
        Box::pin(async move {
            let endpoint = self.endpoint_for(model)?;
            let request = build_generate_request(prompt);
            let response = trace_headers(
                self.client
                    .post(endpoint)
                    .header("x-goog-api-key", &self.api_key),
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

            let body: GenerateResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
            parse_generate_response(prompt, model, body)
        })
    }
}

// ── generateContent wire types ───────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

pub(crate) fn build_generate_request(prompt: &Prompt) -> GenerateRequest<'_> {
    let generation = prompt.generation();

    let system_parts: Vec<Part<'_>> = prompt
        .messages()
        .iter()
        .filter(|m| matches!(m.role(), MessageRole::System | MessageRole::Developer))
        .map(|m| Part { text: m.content() })
        .collect();
    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(Content {
            role: None,
            parts: system_parts,
        })
    };

    let contents = prompt
        .messages()
        .iter()
        .filter(|m| matches!(m.role(), MessageRole::User | MessageRole::Assistant))
        .map(|m| Content {
            role: Some(match m.role() {
                MessageRole::Assistant => "model",
                _ => "user",
            }),
            parts: vec![Part { text: m.content() }],
        })
        .collect();

    let wants_config = generation.max_output_tokens.is_some()
        || generation.temperature.is_some()
        || generation.top_p.is_some()
        || !generation.stop.is_empty()
        || prompt.expects_json();
    let generation_config = wants_config.then(|| GenerationConfig {
        max_output_tokens: generation.max_output_tokens,
        temperature: generation.temperature,
        top_p: generation.top_p,
        stop_sequences: generation.stop.iter().map(String::as_str).collect(),
        response_mime_type: prompt.expects_json().then_some("application/json"),
    });

    GenerateRequest {
        contents,
        system_instruction,
        generation_config,
    }
}

pub(crate) fn parse_generate_response(
    prompt: &Prompt,
    model: &ModelId,
    body: GenerateResponse,
) -> Result<LlmResponse, ProviderError> {
    let candidate = body.candidates.into_iter().next().ok_or_else(|| {
        ProviderError::MalformedResponse("response had no candidates".to_string())
    })?;

    let content: String = candidate
        .content
        .map(|c| {
            c.parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    let content = content.trim().to_string();
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

    let usage = body.usage_metadata.map(|u| TokenUsage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let provider_payload = serde_json::json!({
        "model": body.model_version,
        "finish_reason": candidate.finish_reason,
    });

    Ok(LlmResponse {
        model: model.clone(),
        content,
        usage,
        structured,
        provider_payload: Some(provider_payload),
    })
}
