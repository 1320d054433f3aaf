use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The LLM vendors the gateway can route to.
///
/// `Gateway` identifies a nested gateway endpoint (a gateway routing to
/// another gateway), which some deployments use as their first candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    DeepSeek,
    Gateway,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::DeepSeek,
        ProviderKind::Gateway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Gateway => "gateway",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ModelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "gemini" => Ok(ProviderKind::Gemini),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "gateway" => Ok(ProviderKind::Gateway),
            other => Err(ModelIdError::UnknownProvider(other.to_string())),
        }
    }
}

/// Errors raised when constructing or parsing a [`ModelId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelIdError {
    #[error("model name must be non-empty")]
    EmptyName,
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("expected 'provider:model', got '{0}'")]
    MissingSeparator(String),
}

/// Identity of one model offered by one provider.
///
/// The qualified name `provider:model` is the canonical comparison key used
/// everywhere: allowlist membership, configuration entries, failure reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId {
    provider: ProviderKind,
    name: String,
}

impl ModelId {
    pub fn new(provider: ProviderKind, name: impl Into<String>) -> Result<Self, ModelIdError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelIdError::EmptyName);
        }
        Ok(Self { provider, name })
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical `provider:model` key.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.provider, self.name)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.name)
    }
}

impl FromStr for ModelId {
    type Err = ModelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, name) = s
            .split_once(':')
            .ok_or_else(|| ModelIdError::MissingSeparator(s.to_string()))?;
        Self::new(provider.parse()?, name)
    }
}

/// Role of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Developer,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::Developer => "developer",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn in a conversation. Content is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    role: MessageRole,
    content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Result<Self, PromptError> {
        let content = content.into();
        if content.is_empty() {
            return Err(PromptError::EmptyContent(role));
        }
        Ok(Self { role, content })
    }

    pub fn system(content: impl Into<String>) -> Result<Self, PromptError> {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Result<Self, PromptError> {
        Self::new(MessageRole::User, content)
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Errors raised while assembling a [`Prompt`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PromptError {
    #[error("message content for role '{0}' must be non-empty")]
    EmptyContent(MessageRole),
    #[error("a prompt needs at least one message")]
    NoMessages,
    #[error("max_output_tokens must be positive")]
    ZeroMaxTokens,
    #[error("temperature must be within [0.0, 2.0], got {0}")]
    TemperatureOutOfRange(f32),
    #[error("top_p must be within (0.0, 1.0], got {0}")]
    TopPOutOfRange(f32),
}

/// Requested response shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Sampling and length knobs forwarded to the provider.
///
/// All fields are optional; providers apply their own defaults for absent
/// values. Ranges are validated when the options are attached to a prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub seed: Option<u64>,
    pub stop: Vec<String>,
    pub format: OutputFormat,
}

impl GenerationOptions {
    pub fn validate(&self) -> Result<(), PromptError> {
        if self.max_output_tokens == Some(0) {
            return Err(PromptError::ZeroMaxTokens);
        }
        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(PromptError::TemperatureOutOfRange(t));
        }
        if let Some(p) = self.top_p
            && !(p > 0.0 && p <= 1.0)
        {
            return Err(PromptError::TopPOutOfRange(p));
        }
        Ok(())
    }

    pub fn json_mode(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Schema contract for structured output.
///
/// `schema` is a JSON-Schema-like document; `strict` asks the provider to
/// enforce it rather than treat it as a hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}

/// The full input to one reasoning call.
///
/// Immutable once built; the router reuses the same prompt unchanged across
/// fallback attempts against different models.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    messages: Vec<Message>,
    generation: GenerationOptions,
    schema: Option<StructuredOutputSchema>,
}

impl Prompt {
    pub fn new(messages: Vec<Message>) -> Result<Self, PromptError> {
        if messages.is_empty() {
            return Err(PromptError::NoMessages);
        }
        Ok(Self {
            messages,
            generation: GenerationOptions::default(),
            schema: None,
        })
    }

    /// Convenience constructor for the common system + user shape.
    pub fn from_text(system: Option<&str>, user: &str) -> Result<Self, PromptError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message::system(system)?);
        }
        messages.push(Message::user(user)?);
        Self::new(messages)
    }

    pub fn with_generation(mut self, generation: GenerationOptions) -> Result<Self, PromptError> {
        generation.validate()?;
        self.generation = generation;
        Ok(self)
    }

    pub fn with_schema(mut self, schema: StructuredOutputSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn generation(&self) -> &GenerationOptions {
        &self.generation
    }

    pub fn schema(&self) -> Option<&StructuredOutputSchema> {
        self.schema.as_ref()
    }

    /// Whether the caller expects a JSON body back, either via the output
    /// format hint or because a structured-output schema is attached.
    pub fn expects_json(&self) -> bool {
        self.generation.json_mode() || self.schema.is_some()
    }
}

/// Usage accounting for one completed provider call.
///
/// Every field is optional: not all providers report usage, and those that
/// do may omit individual counts. `total_tokens` is provider-reported and is
/// not checked against the sum of the other two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn is_empty(&self) -> bool {
        self.input_tokens.is_none() && self.output_tokens.is_none() && self.total_tokens.is_none()
    }

    /// Field-wise sum, keeping `None` only when both sides are absent.
    pub fn combined(self, other: TokenUsage) -> TokenUsage {
        fn add(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            match (a, b) {
                (None, None) => None,
                _ => Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0))),
            }
        }
        TokenUsage {
            input_tokens: add(self.input_tokens, other.input_tokens),
            output_tokens: add(self.output_tokens, other.output_tokens),
            total_tokens: add(self.total_tokens, other.total_tokens),
        }
    }
}

/// A validated response from one provider call.
///
/// `content` is non-empty; adapters reject empty provider output as
/// malformed before a response is ever constructed. `structured` holds the
/// parsed JSON payload when the prompt asked for one.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub model: ModelId,
    pub content: String,
    pub usage: Option<TokenUsage>,
    pub structured: Option<serde_json::Value>,
    pub provider_payload: Option<serde_json::Value>,
}
