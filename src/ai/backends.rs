use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Instruction prepended to the user's text in every provider payload
const CORRECTION_INSTRUCTION: &str = "Correct this text: ";

/// Build the user prompt sent to the provider
pub fn correction_prompt(text: &str) -> String {
    format!("{}{}", CORRECTION_INSTRUCTION, text)
}

/// Typed outcome of applying a provider's extraction policy to its response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The provider produced a correction
    Success { text: String },
    /// The provider answered with an application-level error
    Errored { message: String },
    /// The response carried neither a correction nor an error
    Malformed,
}

/// Strategy for talking to one LLM provider
///
/// A provider knows how to turn user text into an outbound HTTP request and
/// how to pull the correction back out of the JSON it answers with. The
/// correction handler owns the HTTP client and all error folding.
#[cfg_attr(test, mockall::automock)]
pub trait Provider: Send + Sync {
    /// Human-readable provider name used in messages and logs
    fn name(&self) -> &'static str;

    /// Whether a non-empty credential is configured
    fn has_api_key(&self) -> bool;

    /// Build the outbound request for the given (already trimmed) text
    fn build_request(&self, client: &Client, text: &str) -> RequestBuilder;

    /// Apply the provider's extraction policy to a parsed response body
    fn extract(&self, body: Value) -> Extraction;
}

/// Which provider API a deployment talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat-completions API
    #[default]
    #[value(name = "openai")]
    OpenAI,
    /// Gemini generate-content API
    #[value(name = "gemini")]
    Gemini,
}

impl ProviderKind {
    /// Name used in user-facing messages
    ///
    /// # Returns
    ///
    /// `"OpenAI"` or `"Gemini"`, as it appears in
    /// "Server error: <provider> API key is missing."
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Gemini => "Gemini",
        }
    }

    /// Environment variable holding this provider's credential
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OPENAI_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Public base URL of the provider's API
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "https://api.openai.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "gpt-4",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!(
                "unknown provider '{}', expected 'openai' or 'gemini'",
                other
            )),
        }
    }
}

/// Everything needed to reach one provider
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ProviderConfig {
    /// Create a configuration with the provider's defaults and no credential
    ///
    /// # Arguments
    /// * `kind` - Which provider API to talk to
    ///
    /// # Example
    /// ```
    /// use proofread::ai::{ProviderConfig, ProviderKind};
    ///
    /// let config = ProviderConfig::new(ProviderKind::Gemini).with_api_key("AIza...");
    /// assert_eq!(config.model, "gemini-1.5-flash");
    /// assert!(config.api_key.is_some());
    /// ```
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            endpoint: kind.default_endpoint().to_string(),
            api_key: None,
            model: kind.default_model().to_string(),
            max_tokens: 100,
            temperature: 1.0,
        }
    }

    /// Set the credential; blank keys count as missing
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
        self
    }

    /// Point the provider at a different base URL (proxies, compatible APIs, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Turn the configuration into the matching provider strategy
    ///
    /// # Returns
    ///
    /// An `OpenAIProvider` or `GeminiProvider` behind the `Provider` trait,
    /// ready to hand to `CorrectionHandler`.
    pub fn into_provider(self) -> Arc<dyn Provider> {
        match self.kind {
            ProviderKind::OpenAI => Arc::new(OpenAIProvider::new(self)),
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(self)),
        }
    }

    fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    fn key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

// Keeps the credential out of logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// OpenAI chat-completions provider
///
/// Sends the text as a user message behind a fixed system prompt and reads
/// the first choice's message content. Authenticates with a bearer token.
pub struct OpenAIProvider {
    config: ProviderConfig,
}

/// Request format for OpenAI Chat Completions API
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// Message format for OpenAI API
#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

/// Response format from OpenAI API
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Option<Vec<OpenAIChoice>>,
}

/// Choice in OpenAI response
#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    #[serde(default)]
    message: Option<OpenAIResponseMessage>,
}

/// Message in OpenAI response
#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    ///
    /// # Arguments
    /// * `config` - Endpoint, credential and sampling settings; `kind` is not consulted
    ///
    /// # Example
    /// ```
    /// use proofread::ai::{OpenAIProvider, Provider, ProviderConfig, ProviderKind};
    ///
    /// let provider = OpenAIProvider::new(
    ///     ProviderConfig::new(ProviderKind::OpenAI).with_api_key("sk-..."),
    /// );
    /// assert!(provider.has_api_key());
    /// ```
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    /// Format the OpenAI API endpoint URL
    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url())
    }

    fn system_prompt() -> &'static str {
        "You are a helpful assistant"
    }

    fn request_body(&self, text: &str) -> OpenAIRequest {
        OpenAIRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: Self::system_prompt().to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: correction_prompt(text),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

impl Provider for OpenAIProvider {
    fn name(&self) -> &'static str {
        ProviderKind::OpenAI.display_name()
    }

    fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn build_request(&self, client: &Client, text: &str) -> RequestBuilder {
        client
            .post(self.api_url())
            .header("Authorization", format!("Bearer {}", self.config.key()))
            .header("Content-Type", "application/json")
            .json(&self.request_body(text))
    }

    fn extract(&self, body: Value) -> Extraction {
        let response: OpenAIResponse = match serde_json::from_value(body) {
            Ok(response) => response,
            Err(_) => return Extraction::Malformed,
        };

        let content = response
            .choices
            .into_iter()
            .flatten()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty());

        match content {
            Some(text) => Extraction::Success { text },
            None => Extraction::Malformed,
        }
    }
}

/// Gemini generate-content provider
///
/// The credential travels as the `key` query parameter. Error bodies are
/// surfaced as `Extraction::Errored` so quota and auth failures reach the user.
pub struct GeminiProvider {
    config: ProviderConfig,
}

/// Request format for Gemini generateContent API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiRequestContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiRequestContent {
    role: String,
    parts: Vec<GeminiRequestPart>,
}

#[derive(Debug, Serialize)]
struct GeminiRequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

/// Response format from Gemini API
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Option<Vec<GeminiResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Error format from Gemini API
#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: Option<String>,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Arguments
    /// * `config` - Endpoint, model, credential and sampling settings
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    /// Format the generateContent URL for the configured model
    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url(),
            self.config.model
        )
    }

    fn request_body(&self, text: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiRequestContent {
                role: "user".to_string(),
                parts: vec![GeminiRequestPart {
                    text: correction_prompt(text),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        }
    }
}

impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        ProviderKind::Gemini.display_name()
    }

    fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn build_request(&self, client: &Client, text: &str) -> RequestBuilder {
        client
            .post(self.api_url())
            .query(&[("key", self.config.key())])
            .header("Content-Type", "application/json")
            .json(&self.request_body(text))
    }

    fn extract(&self, body: Value) -> Extraction {
        let response: GeminiResponse = match serde_json::from_value(body) {
            Ok(response) => response,
            Err(_) => return Extraction::Malformed,
        };

        let text = response
            .candidates
            .into_iter()
            .flatten()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts)
            .and_then(|parts| parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.is_empty());

        match (text, response.error) {
            (Some(text), _) => Extraction::Success { text },
            (None, Some(error)) => Extraction::Errored {
                message: error
                    .message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            },
            (None, None) => Extraction::Malformed,
        }
    }
}
