use std::env;
use std::fmt;

use reqwest::StatusCode;
use serde_json::{Value, json};

/// One of the three external LLM API vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Openai,
    Anthropic,
    Openrouter,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Openrouter => "openrouter",
        }
    }

    /// Name used in user-facing error strings.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Openai => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Openrouter => "OpenRouter",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Openai => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Openrouter => "OPENROUTER_API_KEY",
        }
    }
}

/// Chat endpoint URLs, overridable for testing.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub openai: String,
    pub anthropic: String,
    pub openrouter: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openai: "https://api.openai.com/v1/chat/completions".to_string(),
            anthropic: "https://api.anthropic.com/v1/messages".to_string(),
            openrouter: "https://openrouter.ai/api/v1/chat/completions".to_string(),
        }
    }
}

impl Endpoints {
    /// Default endpoints with `PF_OPENAI_URL` / `PF_ANTHROPIC_URL` /
    /// `PF_OPENROUTER_URL` overrides applied.
    pub fn from_env() -> Self {
        let mut endpoints = Self::default();
        if let Some(url) = non_empty_env("PF_OPENAI_URL") {
            endpoints.openai = url;
        }
        if let Some(url) = non_empty_env("PF_ANTHROPIC_URL") {
            endpoints.anthropic = url;
        }
        if let Some(url) = non_empty_env("PF_OPENROUTER_URL") {
            endpoints.openrouter = url;
        }
        endpoints
    }

    pub fn url(&self, provider: Provider) -> &str {
        match provider {
            Provider::Openai => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Openrouter => &self.openrouter,
        }
    }
}

/// Optional API keys supplied by the caller. Never persisted or logged.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub openrouter: Option<String>,
}

impl CredentialSet {
    /// Reads keys from the conventional environment variables, treating
    /// blank values as absent.
    pub fn from_env() -> Self {
        Self {
            openai: non_empty_env(Provider::Openai.api_key_env()),
            anthropic: non_empty_env(Provider::Anthropic.api_key_env()),
            openrouter: non_empty_env(Provider::Openrouter.api_key_env()),
        }
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Openai => self.openai.as_deref(),
            Provider::Anthropic => self.anthropic.as_deref(),
            Provider::Openrouter => self.openrouter.as_deref(),
        }
    }

    pub fn any_present(&self) -> bool {
        self.openai.is_some() || self.anthropic.is_some() || self.openrouter.is_some()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Chat message in OpenAI-compatible wire format: a role plus either plain
/// text or a list of content parts.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    role: &'static str,
    content: Value,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: Value::String(content.into()),
        }
    }

    /// System prompt under the `developer` role, the convention for OpenAI
    /// reasoning models.
    pub fn developer(content: impl Into<String>) -> Self {
        Self {
            role: "developer",
            content: Value::String(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: Value::String(content.into()),
        }
    }

    pub fn user_parts(parts: Vec<Value>) -> Self {
        Self {
            role: "user",
            content: Value::Array(parts),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "role": self.role, "content": self.content })
    }
}

/// Pass-through image reference part for chat-completions payloads.
pub(crate) fn image_url_part(url: &str) -> Value {
    json!({ "type": "image_url", "image_url": { "url": url } })
}

/// Per-model failure. Converted to an `"Error: ..."` result string by the
/// dispatcher; it never aborts the batch.
#[derive(Debug)]
pub enum ProviderError {
    MissingApiKey {
        provider: Provider,
    },
    Request {
        provider: Provider,
        source: reqwest::Error,
    },
    Api {
        provider: Provider,
        status: StatusCode,
        body: String,
    },
    MalformedResponse {
        provider: Provider,
    },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey { provider } => {
                write!(f, "{} API key not found", provider.display_name())
            }
            Self::Request { provider, source } => {
                write!(f, "{} request failed: {source}", provider.display_name())
            }
            Self::Api {
                provider,
                status,
                body,
            } => write!(
                f,
                "Error calling {} API: {}, {body}",
                provider.display_name(),
                status.as_u16()
            ),
            Self::MalformedResponse { provider } => {
                write!(
                    f,
                    "Invalid response format from {} API",
                    provider.display_name()
                )
            }
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source, .. } => Some(source),
            _ => None,
        }
    }
}
