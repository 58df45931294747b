use std::env;
use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::fanout::dispatcher::{DispatchRequest, DispatchResult};

/// Hosted dispatch service used when no local provider key is configured.
pub const DEFAULT_REMOTE_URL: &str = "https://api.promptfan.dev";

const CLIENT_HEADER: &str = "X-Client";
const CLIENT_HEADER_VALUE: &str = "promptfan-cli";

#[derive(Debug)]
pub enum RemoteError {
    Request(reqwest::Error),
    Api { status: StatusCode, body: String },
    MalformedResponse,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(source) => write!(f, "backend request failed: {source}"),
            Self::Api { status, body } => {
                write!(f, "backend error {}: {body}", status.as_u16())
            }
            Self::MalformedResponse => write!(f, "invalid response from backend"),
        }
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(source) => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub paying: bool,
}

#[derive(Debug, Deserialize)]
struct FreeTokenResponse {
    temp_token: String,
}

/// The backend wire contract uses camelCase field names.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionRequest<'a> {
    system_prompt: &'a str,
    models: &'a [String],
    user_messages: &'a [String],
    image_urls: &'a [String],
    paid_user: bool,
    token: &'a str,
}

/// Client for the hosted quota/auth backend.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Default backend URL with the `PF_REMOTE_URL` override applied.
    pub fn from_env() -> Self {
        let base_url = env::var("PF_REMOTE_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string());
        Self::new(base_url)
    }

    /// Requests a temporary free-tier token. Called once on first use; the
    /// token is persisted by the caller.
    pub async fn free_token(&self) -> Result<String, RemoteError> {
        let response = self
            .client
            .post(format!("{}/get_free_token", self.base_url))
            .header(CLIENT_HEADER, CLIENT_HEADER_VALUE)
            .send()
            .await
            .map_err(RemoteError::Request)?;
        let response = check_status(response).await?;

        let body: FreeTokenResponse = response
            .json()
            .await
            .map_err(|_| RemoteError::MalformedResponse)?;
        Ok(body.temp_token)
    }

    /// Validates a paid token against the backend.
    pub async fn authenticate(&self, token: &str) -> Result<AuthStatus, RemoteError> {
        let response = self
            .client
            .post(format!("{}/authenticate", self.base_url))
            .bearer_auth(token)
            .header(CLIENT_HEADER, CLIENT_HEADER_VALUE)
            .send()
            .await
            .map_err(RemoteError::Request)?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|_| RemoteError::MalformedResponse)
    }

    /// Runs the whole dispatch on the backend and returns the same
    /// model-to-result mapping the local path produces.
    pub async fn dispatch(
        &self,
        request: &DispatchRequest,
        token: &str,
        paid_user: bool,
    ) -> Result<DispatchResult, RemoteError> {
        let payload = ExtensionRequest {
            system_prompt: &request.system_prompt,
            models: &request.models,
            user_messages: &request.user_messages,
            image_urls: &request.image_urls,
            paid_user,
            token,
        };

        let response = self
            .client
            .post(format!("{}/extension", self.base_url))
            .bearer_auth(token)
            .header(CLIENT_HEADER, CLIENT_HEADER_VALUE)
            .json(&payload)
            .send()
            .await
            .map_err(RemoteError::Request)?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|_| RemoteError::MalformedResponse)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Api { status, body })
}
