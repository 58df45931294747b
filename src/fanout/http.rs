use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

use crate::fanout::provider::{Provider, ProviderError};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Authentication scheme for a provider call.
pub(crate) enum Auth<'a> {
    Bearer(&'a str),
    /// `x-api-key` plus the `anthropic-version` protocol header.
    AnthropicKey(&'a str),
}

#[derive(Debug)]
pub(crate) enum RequestFailure {
    Request(reqwest::Error),
    Api { status: StatusCode, body: String },
}

impl RequestFailure {
    pub(crate) fn into_provider_error(self, provider: Provider) -> ProviderError {
        match self {
            Self::Request(source) => ProviderError::Request { provider, source },
            Self::Api { status, body } => ProviderError::Api {
                provider,
                status,
                body,
            },
        }
    }
}

pub(crate) async fn post_chat_request<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    auth: Auth<'_>,
    payload: &T,
    timeout_secs: Option<u64>,
) -> Result<reqwest::Response, RequestFailure> {
    let mut request = client.post(url).json(payload);

    request = match auth {
        Auth::Bearer(api_key) => request.bearer_auth(api_key),
        Auth::AnthropicKey(api_key) => request
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION),
    };

    if let Some(timeout_secs) = timeout_secs {
        request = request.timeout(Duration::from_secs(timeout_secs));
    }

    match request.send().await {
        Ok(response) => {
            if response.status().is_success() {
                return Ok(response);
            }
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(RequestFailure::Api { status, body })
        }
        Err(source) => Err(RequestFailure::Request(source)),
    }
}
