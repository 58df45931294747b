use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::warn;

use crate::fanout::catalog::{self, ModelPool};
use crate::fanout::provider::{CredentialSet, Endpoints, Provider, ProviderError};
use crate::fanout::{anthropic, openai, openrouter};

/// Result string for an identifier that belongs to no pool.
pub const UNRECOGNIZED_MODEL_MESSAGE: &str =
    "Error: Model not recognized in either OpenAI or Anthropic.";

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// One user interaction, immutable for the duration of dispatch.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub system_prompt: String,
    pub models: Vec<String>,
    pub user_messages: Vec<String>,
    pub image_urls: Vec<String>,
}

impl DispatchRequest {
    fn validate(&self) -> Result<(), DispatchError> {
        if self.system_prompt.is_empty() {
            return Err(DispatchError::InvalidRequest(
                "system prompt must not be empty",
            ));
        }
        if self.models.is_empty() {
            return Err(DispatchError::InvalidRequest("model list must not be empty"));
        }
        if self.user_messages.is_empty() {
            return Err(DispatchError::InvalidRequest(
                "user messages must not be empty",
            ));
        }
        Ok(())
    }
}

/// Mapping from model identifier to reply text or an `"Error: ..."` string.
pub type DispatchResult = HashMap<String, String>;

/// The only fatal failure mode: a structurally invalid request, reported
/// before any network activity.
#[derive(Debug)]
pub enum DispatchError {
    InvalidRequest(&'static str),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(detail) => write!(f, "Invalid request: {detail}"),
        }
    }
}

impl std::error::Error for DispatchError {}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub timeout_secs: Option<u64>,
    pub endpoints: Endpoints,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            endpoints: Endpoints::default(),
        }
    }
}

/// Dispatches the request to every selected model concurrently and joins
/// the results. One result entry per unique requested identifier; a single
/// model's failure never fails the batch.
pub async fn dispatch(
    request: &DispatchRequest,
    credentials: &CredentialSet,
    options: &DispatchOptions,
) -> Result<DispatchResult, DispatchError> {
    request.validate()?;

    let client = reqwest::Client::new();
    let request = Arc::new(request.clone());
    let credentials = Arc::new(credentials.clone());
    let endpoints = Arc::new(options.endpoints.clone());
    let timeout_secs = options.timeout_secs;

    let mut tasks = JoinSet::new();
    for model in &request.models {
        let model = model.clone();
        let client = client.clone();
        let request = Arc::clone(&request);
        let credentials = Arc::clone(&credentials);
        let endpoints = Arc::clone(&endpoints);

        tasks.spawn(async move {
            let value =
                run_model(&client, &request, &credentials, &endpoints, timeout_secs, &model).await;
            (model, value)
        });
    }

    let mut results = DispatchResult::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((model, value)) => {
                results.insert(model, value);
            }
            Err(err) => warn!("model task did not complete: {err}"),
        }
    }
    backfill_lost_entries(&mut results, &request.models);

    Ok(results)
}

/// A task that failed to join still owes its model an entry, so every
/// requested identifier appears in the map.
fn backfill_lost_entries(results: &mut DispatchResult, models: &[String]) {
    for model in models {
        if !results.contains_key(model) {
            results.insert(
                model.clone(),
                "Error: request task failed unexpectedly".to_string(),
            );
        }
    }
}

async fn run_model(
    client: &reqwest::Client,
    request: &DispatchRequest,
    credentials: &CredentialSet,
    endpoints: &Endpoints,
    timeout_secs: Option<u64>,
    model: &str,
) -> String {
    let Some(pool) = catalog::resolve(model) else {
        return UNRECOGNIZED_MODEL_MESSAGE.to_string();
    };

    match call_model(client, request, credentials, endpoints, timeout_secs, model, pool).await {
        Ok(text) => text,
        Err(err) => format!("Error: {err}"),
    }
}

/// Builds the pool-specific payload, checks the credential, and performs the
/// call. Payload assembly (including Anthropic image fetches) happens before
/// the credential check, matching the observable contract.
async fn call_model(
    client: &reqwest::Client,
    request: &DispatchRequest,
    credentials: &CredentialSet,
    endpoints: &Endpoints,
    timeout_secs: Option<u64>,
    model: &str,
    pool: ModelPool,
) -> Result<String, ProviderError> {
    let provider = pool.provider();
    let url = endpoints.url(provider);

    match provider {
        Provider::Openai => {
            let messages = openai::build_messages(
                &request.system_prompt,
                pool == ModelPool::OpenaiReasoning,
                &request.user_messages,
                &request.image_urls,
            );
            let api_key = credentials
                .get(provider)
                .ok_or(ProviderError::MissingApiKey { provider })?;
            openai::ask(client, url, model, &messages, api_key, timeout_secs).await
        }
        Provider::Anthropic => {
            let images = anthropic::collect_images(client, &request.image_urls).await;
            let messages = anthropic::build_messages(&request.user_messages, &images);
            let api_key = credentials
                .get(provider)
                .ok_or(ProviderError::MissingApiKey { provider })?;
            anthropic::ask(client, url, model, &messages, api_key, timeout_secs).await
        }
        Provider::Openrouter => {
            let messages = openrouter::build_messages(
                &request.system_prompt,
                &request.user_messages,
                &request.image_urls,
                pool.supports_vision(),
            );
            let api_key = credentials
                .get(provider)
                .ok_or(ProviderError::MissingApiKey { provider })?;
            openrouter::ask(client, url, model, &messages, api_key, timeout_secs).await
        }
    }
}
