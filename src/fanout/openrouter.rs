use serde::Deserialize;
use serde_json::{Value, json};

use crate::fanout::http::{Auth, post_chat_request};
use crate::fanout::provider::{ChatMessage, Provider, ProviderError, image_url_part};

// Reply fields are defaulted so a success body missing them reads as an
// invalid response format rather than a transport failure.
#[derive(Debug, Default, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Default, Deserialize)]
struct Choice {
    #[serde(default)]
    message: AssistantMessage,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Builds the routing-endpoint message list. Image references are forwarded
/// only for vision-capable models; for every other model they are silently
/// dropped even when URLs were supplied.
pub(crate) fn build_messages(
    system_prompt: &str,
    user_messages: &[String],
    image_urls: &[String],
    vision_capable: bool,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(user_messages.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(user_messages.iter().map(ChatMessage::user));

    if !image_urls.is_empty() && vision_capable {
        let parts = image_urls.iter().map(|url| image_url_part(url)).collect();
        messages.push(ChatMessage::user_parts(parts));
    }

    messages
}

pub(crate) fn request_body(model: &str, messages: &[ChatMessage]) -> Value {
    json!({
        "model": model,
        "messages": messages.iter().map(ChatMessage::to_json).collect::<Vec<_>>(),
        "provider": { "data_collection": "deny" },
    })
}

pub async fn ask(
    client: &reqwest::Client,
    url: &str,
    model: &str,
    messages: &[ChatMessage],
    api_key: &str,
    timeout_secs: Option<u64>,
) -> Result<String, ProviderError> {
    let provider = Provider::Openrouter;
    let payload = request_body(model, messages);

    let response = post_chat_request(client, url, Auth::Bearer(api_key), &payload, timeout_secs)
        .await
        .map_err(|failure| failure.into_provider_error(provider))?;

    let body: ChatCompletionResponse = response
        .json()
        .await
        .map_err(|source| ProviderError::Request { provider, source })?;

    body.choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .filter(|content| !content.is_empty())
        .ok_or(ProviderError::MalformedResponse { provider })
}
