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

/// Builds the chat-completions message list: the system prompt first
/// (`developer` role for reasoning models), one user message per entry, and
/// a trailing multipart message with pass-through image references when any
/// image URLs were supplied.
pub(crate) fn build_messages(
    system_prompt: &str,
    reasoning: bool,
    user_messages: &[String],
    image_urls: &[String],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(user_messages.len() + 2);
    messages.push(if reasoning {
        ChatMessage::developer(system_prompt)
    } else {
        ChatMessage::system(system_prompt)
    });
    messages.extend(user_messages.iter().map(ChatMessage::user));

    if !image_urls.is_empty() {
        let parts = image_urls.iter().map(|url| image_url_part(url)).collect();
        messages.push(ChatMessage::user_parts(parts));
    }

    messages
}

pub(crate) fn request_body(model: &str, messages: &[ChatMessage]) -> Value {
    json!({
        "model": model,
        "messages": messages.iter().map(ChatMessage::to_json).collect::<Vec<_>>(),
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
    let provider = Provider::Openai;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn standard_models_get_a_system_role_prompt() {
        let messages = build_messages("Be terse", false, &strings(&["Hi"]), &[]);
        let body = request_body("gpt-4o", &messages);

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be terse");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn reasoning_models_get_a_developer_role_prompt() {
        let messages = build_messages("Be terse", true, &strings(&["Hi"]), &[]);
        assert_eq!(messages[0].to_json()["role"], "developer");
    }

    #[test]
    fn image_urls_become_one_trailing_multipart_message() {
        let urls = strings(&["https://x.test/a.png", "https://x.test/b.jpg"]);
        let messages = build_messages("p", false, &strings(&["Hi"]), &urls);
        let last = messages.last().unwrap().to_json();

        assert_eq!(last["role"], "user");
        let parts = last["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "image_url");
        assert_eq!(parts[0]["image_url"]["url"], "https://x.test/a.png");
        assert_eq!(parts[1]["image_url"]["url"], "https://x.test/b.jpg");
    }

    #[test]
    fn no_image_message_when_url_list_is_empty() {
        let messages = build_messages("p", false, &strings(&["Hi", "again"]), &[]);
        assert_eq!(messages.len(), 3);
    }
}
