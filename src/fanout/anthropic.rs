use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::fanout::http::{Auth, post_chat_request};
use crate::fanout::provider::{Provider, ProviderError};

pub(crate) const MAX_TOKENS: u32 = 1024;

// The reply field is defaulted so a success body missing it reads as an
// invalid response format rather than a transport failure.
#[derive(Debug, Default, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Per-image failure. Logged and the image dropped; never surfaced as a
/// model-level error.
#[derive(Debug)]
pub(crate) enum ImageError {
    InvalidUrl(String),
    UnsupportedFormat(String),
    Fetch(reqwest::Error),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(detail) => write!(f, "invalid image URL: {detail}"),
            Self::UnsupportedFormat(extension) => {
                write!(f, "unsupported image format: {extension}")
            }
            Self::Fetch(source) => write!(f, "image fetch failed: {source}"),
        }
    }
}

/// Determines the media type strictly from the URL's file extension.
/// Only jpeg/jpg and png are accepted. The path is percent-decoded first so
/// an encoded dot still counts as an extension separator.
pub(crate) fn media_type_from_url(image_url: &str) -> Result<&'static str, ImageError> {
    let url = Url::parse(image_url).map_err(|err| ImageError::InvalidUrl(err.to_string()))?;
    let path = percent_decode_str(url.path()).decode_utf8_lossy();
    let extension = path
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    match extension.as_str() {
        "jpeg" | "jpg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        other => Err(ImageError::UnsupportedFormat(other.to_string())),
    }
}

/// Fetched image ready for embedding as a base64 source block.
#[derive(Debug, Clone)]
pub(crate) struct ImageAttachment {
    media_type: &'static str,
    data: String,
}

async fn fetch_image(
    client: &reqwest::Client,
    image_url: &str,
) -> Result<ImageAttachment, ImageError> {
    let media_type = media_type_from_url(image_url)?;
    let response = client
        .get(image_url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(ImageError::Fetch)?;
    let bytes = response.bytes().await.map_err(ImageError::Fetch)?;

    Ok(ImageAttachment {
        media_type,
        data: STANDARD.encode(&bytes),
    })
}

/// Fetches and encodes every image URL, skipping the ones that fail so the
/// rest of the payload is still assembled.
pub(crate) async fn collect_images(
    client: &reqwest::Client,
    image_urls: &[String],
) -> Vec<ImageAttachment> {
    let mut attachments = Vec::new();
    for image_url in image_urls {
        match fetch_image(client, image_url).await {
            Ok(attachment) => attachments.push(attachment),
            Err(err) => warn!(%image_url, "skipping image: {err}"),
        }
    }
    attachments
}

/// Builds the messages-API payload: one user message per text entry, then
/// one user message per fetched image. The system prompt is not sent on
/// this path.
pub(crate) fn build_messages(user_messages: &[String], images: &[ImageAttachment]) -> Vec<Value> {
    let mut messages: Vec<Value> = user_messages
        .iter()
        .map(|message| {
            json!({
                "role": "user",
                "content": [{ "type": "text", "text": message }],
            })
        })
        .collect();

    for image in images {
        messages.push(json!({
            "role": "user",
            "content": [{
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type,
                    "data": image.data,
                },
            }],
        }));
    }

    messages
}

pub(crate) fn request_body(model: &str, messages: &[Value]) -> Value {
    json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "messages": messages,
    })
}

pub async fn ask(
    client: &reqwest::Client,
    url: &str,
    model: &str,
    messages: &[Value],
    api_key: &str,
    timeout_secs: Option<u64>,
) -> Result<String, ProviderError> {
    let provider = Provider::Anthropic;
    let payload = request_body(model, messages);

    let response = post_chat_request(
        client,
        url,
        Auth::AnthropicKey(api_key),
        &payload,
        timeout_secs,
    )
    .await
    .map_err(|failure| failure.into_provider_error(provider))?;

    let body: MessagesResponse = response
        .json()
        .await
        .map_err(|source| ProviderError::Request { provider, source })?;

    body.content
        .first()
        .and_then(|block| block.text.clone())
        .filter(|text| !text.is_empty())
        .ok_or(ProviderError::MalformedResponse { provider })
}
