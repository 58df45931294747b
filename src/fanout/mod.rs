//! Multi-provider prompt fan-out.
//!
//! The module routes model identifiers to the correct provider adapter,
//! builds provider-specific payloads, performs the HTTP calls concurrently,
//! and collects per-model results that never fail the batch.

/// Anthropic messages-API helper functions.
pub mod anthropic;
/// Static model pools and identifier classification.
pub mod catalog;
/// Request validation and concurrent per-model dispatch.
pub mod dispatcher;
pub(crate) mod http;
/// OpenAI chat-completions helper functions.
pub mod openai;
/// OpenRouter chat-completions helper functions.
pub mod openrouter;
/// Provider metadata, credentials, and error types.
pub mod provider;
/// Hosted-backend client for keyless dispatch.
pub mod remote;
