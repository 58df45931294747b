//! Fan one prompt out to many LLMs.
//!
//! The `fanout` module routes model identifiers across OpenAI, Anthropic,
//! and OpenRouter, collecting independent per-model results; the rest is the
//! CLI surface, local config/state, and the hosted-backend fallback.

pub mod commands;
pub mod config;
pub mod fanout;
pub mod state;
