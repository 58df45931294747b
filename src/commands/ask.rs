use std::collections::HashSet;
use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::Args;
use owo_colors::OwoColorize;
use serde_json::{Value, json};
use tracing::warn;

use crate::config::{self, ProfileConfig};
use crate::fanout::catalog;
use crate::fanout::dispatcher::{
    DEFAULT_TIMEOUT_SECS, DispatchOptions, DispatchRequest, DispatchResult,
    UNRECOGNIZED_MODEL_MESSAGE, dispatch,
};
use crate::fanout::provider::{CredentialSet, Endpoints, Provider};
use crate::fanout::remote::RemoteClient;
use crate::fanout::{anthropic, openai, openrouter};
use crate::state::{self, AppState, MAX_FREE_REQUESTS};

#[derive(Debug, Args, Clone)]
pub struct AskArgs {
    /// System prompt; read from stdin when omitted.
    pub prompt: Option<String>,

    /// Model to query; repeatable. Falls back to PF_MODELS, the profile,
    /// then the last used selection.
    #[arg(short = 'm', long = "model", value_name = "MODEL")]
    pub models: Vec<String>,

    /// User message; repeatable, at least one required.
    #[arg(long = "message", value_name = "TEXT")]
    pub messages: Vec<String>,

    /// Image URL; repeatable, comma-separated lists accepted.
    #[arg(long = "image-url", value_name = "URL")]
    pub image_urls: Vec<String>,

    /// Per-provider request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Config profile supplying defaults.
    #[arg(long)]
    pub profile: Option<String>,

    /// Output format: text or json.
    #[arg(long, value_name = "FORMAT")]
    pub output: Option<String>,

    /// Shorthand for --output json.
    #[arg(long)]
    pub json: bool,

    /// Also write the rendered output to a file.
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,

    /// Print the per-model request payloads without calling any provider.
    #[arg(long)]
    pub dry_run: bool,

    /// Only fatal errors on stderr.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Debug logging on stderr.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Text,
    Json,
}

pub async fn run(args: AskArgs) -> Result<(), String> {
    super::init_logging(args.quiet, args.verbose);

    let profile = match &args.profile {
        Some(name) => config::load_profile(name)?,
        None => ProfileConfig::default(),
    };

    let system_prompt = resolve_system_prompt(&args, &profile)?;
    let user_messages = resolve_user_messages(&args)?;
    let image_urls = split_list(&args.image_urls);
    let timeout_secs = resolve_timeout(&args, &profile)?;
    let output_mode = resolve_output_mode(&args, &profile)?;

    let state_path = state::state_path()?;
    let mut app_state = AppState::load(&state_path);
    let models = resolve_models(&args, &profile, &app_state)?;

    let request = DispatchRequest {
        system_prompt,
        models,
        user_messages,
        image_urls,
    };

    if args.dry_run {
        let rendered = render_dry_run(&request)?;
        write_save_file(args.save.as_deref(), &rendered)?;
        println!("{rendered}");
        return Ok(());
    }

    let credentials = CredentialSet::from_env();
    let results = if credentials.any_present() {
        let options = DispatchOptions {
            timeout_secs: Some(timeout_secs),
            endpoints: Endpoints::from_env(),
        };
        dispatch(&request, &credentials, &options)
            .await
            .map_err(|err| err.to_string())?
    } else {
        run_remote(&request, &mut app_state, &state_path).await?
    };

    for message in &request.user_messages {
        app_state.record_message(message);
    }
    app_state.record_image_urls(&request.image_urls.join(", "));
    app_state.record_selected_models(&request.models);
    app_state.request_count += 1;
    if let Err(err) = app_state.save(&state_path) {
        warn!("{err}");
    }

    let rendered = match output_mode {
        OutputMode::Json => serde_json::to_string_pretty(&results)
            .map_err(|err| format!("Failed to serialize results: {err}"))?,
        OutputMode::Text => render_text(&request, &results),
    };
    write_save_file(args.save.as_deref(), &rendered)?;
    println!("{rendered}");

    Ok(())
}

/// Remote fallback when no provider key is configured: free-quota gate,
/// lazy temp-token bootstrap, then backend dispatch.
async fn run_remote(
    request: &DispatchRequest,
    app_state: &mut AppState,
    state_path: &Path,
) -> Result<DispatchResult, String> {
    if !app_state.paid_user && app_state.request_count >= MAX_FREE_REQUESTS {
        return Err(format!(
            "Free request limit reached ({MAX_FREE_REQUESTS}). Authenticate with `promptfan auth <token>` or set a provider API key."
        ));
    }

    let remote = RemoteClient::from_env();
    let (token, paid_user) = match (&app_state.paid_user, &app_state.api_key) {
        (true, Some(api_key)) => (api_key.clone(), true),
        _ => {
            let token = match &app_state.uuid {
                Some(uuid) => uuid.clone(),
                None => {
                    let token = remote.free_token().await.map_err(|err| err.to_string())?;
                    app_state.uuid = Some(token.clone());
                    if let Err(err) = app_state.save(state_path) {
                        warn!("{err}");
                    }
                    token
                }
            };
            (token, false)
        }
    };

    remote
        .dispatch(request, &token, paid_user)
        .await
        .map_err(|err| err.to_string())
}

fn resolve_system_prompt(args: &AskArgs, profile: &ProfileConfig) -> Result<String, String> {
    if let Some(prompt) = &args.prompt
        && !prompt.trim().is_empty()
    {
        return Ok(prompt.clone());
    }
    if let Some(system) = &profile.system
        && !system.trim().is_empty()
    {
        return Ok(system.clone());
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("Failed to read system prompt from stdin: {err}"))?;
    let prompt = buffer.trim().to_string();
    if prompt.is_empty() {
        return Err(
            "No system prompt provided. Pass it as an argument or pipe it on stdin.".to_string(),
        );
    }
    Ok(prompt)
}

fn resolve_user_messages(args: &AskArgs) -> Result<Vec<String>, String> {
    if args.messages.is_empty() {
        return Err("No user message provided. Use --message.".to_string());
    }
    Ok(args.messages.clone())
}

fn resolve_models(
    args: &AskArgs,
    profile: &ProfileConfig,
    app_state: &AppState,
) -> Result<Vec<String>, String> {
    if !args.models.is_empty() {
        return Ok(split_list(&args.models));
    }
    if let Some(raw) = non_empty_env("PF_MODELS") {
        return Ok(split_list(&[raw]));
    }
    if let Some(models) = &profile.models
        && !models.is_empty()
    {
        return Ok(models.clone());
    }
    if !app_state.last_selected_models.is_empty() {
        return Ok(app_state.last_selected_models.clone());
    }
    Err("No models provided. Use --model, set PF_MODELS, or configure a profile.".to_string())
}

fn resolve_timeout(args: &AskArgs, profile: &ProfileConfig) -> Result<u64, String> {
    if let Some(timeout) = args.timeout {
        return Ok(timeout);
    }
    if let Some(raw) = non_empty_env("PF_TIMEOUT") {
        return raw
            .parse()
            .map_err(|_| format!("Invalid PF_TIMEOUT '{raw}'. Expected seconds."));
    }
    Ok(profile.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
}

fn resolve_output_mode(args: &AskArgs, profile: &ProfileConfig) -> Result<OutputMode, String> {
    if args.json {
        return Ok(OutputMode::Json);
    }

    let value = args
        .output
        .clone()
        .or_else(|| non_empty_env("PF_OUTPUT"))
        .or_else(|| profile.output.clone());

    match value.as_deref() {
        None | Some("text") => Ok(OutputMode::Text),
        Some("json") => Ok(OutputMode::Json),
        Some(other) => Err(format!(
            "Invalid output '{other}'. Supported values: text, json."
        )),
    }
}

/// Splits repeatable args that may themselves hold comma-separated lists.
fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn unique_in_order(models: &[String]) -> Vec<&String> {
    let mut seen = HashSet::new();
    models
        .iter()
        .filter(|model| seen.insert(model.as_str()))
        .collect()
}

/// Renders the exact per-model payloads as JSON. Anthropic image blocks are
/// listed as pending URLs since dry-run never touches the network.
fn render_dry_run(request: &DispatchRequest) -> Result<String, String> {
    let endpoints = Endpoints::from_env();
    let mut entries: Vec<Value> = Vec::new();

    for model in unique_in_order(&request.models) {
        let entry = match catalog::resolve(model) {
            None => json!({ "model": model, "error": UNRECOGNIZED_MODEL_MESSAGE }),
            Some(pool) => {
                let provider = pool.provider();
                let body = match provider {
                    Provider::Openai => {
                        let messages = openai::build_messages(
                            &request.system_prompt,
                            pool == catalog::ModelPool::OpenaiReasoning,
                            &request.user_messages,
                            &request.image_urls,
                        );
                        openai::request_body(model, &messages)
                    }
                    Provider::Anthropic => {
                        let messages = anthropic::build_messages(&request.user_messages, &[]);
                        anthropic::request_body(model, &messages)
                    }
                    Provider::Openrouter => {
                        let messages = openrouter::build_messages(
                            &request.system_prompt,
                            &request.user_messages,
                            &request.image_urls,
                            pool.supports_vision(),
                        );
                        openrouter::request_body(model, &messages)
                    }
                };

                let mut entry = json!({
                    "model": model,
                    "provider": provider.as_str(),
                    "url": endpoints.url(provider),
                    "body": body,
                });
                if provider == Provider::Anthropic && !request.image_urls.is_empty() {
                    entry["pending_image_urls"] = json!(request.image_urls);
                }
                entry
            }
        };
        entries.push(entry);
    }

    let document = json!({ "dry_run": true, "requests": entries });
    serde_json::to_string_pretty(&document)
        .map_err(|err| format!("Failed to serialize dry-run output: {err}"))
}

/// Mirrors the original result panel: the input line, an optional image-urls
/// line, then one block per model in first-seen request order.
fn render_text(request: &DispatchRequest, results: &DispatchResult) -> String {
    let mut out = format!("input: {}\n", request.user_messages.join("; "));
    if !request.image_urls.is_empty() {
        out.push_str(&format!("image urls: {}\n", request.image_urls.join(", ")));
    }
    out.push('\n');

    let colorize = io::stdout().is_terminal();
    for model in unique_in_order(&request.models) {
        let value = results
            .get(model.as_str())
            .map(String::as_str)
            .unwrap_or("Error: No result returned");
        let header = if colorize {
            format!("{}:", model.bold())
        } else {
            format!("{model}:")
        };
        out.push_str(&format!("{header}\n{value}\n\n"));
    }

    out.trim_end().to_string()
}

fn write_save_file(path: Option<&Path>, rendered: &str) -> Result<(), String> {
    let Some(path) = path else {
        return Ok(());
    };
    fs::write(path, rendered)
        .map_err(|err| format!("Failed to write output file '{}': {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_handles_repeats_and_commas() {
        let values = vec![
            "gpt-4o, o1-mini".to_string(),
            "claude-3-opus-latest".to_string(),
            " ".to_string(),
        ];
        assert_eq!(
            split_list(&values),
            vec!["gpt-4o", "o1-mini", "claude-3-opus-latest"]
        );
    }

    #[test]
    fn unique_in_order_keeps_first_occurrence() {
        let models = vec![
            "gpt-4o".to_string(),
            "o1".to_string(),
            "gpt-4o".to_string(),
        ];
        let unique = unique_in_order(&models);
        assert_eq!(unique, vec!["gpt-4o", "o1"]);
    }

    #[test]
    fn text_rendering_orders_models_as_requested() {
        let request = DispatchRequest {
            system_prompt: "p".to_string(),
            models: vec!["b-model".to_string(), "a-model".to_string()],
            user_messages: vec!["Hi".to_string()],
            image_urls: Vec::new(),
        };
        let mut results = DispatchResult::new();
        results.insert("a-model".to_string(), "alpha".to_string());
        results.insert("b-model".to_string(), "beta".to_string());

        let rendered = render_text(&request, &results);
        let beta_at = rendered.find("beta").unwrap();
        let alpha_at = rendered.find("alpha").unwrap();
        assert!(beta_at < alpha_at);
        assert!(rendered.starts_with("input: Hi"));
    }

    #[test]
    fn dry_run_lists_anthropic_images_as_pending() {
        let request = DispatchRequest {
            system_prompt: "p".to_string(),
            models: vec!["claude-3-opus-latest".to_string()],
            user_messages: vec!["Hi".to_string()],
            image_urls: vec!["https://x.test/a.png".to_string()],
        };
        let rendered = render_dry_run(&request).unwrap();
        let document: Value = serde_json::from_str(&rendered).unwrap();

        let entry = &document["requests"][0];
        assert_eq!(entry["provider"], "anthropic");
        assert_eq!(entry["pending_image_urls"][0], "https://x.test/a.png");
        assert_eq!(entry["body"]["max_tokens"], 1024);
    }
}
