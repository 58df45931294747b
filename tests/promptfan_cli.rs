use assert_cmd::Command;
use predicates::str::contains;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn scrub(cmd: &mut Command) {
    cmd.env_remove("PF_CONFIG")
        .env_remove("PF_STATE")
        .env_remove("PF_MODELS")
        .env_remove("PF_TIMEOUT")
        .env_remove("PF_OUTPUT")
        .env_remove("PF_REMOTE_URL")
        .env_remove("PF_OPENAI_URL")
        .env_remove("PF_ANTHROPIC_URL")
        .env_remove("PF_OPENROUTER_URL")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("OPENROUTER_API_KEY")
        .env_remove("RUST_LOG");
}

fn promptfan_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("promptfan"));
    scrub(&mut cmd);
    cmd
}

fn pfask_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pfask"));
    scrub(&mut cmd);
    cmd
}

fn unique_temp_path(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("promptfan-test-{label}-{nanos}"))
}

fn parse_stdout_json(output: &[u8]) -> Value {
    let text = String::from_utf8(output.to_vec()).expect("stdout should be utf-8");
    serde_json::from_str(text.trim()).expect("stdout should contain valid JSON")
}

#[test]
fn dry_run_succeeds_without_api_keys() {
    let state_path = unique_temp_path("state");
    let assert = pfask_cmd()
        .env("PF_STATE", &state_path)
        .args(["-m", "gpt-4o", "--message", "Hi", "--dry-run", "Be terse"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["dry_run"], Value::Bool(true));

    let entry = &body["requests"][0];
    assert_eq!(entry["model"], "gpt-4o");
    assert_eq!(entry["provider"], "openai");
    assert_eq!(entry["body"]["messages"][0]["role"], "system");
    assert_eq!(entry["body"]["messages"][0]["content"], "Be terse");
    assert_eq!(entry["body"]["messages"][1]["content"], "Hi");
}

#[test]
fn dry_run_uses_developer_role_for_reasoning_models() {
    let assert = pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args(["-m", "o1-mini", "--message", "Hi", "--dry-run", "Be terse"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["requests"][0]["body"]["messages"][0]["role"], "developer");
}

#[test]
fn dry_run_drops_images_for_non_vision_router_models() {
    let assert = pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args([
            "-m",
            "deepseek/deepseek-r1",
            "--message",
            "Hi",
            "--image-url",
            "https://example.com/shot.png",
            "--dry-run",
            "Be terse",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    let messages = body["requests"][0]["body"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2, "image message must be absent");
}

#[test]
fn dry_run_keeps_images_for_vision_router_models() {
    let assert = pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args([
            "-m",
            "x-ai/grok-2-vision-1212",
            "--message",
            "Hi",
            "--image-url",
            "https://example.com/shot.png",
            "--dry-run",
            "Be terse",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    let messages = body["requests"][0]["body"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2]["content"][0]["type"], "image_url");
}

#[test]
fn dry_run_reports_unrecognized_models_without_failing() {
    let assert = pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args(["-m", "made-up-model", "--message", "Hi", "--dry-run", "p"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(
        body["requests"][0]["error"],
        "Error: Model not recognized in either OpenAI or Anthropic."
    );
}

#[test]
fn argument_prompt_has_priority_over_stdin() {
    let assert = pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args(["-m", "gpt-4o", "--message", "Hi", "--dry-run", "argument prompt"])
        .write_stdin("stdin prompt")
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(
        body["requests"][0]["body"]["messages"][0]["content"],
        "argument prompt"
    );
}

#[test]
fn prompt_falls_back_to_stdin() {
    let assert = pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args(["-m", "gpt-4o", "--message", "Hi", "--dry-run"])
        .write_stdin("piped prompt\n")
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(
        body["requests"][0]["body"]["messages"][0]["content"],
        "piped prompt"
    );
}

#[test]
fn missing_prompt_returns_explicit_error() {
    pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args(["-m", "gpt-4o", "--message", "Hi", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains(
            "No system prompt provided. Pass it as an argument or pipe it on stdin.",
        ));
}

#[test]
fn missing_models_returns_explicit_error() {
    pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args(["--message", "Hi", "--dry-run", "Be terse"])
        .assert()
        .failure()
        .stderr(contains(
            "No models provided. Use --model, set PF_MODELS, or configure a profile.",
        ));
}

#[test]
fn missing_message_returns_explicit_error() {
    pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args(["-m", "gpt-4o", "--dry-run", "Be terse"])
        .assert()
        .failure()
        .stderr(contains("No user message provided. Use --message."));
}

#[test]
fn models_come_from_pf_models_env_when_flags_are_absent() {
    let assert = pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .env("PF_MODELS", "gpt-4o, o1")
        .args(["--message", "Hi", "--dry-run", "Be terse"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    let requests = body["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["model"], "gpt-4o");
    assert_eq!(requests[1]["model"], "o1");
}

#[test]
fn invalid_output_value_returns_error() {
    pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args(["-m", "gpt-4o", "--message", "Hi", "--output", "yaml", "p"])
        .assert()
        .failure()
        .stderr(contains("Invalid output 'yaml'. Supported values: text, json."));
}

#[test]
fn profile_supplies_models_for_dry_run() {
    let config_path = unique_temp_path("config");
    fs::write(
        &config_path,
        "[profiles.dev]\nmodels = [\"claude-3-opus-latest\"]\n",
    )
    .expect("config should be writable");

    let assert = pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .env("PF_CONFIG", &config_path)
        .args(["--profile", "dev", "--message", "Hi", "--dry-run", "p"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["requests"][0]["model"], "claude-3-opus-latest");
    assert_eq!(body["requests"][0]["provider"], "anthropic");

    let _ = fs::remove_file(&config_path);
}

#[test]
fn profile_not_found_returns_error() {
    let config_path = unique_temp_path("config");
    fs::write(&config_path, "[profiles.other]\n").expect("config should be writable");

    pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .env("PF_CONFIG", &config_path)
        .args(["--profile", "dev", "--message", "Hi", "--dry-run", "p"])
        .assert()
        .failure()
        .stderr(contains("Profile 'dev' not found"));

    let _ = fs::remove_file(&config_path);
}

#[test]
fn invalid_profile_toml_returns_parse_error() {
    let config_path = unique_temp_path("config");
    fs::write(&config_path, "not toml at all [").expect("config should be writable");

    pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .env("PF_CONFIG", &config_path)
        .args(["--profile", "dev", "--message", "Hi", "--dry-run", "p"])
        .assert()
        .failure()
        .stderr(contains("Failed to parse config file"));

    let _ = fs::remove_file(&config_path);
}

#[test]
fn config_check_accepts_a_valid_file() {
    let config_path = unique_temp_path("config");
    fs::write(
        &config_path,
        "[profiles.dev]\nmodels = [\"gpt-4o\"]\noutput = \"json\"\n",
    )
    .expect("config should be writable");

    promptfan_cmd()
        .env("PF_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(contains("config OK"));

    let _ = fs::remove_file(&config_path);
}

#[test]
fn config_check_rejects_unrecognized_models() {
    let config_path = unique_temp_path("config");
    fs::write(
        &config_path,
        "[profiles.dev]\nmodels = [\"made-up-model\"]\n",
    )
    .expect("config should be writable");

    promptfan_cmd()
        .env("PF_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(contains("unrecognized model 'made-up-model'"));

    let _ = fs::remove_file(&config_path);
}

#[test]
fn save_writes_the_rendered_output_file() {
    let save_path = unique_temp_path("save");
    pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args(["-m", "gpt-4o", "--message", "Hi", "--dry-run", "p"])
        .arg("--save")
        .arg(&save_path)
        .assert()
        .success();

    let saved = fs::read_to_string(&save_path).expect("save file should exist");
    let body: Value = serde_json::from_str(saved.trim()).expect("saved output should be JSON");
    assert_eq!(body["dry_run"], Value::Bool(true));

    let _ = fs::remove_file(&save_path);
}

#[test]
fn save_with_invalid_parent_path_returns_explicit_error() {
    pfask_cmd()
        .env("PF_STATE", unique_temp_path("state"))
        .args([
            "-m",
            "gpt-4o",
            "--message",
            "Hi",
            "--dry-run",
            "--save",
            "/nonexistent-dir/out.json",
            "p",
        ])
        .assert()
        .failure()
        .stderr(contains("Failed to write output file"));
}

#[test]
fn free_quota_exhaustion_fails_before_any_network_call() {
    let state_path = unique_temp_path("state");
    let state = json!({
        "uuid": "tmp-1",
        "request_count": 10,
    });
    fs::write(&state_path, state.to_string()).expect("state should be writable");

    pfask_cmd()
        .env("PF_STATE", &state_path)
        // Unroutable backend: the command must fail on quota, not on HTTP.
        .env("PF_REMOTE_URL", "http://127.0.0.1:9")
        .args(["-m", "gpt-4o", "--message", "Hi", "p"])
        .assert()
        .failure()
        .stderr(contains("Free request limit reached (10)."));

    let _ = fs::remove_file(&state_path);
}

#[test]
fn local_key_dispatch_renders_text_and_records_state() {
    let mut server = mockito::Server::new();
    let openai = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(
            json!({ "choices": [{ "message": { "content": "four" } }] }).to_string(),
        )
        .create();

    let state_path = unique_temp_path("state");
    pfask_cmd()
        .env("PF_STATE", &state_path)
        .env("OPENAI_API_KEY", "sk-test")
        .env("PF_OPENAI_URL", format!("{}/v1/chat/completions", server.url()))
        .args(["-m", "gpt-4o", "--message", "2+2?", "Be terse"])
        .assert()
        .success()
        .stdout(contains("input: 2+2?"))
        .stdout(contains("gpt-4o:"))
        .stdout(contains("four"));

    openai.assert();

    let raw = fs::read_to_string(&state_path).expect("state file should be written");
    let state: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(state["request_count"], 1);
    assert_eq!(state["message_history"][0], "2+2?");
    assert_eq!(state["last_selected_models"][0], "gpt-4o");

    let _ = fs::remove_file(&state_path);
}

#[test]
fn missing_provider_key_is_reported_per_model_not_fatally() {
    let mut server = mockito::Server::new();
    let anthropic = server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body(json!({ "content": [{ "text": "terse." }] }).to_string())
        .create();

    let state_path = unique_temp_path("state");
    let assert = pfask_cmd()
        .env("PF_STATE", &state_path)
        .env("ANTHROPIC_API_KEY", "sk-ant")
        .env("PF_ANTHROPIC_URL", format!("{}/v1/messages", server.url()))
        .args([
            "-m",
            "claude-3-5-haiku-latest",
            "-m",
            "gpt-4o",
            "--message",
            "Hi",
            "--json",
            "Be terse",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["claude-3-5-haiku-latest"], "terse.");
    assert_eq!(body["gpt-4o"], "Error: OpenAI API key not found");

    anthropic.assert();
    let _ = fs::remove_file(&state_path);
}

#[test]
fn pfask_and_promptfan_ask_share_the_dry_run_shape() {
    let state_path = unique_temp_path("state");
    let from_pfask = pfask_cmd()
        .env("PF_STATE", &state_path)
        .args(["-m", "gpt-4o", "--message", "Hi", "--dry-run", "p"])
        .assert()
        .success();
    let from_ask = promptfan_cmd()
        .env("PF_STATE", &state_path)
        .args(["ask", "-m", "gpt-4o", "--message", "Hi", "--dry-run", "p"])
        .assert()
        .success();

    assert_eq!(
        parse_stdout_json(&from_pfask.get_output().stdout),
        parse_stdout_json(&from_ask.get_output().stdout)
    );
}

#[test]
fn version_prints_build_metadata() {
    promptfan_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("promptfan 0.1.0 ("));
}

#[test]
fn completion_bash_outputs_script() {
    promptfan_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(contains("promptfan"));
}

#[test]
fn models_lists_the_catalog_with_key_availability() {
    promptfan_cmd()
        .env("OPENAI_API_KEY", "sk-test")
        .arg("models")
        .assert()
        .success()
        .stdout(contains("OpenAI chat (OpenAI, key configured)"))
        .stdout(contains("Anthropic (Anthropic, no key)"))
        .stdout(contains("gpt-4o"))
        .stdout(contains("claude-3-opus-latest"));
}
