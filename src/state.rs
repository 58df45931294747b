use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const MAX_HISTORY_ITEMS: usize = 30;
pub const MAX_FREE_REQUESTS: u32 = 10;
pub const MAX_PAID_REQUESTS: u32 = 500;

/// Flat key-value state persisted between runs: backend tokens, the request
/// counter, and the bounded history arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub uuid: Option<String>,
    pub api_key: Option<String>,
    pub paid_user: bool,
    pub request_count: u32,
    pub message_history: Vec<String>,
    pub image_url_history: Vec<String>,
    pub last_selected_models: Vec<String>,
}

impl AppState {
    /// Loads state from disk. A missing or unreadable file degrades to the
    /// default state rather than failing the command.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                warn!("ignoring corrupt state file '{}': {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                format!("Failed to create state directory '{}': {err}", parent.display())
            })?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|err| format!("Failed to serialize state: {err}"))?;
        fs::write(path, raw)
            .map_err(|err| format!("Failed to write state file '{}': {err}", path.display()))
    }

    /// De-duplicates, pushes to the front, and truncates to the history cap.
    pub fn record_message(&mut self, message: &str) {
        push_history(&mut self.message_history, message);
    }

    /// Blank entries are not recorded.
    pub fn record_image_urls(&mut self, urls: &str) {
        if urls.trim().is_empty() {
            return;
        }
        push_history(&mut self.image_url_history, urls);
    }

    pub fn record_selected_models(&mut self, models: &[String]) {
        self.last_selected_models = models.to_vec();
    }
}

fn push_history(history: &mut Vec<String>, entry: &str) {
    history.retain(|existing| existing != entry);
    history.insert(0, entry.to_string());
    history.truncate(MAX_HISTORY_ITEMS);
}

/// `PF_STATE` override, else `XDG_STATE_HOME/promptfan/state.json`, else
/// `~/.local/state/promptfan/state.json`.
pub fn state_path() -> Result<PathBuf, String> {
    if let Ok(path) = env::var("PF_STATE") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if let Ok(xdg) = env::var("XDG_STATE_HOME") {
        let trimmed = xdg.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed).join("promptfan").join("state.json"));
        }
    }

    let home = env::var("HOME")
        .map_err(|_| "Cannot resolve state path: set PF_STATE or HOME/XDG_STATE_HOME.".to_string())?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("state")
        .join("promptfan")
        .join("state.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_deduplicates_and_moves_to_front() {
        let mut state = AppState::default();
        state.record_message("first");
        state.record_message("second");
        state.record_message("first");

        assert_eq!(state.message_history, vec!["first", "second"]);
    }

    #[test]
    fn history_is_bounded_to_thirty_entries() {
        let mut state = AppState::default();
        for index in 0..40 {
            state.record_message(&format!("message {index}"));
        }

        assert_eq!(state.message_history.len(), MAX_HISTORY_ITEMS);
        assert_eq!(state.message_history[0], "message 39");
        assert_eq!(state.message_history[29], "message 10");
    }

    #[test]
    fn blank_image_urls_are_not_recorded() {
        let mut state = AppState::default();
        state.record_image_urls("   ");
        state.record_image_urls("");
        assert!(state.image_url_history.is_empty());

        state.record_image_urls("https://x.test/a.png");
        assert_eq!(state.image_url_history.len(), 1);
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = AppState::default();
        state.uuid = Some("tok".to_string());
        state.request_count = 4;
        state.record_selected_models(&["gpt-4o".to_string()]);

        let raw = serde_json::to_string(&state).unwrap();
        let reloaded: AppState = serde_json::from_str(&raw).unwrap();
        assert_eq!(reloaded.uuid.as_deref(), Some("tok"));
        assert_eq!(reloaded.request_count, 4);
        assert_eq!(reloaded.last_selected_models, vec!["gpt-4o"]);
    }

    #[test]
    fn unknown_fields_in_the_state_file_are_tolerated() {
        let reloaded: AppState =
            serde_json::from_str(r#"{"request_count": 2, "someday": true}"#).unwrap();
        assert_eq!(reloaded.request_count, 2);
    }
}
