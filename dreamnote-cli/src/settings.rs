//! Application settings persistence for Dream Note.
//!
//! Stores user preferences (the editor command and how long to wait for it)
//! in a JSON file; see [`crate::paths::AppPaths`] for its location.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable consulted when no editor is configured.
pub const EDITOR_ENV: &str = "DREAMNOTE_EDITOR";
/// Editor used when nothing else is configured.
pub const DEFAULT_EDITOR: &str = "nvim";

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Command line used to start the editor, e.g. `"nvim -u NONE"`.
    pub editor_command: Option<String>,
    /// Seconds to wait for the editor to connect back.
    pub attach_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            editor_command: None,
            attach_timeout_secs: 10,
        }
    }
}

/// A resolved editor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Settings {
    /// Picks the editor command line: settings, then `$DREAMNOTE_EDITOR`,
    /// then [`DEFAULT_EDITOR`]. `env` looks up environment variables.
    pub fn editor_line(&self, env: impl Fn(&str) -> Option<String>) -> String {
        self.editor_command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| env(EDITOR_ENV).filter(|c| !c.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
    }

    /// Splits the editor command line and locates the program on `PATH`.
    pub fn resolve_editor(&self, env: impl Fn(&str) -> Option<String>) -> Result<EditorCommand> {
        let line = self.editor_line(env);
        let mut words = shell_words::split(&line).map_err(|e| {
            AppError::editor(format!("Failed to parse editor command '{line}': {e}"))
        })?;
        if words.is_empty() {
            return Err(AppError::editor("Empty editor command"));
        }
        let name = words.remove(0);
        let program = which::which(&name)
            .map_err(|e| AppError::editor(format!("Editor '{name}' not found: {e}")))?;
        debug!("editor resolved to {}", program.display());
        Ok(EditorCommand {
            program,
            args: words,
        })
    }
}

/// Loads settings from `path`; returns defaults if the file is missing or corrupt.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring unreadable settings {}: {e}", path.display());
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

/// Saves settings to `path`, creating parent directories as needed.
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

/// Loads settings, writing a default file first when there is none yet so
/// the user has something to edit.
pub fn load_or_init_settings(path: &Path) -> Settings {
    if !path.exists() {
        match save_settings(path, &Settings::default()) {
            Ok(()) => info!("wrote default settings to {}", path.display()),
            Err(e) => warn!("could not write settings {}: {e}", path.display()),
        }
    }
    load_settings(path)
}
