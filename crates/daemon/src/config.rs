// Local configuration for the editor core.
//
// Global config: `~/.clause/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default quiet period before a local edit is written to disk.
const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 500;
/// Minimum allowed save debounce.
const MIN_SAVE_DEBOUNCE_MS: u64 = 50;
/// Maximum allowed save debounce.
const MAX_SAVE_DEBOUNCE_MS: u64 = 5_000;
/// How long `is_saving` stays raised after a write completes.
const DEFAULT_SAVE_GRACE_MS: u64 = 100;
/// Watch events this soon after a save are treated as the save's own echo.
const DEFAULT_ECHO_WINDOW_MS: u64 = 1_000;

/// Root directory for Clause global state: `~/.clause/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".clause"))
}

/// Path to the global config file: `~/.clause/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

// ── Global config ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EditorConfig {
    /// Document persistence timing.
    pub sync: SyncConfig,
    /// Assistant backend settings.
    pub assistant: AssistantConfig,
}

impl EditorConfig {
    /// Load from `~/.clause/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Timing knobs for the document sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub save_debounce_ms: u64,
    pub save_grace_ms: u64,
    pub echo_window_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            save_grace_ms: DEFAULT_SAVE_GRACE_MS,
            echo_window_ms: DEFAULT_ECHO_WINDOW_MS,
        }
    }
}

impl SyncConfig {
    /// Debounce window, clamped to [50ms, 5s].
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(
            self.save_debounce_ms.clamp(MIN_SAVE_DEBOUNCE_MS, MAX_SAVE_DEBOUNCE_MS),
        )
    }

    pub fn save_grace(&self) -> Duration {
        Duration::from_millis(self.save_grace_ms)
    }

    pub fn echo_window(&self) -> Duration {
        Duration::from_millis(self.echo_window_ms)
    }
}

/// Assistant backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    /// Executable probed by `check_available`.
    pub program: String,
    /// Working directory forwarded with every turn (defaults to the
    /// workspace root when unset).
    pub working_dir: Option<PathBuf>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self { program: "claude".into(), working_dir: None }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
