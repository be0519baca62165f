//! Application configuration for blockpath.
//!
//! User config lives at `~/.blockpath/blockpath.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BlockpathError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "blockpath.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".blockpath";

// ---------------------------------------------------------------------------
// Config structs (matching blockpath.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host editor API connection.
    #[serde(default)]
    pub host: HostConfig,

    /// Refresh timing for the content trackers.
    #[serde(default)]
    pub tracker: TrackerSettings,

    /// Breadcrumb presentation.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Text extraction and word counting.
    #[serde(default)]
    pub text: TextConfig,
}

/// `[host]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// URL of the host's local HTTP API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:12315/api".into()
}
fn default_token_env() -> String {
    "LOGSEQ_API_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    10
}

/// `[tracker]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Quiet period after the last content change before refetching.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long a blur waits for a new focus before clearing the display.
    #[serde(default = "default_blur_grace_ms")]
    pub blur_grace_ms: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            blur_grace_ms: default_blur_grace_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    1000
}
fn default_blur_grace_ms() -> u64 {
    100
}

/// `[display]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Label shown for a block whose title has no text.
    #[serde(default = "default_placeholder_label")]
    pub placeholder_label: String,

    /// Glyph placed between breadcrumb segments.
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            placeholder_label: default_placeholder_label(),
            separator: default_separator(),
        }
    }
}

fn default_placeholder_label() -> String {
    "…".into()
}
fn default_separator() -> String {
    " / ".into()
}

/// `[text]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Case-insensitive substrings of a macro name that mark it as a reference.
    #[serde(default = "default_reference_markers")]
    pub reference_markers: Vec<String>,

    /// Extra single-character punctuation for the word tokenizer.
    #[serde(default = "default_extra_punctuation")]
    pub extra_punctuation: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            reference_markers: default_reference_markers(),
            extra_punctuation: default_extra_punctuation(),
        }
    }
}

fn default_reference_markers() -> Vec<String> {
    vec!["reference".into()]
}
fn default_extra_punctuation() -> Vec<String> {
    vec!["·".into()]
}

// ---------------------------------------------------------------------------
// Tracker config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime tracker timing, merged from config file and CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Debounce delay for content-change refetches.
    pub debounce: Duration,
    /// Grace period between blur and clearing the display.
    pub blur_grace: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for TrackerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.tracker.debounce_ms),
            blur_grace: Duration::from_millis(config.tracker.blur_grace_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.blockpath/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BlockpathError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.blockpath/blockpath.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BlockpathError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BlockpathError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BlockpathError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BlockpathError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BlockpathError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the host API token from the env var named in the config.
pub fn resolve_api_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.host.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(BlockpathError::config(format!(
            "host API token not found. Set the {var_name} environment variable \
             to the token configured in the host's HTTP API server settings."
        ))),
    }
}
