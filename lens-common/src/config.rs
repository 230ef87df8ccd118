//! Bootstrap configuration and root folder resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (--root-folder, --port, --config)
//! 2. Environment variables (NATIVE_LENS_ROOT_FOLDER, ...)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! The TOML file is read once at startup. Runtime settings that may change
//! while running (the classifier API key) live in the database instead.

use crate::history::DuplicatePolicy;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "NATIVE_LENS_ROOT_FOLDER";

/// Environment variable carrying the classifier API key
pub const CLASSIFIER_API_KEY_ENV: &str = "NATIVE_LENS_CLASSIFIER_API_KEY";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "native-lens.db";

const APP_DIR_NAME: &str = "native-lens";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote classification service
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Remote tree-detail service
    #[serde(default)]
    pub tree_detail: TreeDetailConfig,

    /// History ledger behaviour
    #[serde(default)]
    pub history: HistoryConfig,

    /// Largest accepted decoded image, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            logging: LoggingConfig::default(),
            classifier: ClassifierConfig::default(),
            tree_detail: TreeDetailConfig::default(),
            history: HistoryConfig::default(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Classifier endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// API key (lowest priority source, see `lens_identify::config`)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_classifier_base_url")]
    pub base_url: String,

    /// Model path appended to the base URL, e.g. `natreee/13`
    #[serde(default = "default_classifier_model")]
    pub model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_classifier_base_url(),
            model: default_classifier_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Tree-detail backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TreeDetailConfig {
    #[serde(default = "default_tree_detail_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TreeDetailConfig {
    fn default() -> Self {
        Self {
            base_url: default_tree_detail_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// History ledger configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

fn default_port() -> u16 {
    5740
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_classifier_base_url() -> String {
    "https://detect.roboflow.com".to_string()
}

fn default_classifier_model() -> String {
    "natreee/13".to_string()
}

fn default_tree_detail_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_image_bytes() -> usize {
    8 * 1024 * 1024
}

/// Load the bootstrap TOML configuration
///
/// An explicit path must exist. Without one, the platform config file is
/// used when present and built-in defaults otherwise.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                tracing::debug!("No config file found, using built-in defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    tracing::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Platform configuration file path (`~/.config/native-lens/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Root folder resolution:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./native_lens_data"))
}

/// Create the root folder if missing and return the database path inside it
pub fn prepare_root_folder(root_folder: &Path) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        tracing::info!("Created root folder: {}", root_folder.display());
    }
    Ok(root_folder.join(DATABASE_FILE_NAME))
}
