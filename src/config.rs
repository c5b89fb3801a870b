//! Configuration management for kfupm-chat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChatError, Result};
use crate::session::FallbackOrder;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for kfupm-chat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote chat service settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Session persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Conversation behaviour settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Deployment environment the client talks to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// A backend running on the same machine
    #[default]
    Local,
    /// The publicly deployed backend
    Deployed,
}

impl Environment {
    /// Parse an environment name ("local" or "deployed")
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "local" | "localhost" => Ok(Self::Local),
            "deployed" | "production" | "prod" => Ok(Self::Deployed),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}

/// Remote chat service configuration
///
/// The base URL and API key are static; the environment selects which
/// base URL is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Which backend to use
    #[serde(default)]
    pub environment: Environment,

    /// Base URL used when `environment` is `local`
    #[serde(default = "default_local_base_url")]
    pub local_base_url: String,

    /// Base URL used when `environment` is `deployed`
    #[serde(default)]
    pub deployed_base_url: Option<String>,

    /// Value sent in the `X-API-Key` header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout; unset leaves the transport defaults in place
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

fn default_local_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            local_base_url: default_local_base_url(),
            deployed_base_url: None,
            api_key: None,
            request_timeout_seconds: None,
        }
    }
}

impl ApiConfig {
    /// Base URL for the selected environment, without a trailing slash
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Config` when `deployed` is selected but no
    /// deployed URL is configured
    ///
    /// # Examples
    ///
    /// ```
    /// use kfupm_chat::config::ApiConfig;
    ///
    /// let api = ApiConfig::default();
    /// assert_eq!(api.base_url().unwrap(), "http://localhost:5000");
    /// ```
    pub fn base_url(&self) -> Result<String> {
        let url = match self.environment {
            Environment::Local => self.local_base_url.as_str(),
            Environment::Deployed => self.deployed_base_url.as_deref().ok_or_else(|| {
                ChatError::Config(
                    "api.deployed_base_url must be set when environment is deployed".to_string(),
                )
            })?,
        };
        Ok(url.trim_end_matches('/').to_string())
    }
}

/// Which session backend to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    /// JSON mapping under one key of a local-storage file
    #[default]
    LocalStorage,
    /// One row per session in SQLite
    Sqlite,
    /// Nothing persisted
    Memory,
}

impl StorageBackendKind {
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "local_storage" | "local-storage" | "json" => Ok(Self::LocalStorage),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }

    fn default_file_name(&self) -> &'static str {
        match self {
            Self::LocalStorage => "local_storage.json",
            Self::Sqlite => "sessions.db",
            Self::Memory => "",
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend type
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// Backing file; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Local-storage key holding the session mapping
    #[serde(default = "default_storage_key")]
    pub key: String,

    /// Which session is "most recent" at startup and after deletes
    #[serde(default)]
    pub fallback_order: FallbackOrder,
}

fn default_storage_key() -> String {
    "kfupm_sessions".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            path: None,
            key: default_storage_key(),
            fallback_order: FallbackOrder::default(),
        }
    }
}

impl StorageConfig {
    /// Backing file path, falling back to the user's data directory
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Config` if no data directory can be determined
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        let proj_dirs = ProjectDirs::from("sa.edu", "kfupm", "kfupm-chat")
            .ok_or_else(|| ChatError::Config("Could not determine data directory".into()))?;
        Ok(proj_dirs
            .data_dir()
            .join(self.backend.default_file_name()))
    }
}

/// Conversation behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Longest accepted message, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Session titles are cut to this many characters
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Per-character delay of the typing effect; 0 disables it
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,

    /// Initial state of the web-search toggle
    #[serde(default)]
    pub search_enabled: bool,
}

fn default_max_message_chars() -> usize {
    2000
}

fn default_title_max_chars() -> usize {
    50
}

fn default_typing_delay_ms() -> u64 {
    8
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
            title_max_chars: default_title_max_chars(),
            typing_delay_ms: default_typing_delay_ms(),
            search_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(env) = std::env::var("KFUPM_CHAT_ENV") {
            match Environment::parse_str(&env) {
                Ok(value) => self.api.environment = value,
                Err(e) => tracing::warn!("Invalid KFUPM_CHAT_ENV: {}", e),
            }
        }

        if let Ok(base_url) = std::env::var("KFUPM_CHAT_BASE_URL") {
            // An explicit URL applies to whichever environment is selected.
            match self.api.environment {
                Environment::Local => self.api.local_base_url = base_url,
                Environment::Deployed => self.api.deployed_base_url = Some(base_url),
            }
        }

        if let Ok(api_key) = std::env::var("KFUPM_CHAT_API_KEY") {
            self.api.api_key = Some(api_key);
        }

        if let Ok(backend) = std::env::var("KFUPM_CHAT_STORAGE_BACKEND") {
            match StorageBackendKind::parse_str(&backend) {
                Ok(value) => self.storage.backend = value,
                Err(e) => tracing::warn!("Invalid KFUPM_CHAT_STORAGE_BACKEND: {}", e),
            }
        }

        if let Ok(path) = std::env::var("KFUPM_CHAT_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(delay) = std::env::var("KFUPM_CHAT_TYPING_DELAY_MS") {
            if let Ok(value) = delay.parse() {
                self.chat.typing_delay_ms = value;
            } else {
                tracing::warn!("Invalid KFUPM_CHAT_TYPING_DELAY_MS: {}", delay);
            }
        }

        if let Ok(search) = std::env::var("KFUPM_CHAT_SEARCH") {
            match search.parse::<bool>() {
                Ok(v) => {
                    self.chat.search_enabled = v;
                    tracing::debug!(search_enabled = v, "Env override: KFUPM_CHAT_SEARCH");
                }
                Err(_) => tracing::warn!("Invalid value for KFUPM_CHAT_SEARCH: {}", search),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Some(env) = cli.env {
            self.api.environment = env;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.local_base_url).map_err(|e| {
            ChatError::Config(format!(
                "api.local_base_url is not a valid URL ({}): {}",
                self.api.local_base_url, e
            ))
        })?;

        if let Some(deployed) = &self.api.deployed_base_url {
            url::Url::parse(deployed).map_err(|e| {
                ChatError::Config(format!(
                    "api.deployed_base_url is not a valid URL ({}): {}",
                    deployed, e
                ))
            })?;
        }

        if self.api.environment == Environment::Deployed && self.api.deployed_base_url.is_none()
        {
            return Err(ChatError::Config(
                "api.deployed_base_url must be set when environment is deployed".to_string(),
            )
            .into());
        }

        if self.api.request_timeout_seconds == Some(0) {
            return Err(ChatError::Config(
                "api.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.storage.key.trim().is_empty() {
            return Err(ChatError::Config("storage.key cannot be empty".to_string()).into());
        }

        if self.chat.max_message_chars == 0 {
            return Err(ChatError::Config(
                "chat.max_message_chars must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.title_max_chars == 0 {
            return Err(
                ChatError::Config("chat.title_max_chars must be greater than 0".to_string()).into(),
            );
        }

        Ok(())
    }
}
