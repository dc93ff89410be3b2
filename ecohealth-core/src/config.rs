use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::directory::JoinStrategy;
use crate::error::{PortalError, PortalResult};
use crate::http::EndpointCategory;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PortalConfig {
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub auto_logout: AutoLogoutConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Base URLs of the three backends. The patient endpoints are served by the
/// auth backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_chat_url")]
    pub chat_url: String,

    #[serde(default = "default_feedback_url")]
    pub feedback_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Token file; empty means `{data_dir}/ecohealth/session.json`.
    #[serde(default)]
    pub token_file: String,

    #[serde(default = "default_token_key")]
    pub token_key: String,
}

/// Endpoint categories whose 401 responses never force a logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoLogoutConfig {
    #[serde(default = "default_exempt")]
    pub exempt: Vec<EndpointCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_language")]
    pub source_language: String,

    #[serde(default = "default_language")]
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub join_strategy: JoinStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

fn default_auth_url() -> String {
    "http://localhost:8000/auth".to_string()
}

fn default_chat_url() -> String {
    "http://localhost:8001/chat".to_string()
}

fn default_feedback_url() -> String {
    "http://localhost:8002/feedback".to_string()
}

fn default_token_key() -> String {
    "token".to_string()
}

fn default_exempt() -> Vec<EndpointCategory> {
    vec![
        EndpointCategory::Login,
        EndpointCategory::Chat,
        EndpointCategory::Feedback,
    ]
}

fn default_language() -> String {
    "en".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            chat_url: default_chat_url(),
            feedback_url: default_feedback_url(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_file: String::new(),
            token_key: default_token_key(),
        }
    }
}

impl Default for AutoLogoutConfig {
    fn default() -> Self {
        Self {
            exempt: default_exempt(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            source_language: default_language(),
            target_language: default_language(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl PortalConfig {
    pub fn load() -> PortalResult<Self> {
        Self::load_from_paths(get_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> PortalResult<Self> {
        load_dotenv_files();

        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ECOHEALTH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut portal_config: PortalConfig = builder.build()?.try_deserialize()?;

        if let Ok(url) = std::env::var("ECOHEALTH_AUTH_URL") {
            portal_config.backends.auth_url = url;
        }
        if let Ok(url) = std::env::var("ECOHEALTH_CHAT_URL") {
            portal_config.backends.chat_url = url;
        }
        if let Ok(url) = std::env::var("ECOHEALTH_FEEDBACK_URL") {
            portal_config.backends.feedback_url = url;
        }
        if let Ok(path) = std::env::var("ECOHEALTH_TOKEN_FILE") {
            portal_config.session.token_file = path;
        }

        if let Ok(level) = std::env::var("ECOHEALTH_LOG_LEVEL") {
            portal_config.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            portal_config.logging.level = level;
        }

        portal_config.validate()?;

        Ok(portal_config)
    }

    pub fn validate(&self) -> PortalResult<()> {
        let urls = [
            ("backends.auth_url", &self.backends.auth_url),
            ("backends.chat_url", &self.backends.chat_url),
            ("backends.feedback_url", &self.backends.feedback_url),
        ];

        for (key, url) in urls {
            if url.is_empty() {
                return Err(PortalError::MissingConfig(key.to_string()));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PortalError::InvalidConfigValue {
                    key: key.to_string(),
                    message: "Must be an http:// or https:// URL".to_string(),
                });
            }
        }

        if self.session.token_key.trim().is_empty() {
            return Err(PortalError::MissingConfig("session.token_key".to_string()));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) && !level_lower.contains('=') {
            return Err(PortalError::InvalidConfigValue {
                key: "logging.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        Ok(())
    }

    /// Resolved location of the persisted token file.
    pub fn token_path(&self) -> PortalResult<PathBuf> {
        if !self.session.token_file.is_empty() {
            return Ok(PathBuf::from(&self.session.token_file));
        }

        get_data_dir()
            .map(|dir| dir.join("session.json"))
            .ok_or_else(|| PortalError::MissingConfig("session.token_file".to_string()))
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("config").join("default.toml"));
        paths.push(cwd.join("config").join("local.toml"));
        paths.push(cwd.join("ecohealth.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("ecohealth").join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".ecohealth").join("config.toml"));
    }

    paths
}

fn load_dotenv_files() {
    let mut env_paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        env_paths.push(cwd.join(".env"));
        env_paths.push(cwd.join(".env.local"));
    }

    if let Some(home) = dirs::home_dir() {
        env_paths.push(home.join(".ecohealth").join(".env"));
    }

    for path in env_paths {
        if path.exists() {
            let _ = dotenvy::from_path(&path);
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ecohealth"))
}

pub fn get_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("ecohealth"))
}
