use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Bot configuration, loaded once at startup and immutable afterwards.
///
/// ```toml
/// [telegram]
/// bot_token = "123456:ABC..."
/// owner_username = "alice"
/// owner_chat_id = 123456789
/// owner_language = "en"
///
/// [locales]
/// directory = "resources"
/// fallback_language = "en"
///
/// [storage]
/// backend = "memory"   # or "sqlite"
/// database_path = "routes.db"
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default = "default_locales_config")]
    pub locales: LocalesConfig,
    #[serde(default = "default_storage_config")]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// The single account whose messages are treated as answers.
    pub owner_username: String,
    /// Chat the bot forwards questions to. 0 until the owner has run /id
    /// and copied the value here.
    #[serde(default)]
    pub owner_chat_id: i64,
    #[serde(default = "default_language")]
    pub owner_language: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalesConfig {
    #[serde(default = "default_locales_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_language")]
    pub fallback_language: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_locales_dir() -> PathBuf {
    PathBuf::from("resources")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("routes.db")
}

fn default_locales_config() -> LocalesConfig {
    LocalesConfig {
        directory: default_locales_dir(),
        fallback_language: default_language(),
    }
}

fn default_storage_config() -> StorageConfig {
    StorageConfig {
        backend: StorageBackend::default(),
        database_path: default_db_path(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}
