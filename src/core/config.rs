//! Environment-based configuration
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Configurable dictionary base URLs and external notify command
//! - 1.0.0: Initial release with database path and log level

use anyhow::{anyhow, Result};

/// Default SQLite database file
pub const DEFAULT_DATABASE_PATH: &str = "wordminder.db";

pub const DEFAULT_OWLBOT_BASE_URL: &str = "https://owlbot.info/api/v4/dictionary";
pub const DEFAULT_WORDNIK_BASE_URL: &str = "https://api.wordnik.com/v4/word.json";
pub const DEFAULT_FREE_DICTIONARY_BASE_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";

/// Base URLs for each dictionary source, without trailing slash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEndpoints {
    pub owlbot: String,
    pub wordnik: String,
    pub free: String,
}

impl Default for DictionaryEndpoints {
    fn default() -> Self {
        DictionaryEndpoints {
            owlbot: DEFAULT_OWLBOT_BASE_URL.to_string(),
            wordnik: DEFAULT_WORDNIK_BASE_URL.to_string(),
            free: DEFAULT_FREE_DICTIONARY_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub log_level: String,
    pub endpoints: DictionaryEndpoints,
    /// External program invoked as `<cmd> <title> <body>` for each reminder
    pub notify_command: Option<String>,
}

impl Config {
    /// Build configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_path =
            non_empty("WORDMINDER_DB_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let log_level = non_empty("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let defaults = DictionaryEndpoints::default();
        let endpoints = DictionaryEndpoints {
            owlbot: parse_base_url("OWLBOT_BASE_URL", non_empty("OWLBOT_BASE_URL"), defaults.owlbot)?,
            wordnik: parse_base_url(
                "WORDNIK_BASE_URL",
                non_empty("WORDNIK_BASE_URL"),
                defaults.wordnik,
            )?,
            free: parse_base_url(
                "FREE_DICTIONARY_BASE_URL",
                non_empty("FREE_DICTIONARY_BASE_URL"),
                defaults.free,
            )?,
        };

        Ok(Config {
            database_path,
            log_level,
            endpoints,
            notify_command: non_empty("REMINDER_NOTIFY_COMMAND"),
        })
    }
}

fn parse_base_url(key: &str, value: Option<String>, default: String) -> Result<String> {
    let Some(url) = value else {
        return Ok(default);
    };
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(anyhow!("{key} must start with http:// or https://, got {url}"));
    }
    Ok(url.trim_end_matches('/').to_string())
}
