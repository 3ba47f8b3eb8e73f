//! # Store
//!
//! SQLite-backed key/value settings and saved-word list shared by the daemon
//! and the CLI. Every write is published to in-process subscribers so the
//! reminder scheduler can re-arm when its settings change.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Stable word ids (AUTOINCREMENT) replace positional removal
//! - 1.1.0: Change broadcast for settings subscribers
//! - 1.0.0: Initial settings table and word list

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlite::{Connection, State};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::{broadcast, Mutex};

use crate::features::dictionary::GroupedDefinitions;
use crate::features::reminders::ReminderSettings;

pub const KEY_REMINDER_ENABLED: &str = "reminderEnabled";
pub const KEY_REMINDER_INTERVAL: &str = "reminderInterval";
pub const KEY_REMINDER_START: &str = "reminderStart";
pub const KEY_REMINDER_END: &str = "reminderEnd";
pub const KEY_THEME: &str = "theme";
pub const KEY_OWLBOT: &str = "owlbotKey";
pub const KEY_WORDNIK: &str = "wordnikKey";
/// Pseudo-key published when the word list changes
pub const KEY_WORD_LIST: &str = "wordList";

/// Keys whose change requires the reminder timer to be re-armed
pub const REMINDER_KEYS: [&str; 4] = [
    KEY_REMINDER_ENABLED,
    KEY_REMINDER_INTERVAL,
    KEY_REMINDER_START,
    KEY_REMINDER_END,
];

const CHANGE_CHANNEL_CAPACITY: usize = 64;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS words (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        word TEXT NOT NULL,
        meanings TEXT NOT NULL,
        saved_at TEXT NOT NULL
    );
";

/// Saved meanings: grouped definitions, or a plain string from older saves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Meanings {
    Grouped(GroupedDefinitions),
    Text(String),
}

impl Meanings {
    /// Best available definition text for a reminder body
    pub fn reminder_text(&self) -> Option<&str> {
        match self {
            Meanings::Grouped(grouped) => grouped.first_definition(),
            Meanings::Text(text) => Some(text.trim()).filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedWord {
    pub id: i64,
    pub word: String,
    pub meanings: Meanings,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Dark => write!(f, "dark"),
            Theme::Light => write!(f, "light"),
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(anyhow!("Invalid theme: {} (expected dark or light)", s)),
        }
    }
}

/// Credentials for the keyed dictionary sources; presence enables a source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceKeys {
    pub owlbot_key: Option<String>,
    pub wordnik_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyedSource {
    OwlBot,
    Wordnik,
}

impl KeyedSource {
    fn storage_key(self) -> &'static str {
        match self {
            KeyedSource::OwlBot => KEY_OWLBOT,
            KeyedSource::Wordnik => KEY_WORDNIK,
        }
    }
}

impl std::str::FromStr for KeyedSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "owlbot" => Ok(KeyedSource::OwlBot),
            "wordnik" => Ok(KeyedSource::Wordnik),
            _ => Err(anyhow!("Unknown source: {} (expected owlbot or wordnik)", s)),
        }
    }
}

/// Set of keys modified by one write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub keys: Vec<String>,
}

impl StoreChange {
    pub fn touches_any(&self, keys: &[&str]) -> bool {
        self.keys.iter().any(|k| keys.contains(&k.as_str()))
    }
}

pub struct Store {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<StoreChange>,
}

impl Store {
    /// Open (or create) the store at `path`
    pub async fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let conn = sqlite::open(path)
            .map_err(|e| anyhow!("Failed to open database {}: {}", path, e))?;
        conn.execute("PRAGMA busy_timeout = 5000;")?;
        conn.execute(SCHEMA)?;
        info!("Store opened at {path}");

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Store {
            conn: Mutex::new(conn),
            changes,
        })
    }

    /// Open a private in-memory store
    pub async fn in_memory() -> Result<Self> {
        Self::open(":memory:").await
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Publish a change made elsewhere (e.g. by another process)
    pub fn notify_changed(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        debug!("Store change: {keys:?}");
        // No subscribers is fine
        let _ = self.changes.send(StoreChange { keys });
    }

    // ------------------------------------------------------------------
    // Raw key/value access
    // ------------------------------------------------------------------

    async fn get_values(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let conn = self.conn.lock().await;
        let mut values = HashMap::new();
        let mut statement = conn.prepare("SELECT value FROM settings WHERE key = ?")?;

        for key in keys {
            statement.reset()?;
            statement.bind((1, *key))?;
            if let State::Row = statement.next()? {
                let raw = statement.read::<String, _>("value")?;
                match serde_json::from_str(&raw) {
                    Ok(value) => {
                        values.insert(key.to_string(), value);
                    }
                    Err(e) => debug!("Ignoring unparseable value for {key}: {e}"),
                }
            }
        }
        Ok(values)
    }

    async fn set_values(&self, pairs: &[(&str, Value)]) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            conn.execute("BEGIN")?;
            let written: Result<()> = (|| {
                let mut statement =
                    conn.prepare("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")?;
                for (key, value) in pairs {
                    let encoded = serde_json::to_string(value)?;
                    statement.reset()?;
                    statement.bind((1, *key))?;
                    statement.bind((2, encoded.as_str()))?;
                    statement.next()?;
                }
                Ok(())
            })();

            if let Err(e) = written {
                conn.execute("ROLLBACK")?;
                return Err(e);
            }
            conn.execute("COMMIT")?;
        }

        self.notify_changed(pairs.iter().map(|(k, _)| k.to_string()).collect());
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            let mut statement = conn.prepare("DELETE FROM settings WHERE key = ?")?;
            statement.bind((1, key))?;
            statement.next()?;
        }
        self.notify_changed(vec![key.to_string()]);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reminder settings
    // ------------------------------------------------------------------

    pub async fn reminder_settings(&self) -> Result<ReminderSettings> {
        let values = self.get_values(&REMINDER_KEYS).await?;
        Ok(ReminderSettings::from_values(
            values.get(KEY_REMINDER_ENABLED),
            values.get(KEY_REMINDER_INTERVAL),
            values.get(KEY_REMINDER_START),
            values.get(KEY_REMINDER_END),
        ))
    }

    /// Persist reminder settings after clamping them into range
    pub async fn set_reminder_settings(&self, settings: &ReminderSettings) -> Result<ReminderSettings> {
        let clean = settings.sanitized();
        self.set_values(&[
            (KEY_REMINDER_ENABLED, Value::from(clean.enabled)),
            (KEY_REMINDER_INTERVAL, Value::from(clean.interval_minutes)),
            (KEY_REMINDER_START, Value::from(clean.window_start_hour)),
            (KEY_REMINDER_END, Value::from(clean.window_end_hour)),
        ])
        .await?;
        info!(
            "Reminder settings saved: enabled={} interval={}m window={}-{}",
            clean.enabled, clean.interval_minutes, clean.window_start_hour, clean.window_end_hour
        );
        Ok(clean)
    }

    // ------------------------------------------------------------------
    // Theme and credentials
    // ------------------------------------------------------------------

    pub async fn theme(&self) -> Result<Theme> {
        let values = self.get_values(&[KEY_THEME]).await?;
        Ok(values
            .get(KEY_THEME)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default())
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.set_values(&[(KEY_THEME, Value::from(theme.to_string()))])
            .await
    }

    pub async fn source_keys(&self) -> Result<SourceKeys> {
        let values = self.get_values(&[KEY_OWLBOT, KEY_WORDNIK]).await?;
        let key_of = |k: &str| {
            values
                .get(k)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Ok(SourceKeys {
            owlbot_key: key_of(KEY_OWLBOT),
            wordnik_key: key_of(KEY_WORDNIK),
        })
    }

    /// Store or clear (`None`) the credential for a keyed source
    pub async fn set_source_key(&self, source: KeyedSource, key: Option<&str>) -> Result<()> {
        match key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(k) => {
                self.set_values(&[(source.storage_key(), Value::from(k))])
                    .await
            }
            None => self.delete_value(source.storage_key()).await,
        }
    }

    // ------------------------------------------------------------------
    // Word list
    // ------------------------------------------------------------------

    pub async fn list_words(&self) -> Result<Vec<SavedWord>> {
        let conn = self.conn.lock().await;
        let mut statement =
            conn.prepare("SELECT id, word, meanings, saved_at FROM words ORDER BY id")?;

        let mut words = Vec::new();
        while let State::Row = statement.next()? {
            let id = statement.read::<i64, _>("id")?;
            let word = statement.read::<String, _>("word")?;
            let meanings_raw = statement.read::<String, _>("meanings")?;
            let saved_at_raw = statement.read::<String, _>("saved_at")?;

            let meanings = serde_json::from_str(&meanings_raw)
                .unwrap_or(Meanings::Text(meanings_raw));
            let saved_at = DateTime::parse_from_rfc3339(&saved_at_raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| anyhow!("Bad saved_at for word {}: {}", id, e))?;

            words.push(SavedWord {
                id,
                word,
                meanings,
                saved_at,
            });
        }
        Ok(words)
    }

    /// Append a word, returning its stable id
    pub async fn add_word(&self, word: &str, meanings: &Meanings) -> Result<i64> {
        let encoded = serde_json::to_string(meanings)?;
        let saved_at = Utc::now().to_rfc3339();

        let id = {
            let conn = self.conn.lock().await;
            let mut insert =
                conn.prepare("INSERT INTO words (word, meanings, saved_at) VALUES (?, ?, ?)")?;
            insert.bind((1, word))?;
            insert.bind((2, encoded.as_str()))?;
            insert.bind((3, saved_at.as_str()))?;
            insert.next()?;

            let mut last = conn.prepare("SELECT last_insert_rowid() AS id")?;
            match last.next()? {
                State::Row => last.read::<i64, _>("id")?,
                State::Done => return Err(anyhow!("Insert did not report a row id")),
            }
        };

        info!("Saved word '{word}' as #{id}");
        self.notify_changed(vec![KEY_WORD_LIST.to_string()]);
        Ok(id)
    }

    /// Remove a word by id; returns false if no such word existed
    pub async fn remove_word(&self, id: i64) -> Result<bool> {
        let removed = {
            let conn = self.conn.lock().await;
            let mut statement = conn.prepare("DELETE FROM words WHERE id = ?")?;
            statement.bind((1, id))?;
            statement.next()?;
            last_change_count(&conn)? > 0
        };

        if removed {
            self.notify_changed(vec![KEY_WORD_LIST.to_string()]);
        }
        Ok(removed)
    }

    /// Remove every saved word, returning how many were deleted
    pub async fn clear_words(&self) -> Result<usize> {
        let count = {
            let conn = self.conn.lock().await;
            conn.execute("DELETE FROM words")?;
            last_change_count(&conn)? as usize
        };
        self.notify_changed(vec![KEY_WORD_LIST.to_string()]);
        Ok(count)
    }
}

/// Rows modified by the most recent INSERT/UPDATE/DELETE on this connection
fn last_change_count(conn: &Connection) -> Result<i64> {
    let mut statement = conn.prepare("SELECT changes() AS n")?;
    match statement.next()? {
        State::Row => Ok(statement.read::<i64, _>("n")?),
        State::Done => Ok(0),
    }
}
