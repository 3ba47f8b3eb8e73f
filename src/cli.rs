//! # Command Line Surface
//!
//! Lookup, saved-word management and settings for the `wordminder` binary.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Daemon notified over IPC after every store write
//! - 1.0.0: Lookup, list and reminder settings

use anyhow::{anyhow, Result};
use log::{debug, warn};
use serde_json::Value;
use std::fmt::Write as _;

use crate::features::dictionary::{DefinitionResolver, GroupedDefinitions};
use crate::features::reminders::ReminderSettings;
use crate::ipc::{DaemonEvent, IpcClient};
use crate::store::{KeyedSource, Meanings, SavedWord, Store, Theme, KEY_THEME, KEY_WORD_LIST, REMINDER_KEYS};

pub const MSG_EMPTY_WORD: &str = "Please enter a word to look up.";
pub const MSG_NOT_FOUND: &str = "No definitions found.";
pub const MSG_LOOKUP_ERROR: &str = "Error looking up word.";
pub const MSG_SAVED: &str = "Saved!";
pub const MSG_NO_WORDS: &str = "No words saved.";
pub const MSG_SETTINGS_SAVED: &str = "Settings saved.";

pub const USAGE: &str = "\
Usage: wordminder <command>

Commands:
  lookup <word> [--save]        Look up a word, optionally saving it
  list                          Show saved words
  remove <id>                   Remove a saved word
  clear                         Remove every saved word
  settings [show]               Show reminder settings
  settings set [--enabled true|false] [--interval N] [--start H] [--end H]
  theme [dark|light]            Show or set the theme
  keys set <owlbot|wordnik> <key>
  keys clear <owlbot|wordnik>
  test-reminder                 Ask the daemon to show a reminder now
  status                        Show daemon status
  watch                         Print reminders as the daemon shows them";

/// Partial update applied over the stored reminder settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub enabled: Option<bool>,
    pub interval: Option<i64>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl SettingsUpdate {
    /// Merge into `current`, clamping out-of-range values
    pub fn apply(&self, current: ReminderSettings) -> ReminderSettings {
        let enabled = Value::from(self.enabled.unwrap_or(current.enabled));
        let interval = Value::from(self.interval.unwrap_or(current.interval_minutes));
        let start = Value::from(self.start.unwrap_or(current.window_start_hour as i64));
        let end = Value::from(self.end.unwrap_or(current.window_end_hour as i64));
        ReminderSettings::from_values(Some(&enabled), Some(&interval), Some(&start), Some(&end))
            .sanitized()
    }

    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Lookup { word: String, save: bool },
    List,
    Remove { id: i64 },
    Clear,
    ShowSettings,
    SetSettings(SettingsUpdate),
    Theme(Option<Theme>),
    SetKey { source: KeyedSource, key: String },
    ClearKey { source: KeyedSource },
    TestReminder,
    Status,
    Watch,
    Help,
}

impl Command {
    /// Parse arguments, excluding the program name
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut args = args.iter().map(String::as_str);
        let Some(name) = args.next() else {
            return Ok(Command::Help);
        };
        let rest: Vec<&str> = args.collect();

        match name {
            "lookup" => {
                let save = rest.contains(&"--save");
                let word = rest
                    .iter()
                    .filter(|a| **a != "--save")
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(Command::Lookup { word, save })
            }
            "list" => Ok(Command::List),
            "remove" => {
                let id = rest
                    .first()
                    .ok_or_else(|| anyhow!("remove needs a word id (see `wordminder list`)"))?;
                let id = id.parse().map_err(|_| anyhow!("Invalid word id: {id}"))?;
                Ok(Command::Remove { id })
            }
            "clear" => Ok(Command::Clear),
            "settings" => match rest.first() {
                None | Some(&"show") => Ok(Command::ShowSettings),
                Some(&"set") => parse_settings_update(&rest[1..]).map(Command::SetSettings),
                Some(other) => Err(anyhow!("Unknown settings subcommand: {other}")),
            },
            "theme" => match rest.first() {
                None => Ok(Command::Theme(None)),
                Some(theme) => Ok(Command::Theme(Some(theme.parse()?))),
            },
            "keys" => match rest.as_slice() {
                ["set", source, key] => Ok(Command::SetKey {
                    source: source.parse()?,
                    key: key.to_string(),
                }),
                ["clear", source] => Ok(Command::ClearKey {
                    source: source.parse()?,
                }),
                _ => Err(anyhow!("Usage: keys set <owlbot|wordnik> <key> | keys clear <owlbot|wordnik>")),
            },
            "test-reminder" => Ok(Command::TestReminder),
            "status" => Ok(Command::Status),
            "watch" => Ok(Command::Watch),
            "help" | "--help" | "-h" => Ok(Command::Help),
            other => Err(anyhow!("Unknown command: {other}\n\n{USAGE}")),
        }
    }
}

fn parse_settings_update(args: &[&str]) -> Result<SettingsUpdate> {
    let mut update = SettingsUpdate::default();
    let mut iter = args.iter();

    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| anyhow!("{flag} needs a value"))?;
        match *flag {
            "--enabled" => {
                update.enabled = Some(match value.to_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    _ => return Err(anyhow!("Invalid value for --enabled: {value}")),
                })
            }
            "--interval" => update.interval = Some(parse_number(flag, value)?),
            "--start" => update.start = Some(parse_number(flag, value)?),
            "--end" => update.end = Some(parse_number(flag, value)?),
            other => return Err(anyhow!("Unknown settings flag: {other}")),
        }
    }

    if update.is_empty() {
        return Err(anyhow!("settings set needs at least one of --enabled, --interval, --start, --end"));
    }
    Ok(update)
}

fn parse_number(flag: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow!("Invalid number for {flag}: {value}"))
}

// ============================================================================
// Lookup
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    EmptyInput,
    NotFound,
    /// The lookup task itself failed
    Failed,
    Found(GroupedDefinitions),
}

impl LookupOutcome {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            LookupOutcome::EmptyInput => Some(MSG_EMPTY_WORD),
            LookupOutcome::NotFound => Some(MSG_NOT_FOUND),
            LookupOutcome::Failed => Some(MSG_LOOKUP_ERROR),
            LookupOutcome::Found(_) => None,
        }
    }
}

/// Trim the input and resolve it on a separate task
pub async fn lookup(resolver: &DefinitionResolver, input: &str) -> LookupOutcome {
    let word = input.trim().to_string();
    if word.is_empty() {
        return LookupOutcome::EmptyInput;
    }

    let resolver = resolver.clone();
    match tokio::spawn(async move { resolver.resolve(&word).await }).await {
        Ok(Some(definitions)) => LookupOutcome::Found(definitions),
        Ok(None) => LookupOutcome::NotFound,
        Err(e) => {
            warn!("Lookup task failed: {e}");
            LookupOutcome::Failed
        }
    }
}

/// Definitions grouped under their part of speech
pub fn render_definitions(definitions: &GroupedDefinitions) -> String {
    let mut out = String::new();
    for (part_of_speech, entries) in definitions.iter() {
        let heading = if part_of_speech.is_empty() {
            "Definition"
        } else {
            part_of_speech
        };
        let _ = writeln!(out, "{heading}");
        for entry in entries {
            let _ = writeln!(out, "  • {}", entry.definition);
            if let Some(example) = &entry.example {
                let _ = writeln!(out, "    Example: {example}");
            }
        }
    }
    out
}

/// Saved words as `#id  word  summary` rows
pub fn render_word_list(words: &[SavedWord]) -> String {
    if words.is_empty() {
        return MSG_NO_WORDS.to_string();
    }

    let mut out = String::new();
    for word in words {
        let summary = match &word.meanings {
            Meanings::Text(text) => text.trim().to_string(),
            Meanings::Grouped(grouped) => format!("{} definition(s)", grouped.definition_count()),
        };
        let _ = writeln!(
            out,
            "#{:<4} {:<20} {}  ({})",
            word.id,
            word.word,
            summary,
            word.saved_at.format("%Y-%m-%d")
        );
    }
    out.trim_end().to_string()
}

pub fn render_settings(settings: &ReminderSettings) -> String {
    format!(
        "Reminders: {}\nInterval: {} min\nWindow: {:02}:00 - {:02}:00",
        if settings.enabled { "on" } else { "off" },
        settings.interval_minutes,
        settings.window_start_hour,
        settings.window_end_hour
    )
}

pub fn render_status(event: &DaemonEvent) -> String {
    match event {
        DaemonEvent::Status {
            uptime_seconds,
            reminders_armed,
            interval_minutes,
            saved_words,
            clients,
            ..
        } => {
            let timer = match (reminders_armed, interval_minutes) {
                (true, Some(minutes)) => format!("armed, every {minutes} min"),
                _ => "not armed".to_string(),
            };
            format!(
                "Daemon up {}s\nReminder timer: {}\nSaved words: {}\nConnected clients: {}",
                uptime_seconds, timer, saved_words, clients
            )
        }
        other => format!("{other:?}"),
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Runs commands against the store and, when reachable, the daemon
pub struct App {
    pub store: Store,
    pub resolver_client: reqwest::Client,
    pub endpoints: crate::core::DictionaryEndpoints,
    pub socket_path: String,
}

impl App {
    pub async fn run(&self, command: Command) -> Result<String> {
        match command {
            Command::Help => Ok(USAGE.to_string()),
            Command::Lookup { word, save } => self.lookup(&word, save).await,
            Command::List => Ok(render_word_list(&self.store.list_words().await?)),
            Command::Remove { id } => {
                if self.store.remove_word(id).await? {
                    self.notify_daemon(&[KEY_WORD_LIST]).await;
                    Ok(format!("Removed #{id}"))
                } else {
                    Err(anyhow!("No saved word with id {id}"))
                }
            }
            Command::Clear => {
                let removed = self.store.clear_words().await?;
                self.notify_daemon(&[KEY_WORD_LIST]).await;
                Ok(format!("Cleared {removed} saved word(s)"))
            }
            Command::ShowSettings => Ok(render_settings(&self.store.reminder_settings().await?)),
            Command::SetSettings(update) => {
                let current = self.store.reminder_settings().await?;
                let saved = self.store.set_reminder_settings(&update.apply(current)).await?;
                self.notify_daemon(&REMINDER_KEYS).await;
                Ok(format!("{MSG_SETTINGS_SAVED}\n{}", render_settings(&saved)))
            }
            Command::Theme(None) => Ok(self.store.theme().await?.to_string()),
            Command::Theme(Some(theme)) => {
                self.store.set_theme(theme).await?;
                self.notify_daemon(&[KEY_THEME]).await;
                Ok(format!("Theme set to {theme}"))
            }
            Command::SetKey { source, key } => {
                self.store.set_source_key(source, Some(key.as_str())).await?;
                Ok(format!("{source:?} key saved"))
            }
            Command::ClearKey { source } => {
                self.store.set_source_key(source, None).await?;
                Ok(format!("{source:?} key cleared"))
            }
            Command::TestReminder => {
                let mut client = self.connect().await?;
                client.trigger_reminder().await?;
                Ok("Test reminder sent.".to_string())
            }
            Command::Status => {
                let mut client = self.connect().await?;
                Ok(render_status(&client.status().await?))
            }
            Command::Watch => Err(anyhow!("watch streams events; use App::watch")),
        }
    }

    async fn lookup(&self, word: &str, save: bool) -> Result<String> {
        let keys = self.store.source_keys().await?;
        let resolver = DefinitionResolver::from_keys(self.resolver_client.clone(), &self.endpoints, &keys);
        debug!("Resolving with sources {:?}", resolver.source_names());

        let outcome = lookup(&resolver, word).await;
        let LookupOutcome::Found(definitions) = outcome else {
            return Ok(outcome.message().unwrap_or(MSG_NOT_FOUND).to_string());
        };

        let mut out = render_definitions(&definitions);
        if save {
            let id = self
                .store
                .add_word(word.trim(), &Meanings::Grouped(definitions))
                .await?;
            self.notify_daemon(&[KEY_WORD_LIST]).await;
            let _ = write!(out, "{MSG_SAVED} (#{id})");
        }
        Ok(out.trim_end().to_string())
    }

    async fn connect(&self) -> Result<IpcClient> {
        IpcClient::connect(&self.socket_path)
            .await
            .map_err(|e| anyhow!("Daemon not reachable at {}: {}", self.socket_path, e))
    }

    /// Best effort; the daemon rereads the store on its next tick anyway
    async fn notify_daemon(&self, keys: &[&str]) {
        match IpcClient::connect(&self.socket_path).await {
            Ok(mut client) => {
                if let Err(e) = client
                    .settings_changed(keys.iter().map(|k| k.to_string()).collect())
                    .await
                {
                    warn!("Daemon did not acknowledge change: {e}");
                }
            }
            Err(e) => debug!("Daemon not notified: {e}"),
        }
    }

    /// Print reminders until the daemon disconnects
    pub async fn watch(&self) -> Result<()> {
        let mut client = self.connect().await?;
        println!("Watching for reminders (Ctrl+C to stop)...");
        while let Some(event) = client.recv().await {
            match event {
                DaemonEvent::Reminder { title, body, timestamp } => {
                    println!("[{}] {}\n  {}", timestamp.format("%H:%M"), title, body);
                }
                DaemonEvent::Heartbeat { timestamp } => debug!("Heartbeat {timestamp}"),
                other => debug!("Ignoring event {other:?}"),
            }
        }
        Err(anyhow!("Daemon disconnected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::dictionary::{DefinitionEntry, DictionarySource, SourceFailure, SourceResult};
    use async_trait::async_trait;
    use std::sync::Arc;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_lookup_with_save() {
        assert_eq!(
            Command::parse(&args(&["lookup", "serendipity", "--save"])).unwrap(),
            Command::Lookup {
                word: "serendipity".into(),
                save: true
            }
        );
        assert_eq!(
            Command::parse(&args(&["lookup", "ice", "cream"])).unwrap(),
            Command::Lookup {
                word: "ice cream".into(),
                save: false
            }
        );
    }

    #[test]
    fn test_parse_settings_set() {
        let cmd = Command::parse(&args(&["settings", "set", "--interval", "15", "--enabled", "off"])).unwrap();
        assert_eq!(
            cmd,
            Command::SetSettings(SettingsUpdate {
                enabled: Some(false),
                interval: Some(15),
                ..Default::default()
            })
        );
        assert!(Command::parse(&args(&["settings", "set"])).is_err());
        assert!(Command::parse(&args(&["settings", "set", "--interval", "soon"])).is_err());
    }

    #[test]
    fn test_parse_keys_and_errors() {
        assert_eq!(
            Command::parse(&args(&["keys", "clear", "wordnik"])).unwrap(),
            Command::ClearKey {
                source: KeyedSource::Wordnik
            }
        );
        assert!(Command::parse(&args(&["keys", "set", "bing", "k"])).is_err());
        assert!(Command::parse(&args(&["remove", "two"])).is_err());
        assert!(Command::parse(&args(&["frobnicate"])).is_err());
        assert_eq!(Command::parse(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn test_settings_update_clamps_like_save() {
        let update = SettingsUpdate {
            interval: Some(0),
            start: Some(-3),
            end: Some(0),
            ..Default::default()
        };
        let applied = update.apply(ReminderSettings {
            enabled: false,
            interval_minutes: 45,
            window_start_hour: 8,
            window_end_hour: 20,
        });
        assert!(!applied.enabled);
        assert_eq!(applied.interval_minutes, 1);
        assert_eq!(applied.window_start_hour, 0);
        assert_eq!(applied.window_end_hour, 24);
    }

    #[test]
    fn test_render_definitions_grouped() {
        let mut defs = GroupedDefinitions::new();
        defs.push("noun", DefinitionEntry::new("a fast pace", Some("a morning run".into())));
        defs.push("verb", DefinitionEntry::new("to move quickly", None));

        let text = render_definitions(&defs);
        assert_eq!(
            text,
            "noun\n  • a fast pace\n    Example: a morning run\nverb\n  • to move quickly\n"
        );
    }

    #[test]
    fn test_empty_list_message() {
        assert_eq!(render_word_list(&[]), MSG_NO_WORDS);
    }

    struct Fixed(SourceResult);

    #[async_trait]
    impl DictionarySource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn lookup(&self, _encoded_word: &str) -> SourceResult {
            self.0.clone()
        }
    }

    struct Panicking;

    #[async_trait]
    impl DictionarySource for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn lookup(&self, _encoded_word: &str) -> SourceResult {
            panic!("source blew up")
        }
    }

    #[tokio::test]
    async fn test_lookup_messages_are_distinct() {
        let none = DefinitionResolver::with_sources(vec![Arc::new(Fixed(Err(SourceFailure::NoData)))]);
        let broken = DefinitionResolver::with_sources(vec![Arc::new(Panicking)]);

        assert_eq!(lookup(&none, "   ").await, LookupOutcome::EmptyInput);
        assert_eq!(lookup(&none, "word").await, LookupOutcome::NotFound);
        assert_eq!(lookup(&broken, "word").await, LookupOutcome::Failed);

        assert_eq!(LookupOutcome::EmptyInput.message(), Some(MSG_EMPTY_WORD));
        assert_eq!(LookupOutcome::NotFound.message(), Some(MSG_NOT_FOUND));
        assert_eq!(LookupOutcome::Failed.message(), Some(MSG_LOOKUP_ERROR));
    }

    #[tokio::test]
    async fn test_lookup_trims_before_resolving() {
        let mut defs = GroupedDefinitions::new();
        defs.push("noun", DefinitionEntry::new("a thing", None));
        let resolver = DefinitionResolver::with_sources(vec![Arc::new(Fixed(Ok(defs.clone())))]);

        assert_eq!(lookup(&resolver, "  thing \n").await, LookupOutcome::Found(defs));
    }

    #[tokio::test]
    async fn test_app_settings_without_daemon() {
        let dir = tempfile::tempdir().unwrap();
        let app = App {
            store: Store::in_memory().await.unwrap(),
            resolver_client: reqwest::Client::new(),
            endpoints: Default::default(),
            socket_path: dir.path().join("none.sock").to_string_lossy().into_owned(),
        };

        let out = app
            .run(Command::SetSettings(SettingsUpdate {
                start: Some(9),
                end: Some(17),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert!(out.starts_with(MSG_SETTINGS_SAVED));
        assert!(out.contains("09:00 - 17:00"));

        assert!(app.run(Command::TestReminder).await.is_err());
        assert!(app.run(Command::Remove { id: 42 }).await.is_err());
    }
}
