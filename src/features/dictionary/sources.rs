//! # Dictionary Sources
//!
//! HTTP clients for each dictionary provider plus the pure payload
//! normalizers that map their native shapes into [`GroupedDefinitions`].
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.2.0: Wordnik markup stripping, every free-dictionary entry contributes
//! - 1.1.0: Added OwlBot and Wordnik keyed sources
//! - 1.0.0: Initial dictionaryapi.dev source

use async_trait::async_trait;
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;

use super::model::{DefinitionEntry, GroupedDefinitions};

/// Characters left unescaped, matching `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Label used when a source omits the part of speech
pub const UNLABELED_PART_OF_SPEECH: &str = "definition";

static MARKUP_TAG: OnceLock<Option<Regex>> = OnceLock::new();

/// Percent-encode a word for use as a URL path segment
pub fn encode_word(word: &str) -> String {
    utf8_percent_encode(word, URI_COMPONENT).to_string()
}

/// Why a single source attempt produced nothing usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    /// Request could not be sent or the body could not be read
    Transport(String),
    /// Server answered with a non-success HTTP status
    Status(u16),
    /// Body did not match the source's payload shape
    Malformed(String),
    /// Payload was well-formed but held no definitions
    NoData,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFailure::Transport(e) => write!(f, "transport error: {e}"),
            SourceFailure::Status(code) => write!(f, "HTTP status {code}"),
            SourceFailure::Malformed(e) => write!(f, "malformed payload: {e}"),
            SourceFailure::NoData => write!(f, "no definitions in payload"),
        }
    }
}

pub type SourceResult = Result<GroupedDefinitions, SourceFailure>;

/// One external dictionary provider
#[async_trait]
pub trait DictionarySource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Look up an already percent-encoded word
    async fn lookup(&self, encoded_word: &str) -> SourceResult;
}

/// Send a request and return the body of a successful response
async fn fetch_body(request: reqwest::RequestBuilder) -> Result<Vec<u8>, SourceFailure> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceFailure::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceFailure::Status(status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| SourceFailure::Transport(e.to_string()))?;
    Ok(body.to_vec())
}

fn non_empty(grouped: GroupedDefinitions) -> SourceResult {
    if grouped.is_empty() {
        Err(SourceFailure::NoData)
    } else {
        Ok(grouped)
    }
}

fn label_or_default(part_of_speech: Option<String>) -> String {
    part_of_speech
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| UNLABELED_PART_OF_SPEECH.to_string())
}

// ============================================================================
// OwlBot (primary, keyed)
// ============================================================================

#[derive(Debug, Deserialize)]
struct OwlBotResponse {
    #[serde(default)]
    definitions: Option<Vec<OwlBotDefinition>>,
}

#[derive(Debug, Deserialize)]
struct OwlBotDefinition {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    definition: Option<String>,
    #[serde(default)]
    example: Option<String>,
}

/// Normalize an OwlBot `/dictionary/<word>` payload
pub fn parse_owlbot(body: &[u8]) -> SourceResult {
    let response: OwlBotResponse =
        serde_json::from_slice(body).map_err(|e| SourceFailure::Malformed(e.to_string()))?;

    let mut grouped = GroupedDefinitions::new();
    for def in response.definitions.unwrap_or_default() {
        let Some(text) = def.definition else { continue };
        grouped.push(&label_or_default(def.kind), DefinitionEntry::new(text, def.example));
    }
    non_empty(grouped)
}

pub struct OwlBotSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl OwlBotSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl DictionarySource for OwlBotSource {
    fn name(&self) -> &'static str {
        "owlbot"
    }

    async fn lookup(&self, encoded_word: &str) -> SourceResult {
        let url = format!("{}/{}", self.base_url, encoded_word);
        debug!("OwlBot lookup: {url}");
        let request = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.token));
        parse_owlbot(&fetch_body(request).await?)
    }
}

// ============================================================================
// Wordnik (secondary, keyed)
// ============================================================================

#[derive(Debug, Deserialize)]
struct WordnikDefinition {
    #[serde(rename = "partOfSpeech", default)]
    part_of_speech: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "exampleUses", default)]
    example_uses: Option<Vec<WordnikExample>>,
}

#[derive(Debug, Deserialize)]
struct WordnikExample {
    #[serde(default)]
    text: Option<String>,
}

/// Remove inline markup such as `<xref>` from Wordnik definition text
pub fn strip_markup(text: &str) -> String {
    let stripped = match MARKUP_TAG.get_or_init(|| Regex::new(r"<[^>]*>").ok()) {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    stripped.trim().to_string()
}

/// Normalize a Wordnik `/word.json/<word>/definitions` payload
pub fn parse_wordnik(body: &[u8]) -> SourceResult {
    let definitions: Vec<WordnikDefinition> =
        serde_json::from_slice(body).map_err(|e| SourceFailure::Malformed(e.to_string()))?;

    let mut grouped = GroupedDefinitions::new();
    for def in definitions {
        let Some(text) = def.text.map(|t| strip_markup(&t)) else {
            continue;
        };
        let example = def
            .example_uses
            .unwrap_or_default()
            .into_iter()
            .find_map(|e| e.text)
            .map(|t| strip_markup(&t));
        grouped.push(
            &label_or_default(def.part_of_speech),
            DefinitionEntry::new(text, example),
        );
    }
    non_empty(grouped)
}

pub struct WordnikSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WordnikSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl DictionarySource for WordnikSource {
    fn name(&self) -> &'static str {
        "wordnik"
    }

    async fn lookup(&self, encoded_word: &str) -> SourceResult {
        let url = format!("{}/{}/definitions", self.base_url, encoded_word);
        debug!("Wordnik lookup: {url}");
        let request = self.client.get(&url).query(&[
            ("limit", "5"),
            ("includeRelated", "false"),
            ("useCanonical", "true"),
            ("includeTags", "false"),
            ("api_key", self.api_key.as_str()),
        ]);
        parse_wordnik(&fetch_body(request).await?)
    }
}

// ============================================================================
// dictionaryapi.dev (free, no key)
// ============================================================================

#[derive(Debug, Deserialize)]
struct FreeEntry {
    #[serde(default)]
    meanings: Option<Vec<FreeMeaning>>,
}

#[derive(Debug, Deserialize)]
struct FreeMeaning {
    #[serde(rename = "partOfSpeech", default)]
    part_of_speech: Option<String>,
    #[serde(default)]
    definitions: Option<Vec<FreeDefinition>>,
}

#[derive(Debug, Deserialize)]
struct FreeDefinition {
    #[serde(default)]
    definition: Option<String>,
    #[serde(default)]
    example: Option<String>,
}

/// Normalize a dictionaryapi.dev `/entries/en/<word>` payload.
///
/// Meanings sharing a part of speech are concatenated in source order.
pub fn parse_free_dictionary(body: &[u8]) -> SourceResult {
    let entries: Vec<FreeEntry> =
        serde_json::from_slice(body).map_err(|e| SourceFailure::Malformed(e.to_string()))?;

    let mut grouped = GroupedDefinitions::new();
    for meaning in entries
        .into_iter()
        .flat_map(|entry| entry.meanings.unwrap_or_default())
    {
        let label = label_or_default(meaning.part_of_speech);
        for def in meaning.definitions.unwrap_or_default() {
            let Some(text) = def.definition else { continue };
            grouped.push(&label, DefinitionEntry::new(text, def.example));
        }
    }
    non_empty(grouped)
}

pub struct FreeDictionarySource {
    client: reqwest::Client,
    base_url: String,
}

impl FreeDictionarySource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DictionarySource for FreeDictionarySource {
    fn name(&self) -> &'static str {
        "dictionaryapi.dev"
    }

    async fn lookup(&self, encoded_word: &str) -> SourceResult {
        let url = format!("{}/{}", self.base_url, encoded_word);
        debug!("dictionaryapi.dev lookup: {url}");
        parse_free_dictionary(&fetch_body(self.client.get(&url)).await?)
    }
}
