//! # Definition Resolver
//!
//! Tries dictionary sources in priority order and stops at the first one
//! that yields definitions.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Source attempts return tagged results selected by `accept_outcome`
//! - 1.0.0: Initial OwlBot -> Wordnik -> dictionaryapi.dev fallback chain

use log::{debug, info, warn};
use std::sync::Arc;

use super::model::GroupedDefinitions;
use super::sources::{
    encode_word, DictionarySource, FreeDictionarySource, OwlBotSource, SourceResult,
    WordnikSource,
};
use crate::core::DictionaryEndpoints;
use crate::store::SourceKeys;

/// Turn one attempt's outcome into a usable result, if any
pub fn accept_outcome(outcome: SourceResult) -> Option<GroupedDefinitions> {
    outcome.ok().filter(|grouped| !grouped.is_empty())
}

#[derive(Clone)]
pub struct DefinitionResolver {
    sources: Vec<Arc<dyn DictionarySource>>,
}

impl DefinitionResolver {
    /// Build a resolver over an explicit, ordered source list
    pub fn with_sources(sources: Vec<Arc<dyn DictionarySource>>) -> Self {
        Self { sources }
    }

    /// Build the standard chain: OwlBot and Wordnik when their keys are
    /// present, always followed by the free dictionary.
    pub fn from_keys(client: reqwest::Client, endpoints: &DictionaryEndpoints, keys: &SourceKeys) -> Self {
        let mut sources: Vec<Arc<dyn DictionarySource>> = Vec::new();

        if let Some(token) = keys.owlbot_key.as_deref() {
            sources.push(Arc::new(OwlBotSource::new(
                client.clone(),
                endpoints.owlbot.clone(),
                token,
            )));
        }
        if let Some(api_key) = keys.wordnik_key.as_deref() {
            sources.push(Arc::new(WordnikSource::new(
                client.clone(),
                endpoints.wordnik.clone(),
                api_key,
            )));
        }
        sources.push(Arc::new(FreeDictionarySource::new(client, endpoints.free.clone())));

        Self { sources }
    }

    /// Names of the configured sources, in attempt order
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve a word to grouped definitions.
    ///
    /// Sources are attempted one after another; `None` means every source
    /// failed or had no data. Empty input is not rejected here.
    pub async fn resolve(&self, word: &str) -> Option<GroupedDefinitions> {
        let encoded = encode_word(word);

        for source in &self.sources {
            let outcome = source.lookup(&encoded).await;
            if let Err(ref failure) = outcome {
                warn!("{} lookup for '{}' failed: {}", source.name(), word, failure);
            }
            if let Some(grouped) = accept_outcome(outcome) {
                info!(
                    "Resolved '{}' via {} ({} definitions)",
                    word,
                    source.name(),
                    grouped.definition_count()
                );
                return Some(grouped);
            }
        }

        debug!("No source had definitions for '{word}'");
        None
    }
}
