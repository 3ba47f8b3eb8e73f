//! # Dictionary Feature
//!
//! Word lookup against OwlBot, Wordnik and dictionaryapi.dev with ordered
//! fallback and per-part-of-speech normalization.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod model;
pub mod resolver;
pub mod sources;

pub use model::{DefinitionEntry, GroupedDefinitions};
pub use resolver::{accept_outcome, DefinitionResolver};
pub use sources::{encode_word, DictionarySource, SourceFailure, SourceResult};
