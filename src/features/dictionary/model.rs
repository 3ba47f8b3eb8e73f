//! Normalized definition types shared by every dictionary source

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// A single definition with optional usage example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionEntry {
    pub definition: String,
    #[serde(default)]
    pub example: Option<String>,
}

impl DefinitionEntry {
    pub fn new(definition: impl Into<String>, example: Option<String>) -> Self {
        DefinitionEntry {
            definition: definition.into(),
            example: example.filter(|e| !e.trim().is_empty()),
        }
    }
}

/// Definitions grouped by part-of-speech label.
///
/// Every label present maps to at least one entry. Labels keep the order in
/// which they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroupedDefinitions(IndexMap<String, Vec<DefinitionEntry>>);

impl<'de> Deserialize<'de> for GroupedDefinitions {
    /// Rebuilds through `push`, so empty groups and blank definitions in
    /// stored JSON are dropped
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Vec<DefinitionEntry>>::deserialize(deserializer)?;
        let mut grouped = GroupedDefinitions::new();
        for (part_of_speech, entries) in raw {
            for entry in entries {
                grouped.push(&part_of_speech, entry);
            }
        }
        Ok(grouped)
    }
}

impl GroupedDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition under `part_of_speech`, concatenating with any
    /// entries already present. Blank definitions are ignored.
    pub fn push(&mut self, part_of_speech: &str, entry: DefinitionEntry) {
        if entry.definition.trim().is_empty() {
            return;
        }
        self.0
            .entry(part_of_speech.trim().to_string())
            .or_default()
            .push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of part-of-speech groups
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, part_of_speech: &str) -> Option<&[DefinitionEntry]> {
        self.0.get(part_of_speech).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DefinitionEntry])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// First non-blank definition of the first part of speech that has one
    pub fn first_definition(&self) -> Option<&str> {
        self.0
            .values()
            .flat_map(|entries| entries.iter())
            .map(|entry| entry.definition.trim())
            .find(|text| !text.is_empty())
    }

    /// Total number of definitions across all groups
    pub fn definition_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_concatenates_same_label() {
        let mut grouped = GroupedDefinitions::new();
        grouped.push("verb", DefinitionEntry::new("to move quickly", None));
        grouped.push("noun", DefinitionEntry::new("an act of running", None));
        grouped.push("verb", DefinitionEntry::new("to operate", Some("run the engine".into())));

        assert_eq!(grouped.len(), 2);
        let verbs = grouped.get("verb").unwrap();
        assert_eq!(verbs.len(), 2);
        assert_eq!(verbs[0].definition, "to move quickly");
        assert_eq!(verbs[1].example.as_deref(), Some("run the engine"));
    }

    #[test]
    fn test_blank_definition_never_creates_label() {
        let mut grouped = GroupedDefinitions::new();
        grouped.push("adverb", DefinitionEntry::new("   ", None));
        assert!(grouped.is_empty());
        assert!(grouped.get("adverb").is_none());
    }

    #[test]
    fn test_blank_example_dropped() {
        let entry = DefinitionEntry::new("a thing", Some(" ".into()));
        assert!(entry.example.is_none());
    }

    #[test]
    fn test_first_definition_follows_label_order() {
        let mut grouped = GroupedDefinitions::new();
        grouped.push("noun", DefinitionEntry::new("a light", None));
        grouped.push("verb", DefinitionEntry::new("to ignite", None));
        assert_eq!(grouped.first_definition(), Some("a light"));
        assert_eq!(grouped.definition_count(), 2);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut grouped = GroupedDefinitions::new();
        grouped.push("noun", DefinitionEntry::new("a light", None));
        let json = serde_json::to_value(&grouped).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"noun": [{"definition": "a light", "example": null}]})
        );

        let back: GroupedDefinitions = serde_json::from_value(json).unwrap();
        assert_eq!(back, grouped);
    }

    #[test]
    fn test_deserialize_drops_empty_groups() {
        let grouped: GroupedDefinitions = serde_json::from_str(
            r#"{"noun": [], "adjective": [{"definition": "  "}], "verb": [{"definition": "to glow"}]}"#,
        )
        .unwrap();

        assert_eq!(grouped.len(), 1);
        assert!(grouped.get("noun").is_none());
        assert!(grouped.get("adjective").is_none());
        assert_eq!(grouped.first_definition(), Some("to glow"));
    }
}
