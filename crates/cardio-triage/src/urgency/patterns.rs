//! Versioned emergency vocabulary used by the local gate.
//!
//! The default list ships inside the binary; `EMERGENCY_PATTERNS_PATH` swaps in
//! a file without a rebuild. A list that fails to load or compile is fatal at
//! startup, never silently shortened.

use std::path::Path;

use anyhow::{Context, Result};
use regex::{RegexBuilder, RegexSet, RegexSetBuilder};
use serde::Deserialize;
use tracing::info;

const EMBEDDED_PATTERNS: &str = include_str!("../../resources/emergency_patterns.json");

#[derive(Debug, Clone, Deserialize)]
pub struct PatternEntry {
    pub category: String,
    #[serde(default)]
    pub source: String,
    pub pattern: String,
}

#[derive(Debug, Deserialize)]
struct PatternFile {
    version: String,
    patterns: Vec<PatternEntry>,
}

#[derive(Debug, Clone)]
pub struct EmergencyPatternSet {
    version: String,
    entries: Vec<PatternEntry>,
    set: RegexSet,
}

impl EmergencyPatternSet {
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_PATTERNS, "embedded pattern list")
    }

    /// The override file when given, else the embedded list.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read emergency patterns from {}", path.display()))?;
                Self::from_json(&raw, &path.display().to_string())
            }
            None => Self::embedded(),
        }
    }

    pub fn from_json(raw: &str, origin: &str) -> Result<Self> {
        let file: PatternFile = serde_json::from_str(raw)
            .with_context(|| format!("Malformed emergency pattern list ({})", origin))?;
        if file.patterns.is_empty() {
            anyhow::bail!("Emergency pattern list ({}) is empty", origin);
        }

        for entry in &file.patterns {
            RegexBuilder::new(&entry.pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| {
                    format!("Invalid emergency pattern in '{}' ({}): {}", entry.category, origin, entry.pattern)
                })?;
        }
        let set = RegexSetBuilder::new(file.patterns.iter().map(|e| e.pattern.as_str()))
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Failed to compile emergency patterns ({})", origin))?;

        info!(
            "Loaded {} emergency patterns, version {} ({})",
            file.patterns.len(),
            file.version,
            origin
        );
        Ok(Self { version: file.version, entries: file.patterns, set })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_match(&self, message: &str) -> bool {
        self.set.is_match(message)
    }

    /// Categories of every pattern that fires, in list order.
    pub fn matching_categories(&self, message: &str) -> Vec<&str> {
        self.set
            .matches(message)
            .into_iter()
            .map(|i| self.entries[i].category.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_list_loads() {
        let set = EmergencyPatternSet::embedded().unwrap();
        assert_eq!(set.len(), 12);
        assert_eq!(set.version(), "2025.1");
    }

    #[test]
    fn matching_ignores_case() {
        let set = EmergencyPatternSet::embedded().unwrap();
        assert!(set.is_match("SUDDEN WEAKNESS in my left arm"));
        assert_eq!(set.matching_categories("Face drooping"), vec!["stroke and neurological overlap"]);
    }

    #[test]
    fn override_file_replaces_embedded_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(
            &path,
            r#"{"version": "test", "patterns": [{"category": "c", "pattern": "tingling"}]}"#,
        )
        .unwrap();

        let set = EmergencyPatternSet::load(Some(&path)).unwrap();
        assert!(set.is_match("Tingling fingers"));
        assert!(!set.is_match("chest pain"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let raw = r#"{"version": "bad", "patterns": [{"category": "c", "pattern": "chest (pain"}]}"#;
        let err = EmergencyPatternSet::from_json(raw, "test").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid emergency pattern"));
    }

    #[test]
    fn missing_override_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EmergencyPatternSet::load(Some(&dir.path().join("absent.json"))).is_err());
    }
}
