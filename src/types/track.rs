//! Track type representing one separated stem.
//!
//! Tracks are discovered from the job's output directory after separation
//! and carry a display label from a fixed [`DisplayNames`] table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stem keys the bundled spleeter models produce, with their labels.
pub const STANDARD_STEMS: &[(&str, &str)] = &[
    ("accompaniment", "accompaniment"),
    ("bass", "bass"),
    ("drums", "drums"),
    ("piano", "piano"),
    ("vocals", "vocals"),
    ("other", "other"),
];

/// One output stem produced by separation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Canonical internal name, e.g. "vocals".
    pub instrument_key: String,

    /// Human-facing label; equals `instrument_key` when unmapped.
    pub display_name: String,

    /// File name inside the job's output directory, e.g. "vocals.wav".
    pub file_name: String,

    /// Externally reachable URL of the file.
    pub file_url: String,
}

/// Fixed mapping from instrument key to display label.
///
/// Lookups never fail: unknown keys are returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNames {
    entries: BTreeMap<String, String>,
}

impl DisplayNames {
    /// Returns the table for the standard stem set.
    pub fn standard() -> Self {
        Self {
            entries: STANDARD_STEMS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Builds a table from custom entries, validating it.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (key, label) in entries {
            let key = key.into();
            if map.insert(key.clone(), label.into()).is_some() {
                return Err(format!("duplicate display name key {:?}", key));
            }
        }
        let names = Self { entries: map };
        match names.validate() {
            Some(err) => Err(err),
            None => Ok(names),
        }
    }

    /// Validates the table.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        for (key, label) in &self.entries {
            if key.trim().is_empty() {
                return Some("display name table contains an empty key".to_string());
            }
            if label.trim().is_empty() {
                return Some(format!("display name for {:?} is empty", key));
            }
        }
        None
    }

    /// Returns the label for `key`, or `key` itself when unmapped.
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Returns the number of mapped keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no keys are mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the `<key>.wav -> "<label> audio"` map sent with combined
    /// upload-and-separate responses.
    pub fn status_text(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(key, label)| (format!("{}.wav", key), format!("{} audio", label)))
            .collect()
    }
}

impl Default for DisplayNames {
    fn default() -> Self {
        Self::standard()
    }
}

impl Track {
    /// Creates a track, resolving its label through `names`.
    pub fn new(
        instrument_key: impl Into<String>,
        file_name: impl Into<String>,
        file_url: impl Into<String>,
        names: &DisplayNames,
    ) -> Self {
        let instrument_key = instrument_key.into();
        let display_name = names.label(&instrument_key).to_string();
        Self {
            instrument_key,
            display_name,
            file_name: file_name.into(),
            file_url: file_url.into(),
        }
    }
}
