//! Saved-media export manifest.
//!
//! The manifest is a JSON document with a top-level `"Saved Media"` key.
//! Real exports are loosely keyed: the entry list may sit directly under the
//! key or one level deeper, and field names vary between export versions,
//! so every known field accepts the aliases observed in the wild.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::geo::{parse_latlon, GeoPoint};
use crate::timestamp::CaptureTime;

/// Top-level key holding the saved-media entry list.
const SAVED_MEDIA_KEY: &str = "Saved Media";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest file not found: {0}")]
    NotFound(String),

    #[error("manifest is missing the \"{SAVED_MEDIA_KEY}\" key")]
    MissingSavedMedia,

    #[error("unexpected manifest root type: {0}")]
    UnexpectedRoot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// One saved item from the export manifest.
///
/// Identity is positional; there is no stable unique key in the export
/// schema, which is why reconciliation falls back to substring search
/// (see [`Manifest::find_matching`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Download reference. Required in practice; entries without one are
    /// skipped by the orchestrator.
    #[serde(
        rename = "Media Download Url",
        alias = "Download Link",
        alias = "media_url",
        default
    )]
    pub media_url: Option<String>,

    /// Free-text location; a `"<lat>,<lon>"` pair may appear anywhere in it.
    #[serde(rename = "Location", alias = "location", default)]
    pub location: Option<String>,

    /// Capture time, `"YYYY-MM-DD HH:MM:SS TZ"`.
    #[serde(rename = "Date", alias = "date", default)]
    pub date: Option<String>,

    /// Fields we do not model, kept for the reconciliation substring search.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ManifestEntry {
    /// Parse the location field into a coordinate pair, if possible.
    pub fn geo(&self) -> Option<GeoPoint> {
        parse_latlon(self.location.as_deref())
    }

    /// Parse the date field, if present and well-formed.
    pub fn capture_time(&self) -> Option<CaptureTime> {
        let raw = self.date.as_deref()?;
        match CaptureTime::parse(raw) {
            Ok(time) => Some(time),
            Err(e) => {
                warn!(date = raw, error = %e, "Unparsable capture time in manifest entry");
                None
            }
        }
    }

    /// True if any string field contains `needle` (case-insensitive).
    fn matches(&self, needle_lower: &str) -> bool {
        let typed = [
            self.media_url.as_deref(),
            self.location.as_deref(),
            self.date.as_deref(),
        ];
        if typed
            .iter()
            .flatten()
            .any(|v| v.to_lowercase().contains(needle_lower))
        {
            return true;
        }

        self.extra
            .values()
            .filter_map(Value::as_str)
            .any(|v| v.to_lowercase().contains(needle_lower))
    }
}

/// The loaded export manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Load and parse a manifest file.
    ///
    /// The `"Saved Media"` value may be a list of entries, an object whose
    /// first list-valued field is the entry list, or a single entry object.
    /// Non-object entries are skipped with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ManifestError::NotFound(path.display().to_string()));
        }

        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse manifest JSON text.
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        let root: Value = serde_json::from_str(text)?;
        let saved = root
            .get(SAVED_MEDIA_KEY)
            .ok_or(ManifestError::MissingSavedMedia)?;

        let list = match saved {
            Value::Array(items) => items.clone(),
            Value::Object(map) => {
                // Nested structure: take the first list-valued field, else
                // treat the object itself as a single entry.
                match map.values().find_map(|v| v.as_array()) {
                    Some(items) => items.clone(),
                    None => vec![saved.clone()],
                }
            }
            other => {
                return Err(ManifestError::UnexpectedRoot(json_type_name(other)));
            }
        };

        let mut entries = Vec::with_capacity(list.len());
        for item in list {
            if !item.is_object() {
                warn!(
                    kind = %json_type_name(&item),
                    "Skipping non-object manifest entry"
                );
                continue;
            }
            entries.push(serde_json::from_value(item)?);
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the first entry with any string field containing `needle`
    /// (case-insensitive). Ambiguity is resolved first-match-wins; the export
    /// schema offers no stable identifier to do better with.
    pub fn find_matching(&self, needle: &str) -> Option<&ManifestEntry> {
        let needle_lower = needle.to_lowercase();
        self.entries.iter().find(|e| e.matches(&needle_lower))
    }
}

fn json_type_name(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}
