//! Run results: the data bag, generated artifacts and plugin failures.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;

use crate::plugins::PluginKind;

/// Insertion-ordered map keyed by plugin id.
///
/// Serializes as a JSON object whose keys appear in insertion order, which is
/// the execution order of the plugins that produced the entries.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value for `key`, keeping its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map keyed by plugin id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    out.insert(key, value);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// Extractor id to extracted value, in extractor execution order.
pub type DataBag = OrderedMap<serde_json::Value>;

/// Generator id to outcome, in generator execution order.
pub type GenerationReport = OrderedMap<GenerationOutcome>;

/// Where an artifact ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ArtifactLocation {
    File { path: PathBuf },
    Inline { content: String },
}

/// A single generator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub name: String,
    pub media_type: String,
    pub location: ArtifactLocation,
}

impl Artifact {
    pub fn inline(name: impl Into<String>, media_type: &str, content: String) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.to_string(),
            location: ArtifactLocation::Inline { content },
        }
    }

    pub fn file(name: impl Into<String>, media_type: &str, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.to_string(),
            location: ArtifactLocation::File { path },
        }
    }

    /// Inline content, if this artifact was not written to disk.
    pub fn content(&self) -> Option<&str> {
        match &self.location {
            ArtifactLocation::Inline { content } => Some(content.as_str()),
            ArtifactLocation::File { .. } => None,
        }
    }
}

/// Result of one generator invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A recorded, recovered plugin error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginFailure {
    pub plugin: String,
    pub kind: PluginKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub extractors_used: Vec<String>,
    pub generators_used: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub generated_at_ms: u64,
}

// Timestamps never take part in equality.
impl PartialEq for RunMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.extractors_used == other.extractors_used
            && self.generators_used == other.generators_used
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub url: String,
    pub data_bag: DataBag,
    pub generation: GenerationReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extraction_errors: Vec<PluginFailure>,
    pub metadata: RunMetadata,
}

impl RunReport {
    /// Extraction failures followed by generation failures.
    pub fn failures(&self) -> Vec<PluginFailure> {
        let mut out = self.extraction_errors.clone();
        out.extend(self.generation.iter().filter_map(|(id, outcome)| {
            outcome.error.as_ref().map(|message| PluginFailure {
                plugin: id.to_string(),
                kind: PluginKind::Generator,
                message: message.clone(),
            })
        }));
        out
    }

    pub fn is_clean(&self) -> bool {
        self.extraction_errors.is_empty() && self.generation.values().all(|o| o.succeeded())
    }
}
