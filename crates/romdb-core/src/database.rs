//! The published database document.
//!
//! The document is immutable once built, apart from `timestamp`. Change
//! detection zeroes the timestamp on both sides and compares canonical bytes,
//! so two builds of the same content compare equal whenever they ran.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::determinism::canonical_json::to_canonical_bytes;
use crate::errors::RomDbResult;
use crate::model::{FolderEntry, Manifest};
use crate::tags::TagDictionary;
use crate::version::Flavor;

pub const DEFAULT_DB_ID: &str = "arcade_roms_db";

const TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub db_id: String,
    pub files: Manifest,
    pub folders: BTreeMap<String, FolderEntry>,
    pub zips: BTreeMap<String, Value>,
    pub base_files_url: String,
    pub default_options: BTreeMap<String, Value>,
    pub tag_dictionary: BTreeMap<String, u32>,
    pub timestamp: i64,
}

impl Database {
    /// Wrap an assembled manifest with the static folder and tag metadata.
    pub fn new(db_id: impl Into<String>, files: Manifest, tags: &TagDictionary, timestamp: i64) -> Self {
        Self {
            db_id: db_id.into(),
            files,
            folders: folders(tags),
            zips: BTreeMap::new(),
            base_files_url: String::new(),
            default_options: BTreeMap::new(),
            tag_dictionary: tags.as_map().clone(),
            timestamp,
        }
    }

    /// Copy with the timestamp zeroed.
    pub fn normalized(&self) -> Self {
        Self {
            timestamp: 0,
            ..self.clone()
        }
    }

    /// Compact canonical bytes of the normalized document.
    pub fn comparison_bytes(&self) -> RomDbResult<Vec<u8>> {
        to_canonical_bytes(&self.normalized())
    }

    /// Whether a previously published document carries the same content.
    ///
    /// The prior document is taken as raw JSON so that an older or foreign
    /// shape simply compares unequal instead of failing to decode.
    pub fn same_content_as(&self, prior: &Value) -> RomDbResult<bool> {
        let prior = normalize_value(prior);
        Ok(self.comparison_bytes()? == to_canonical_bytes(&prior)?)
    }
}

/// Zero the timestamp of a raw JSON document, if it is an object.
pub fn normalize_value(doc: &Value) -> Value {
    let mut doc = doc.clone();
    if let Some(obj) = doc.as_object_mut() {
        obj.insert(TIMESTAMP_FIELD.to_string(), Value::from(0));
    }
    doc
}

fn folders(tags: &TagDictionary) -> BTreeMap<String, FolderEntry> {
    let arcade = tags.arcade_tag();
    let mut out = BTreeMap::new();
    out.insert("games".to_string(), FolderEntry::default());
    for flavor in [Flavor::Mame, Flavor::Hbmame] {
        out.insert(
            flavor.folder().to_string(),
            FolderEntry::with_tags(vec![tags.flavor_tag(flavor), arcade]),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ManifestEntry;

    fn sample(timestamp: i64) -> Database {
        let mut files = Manifest::new();
        files.insert(
            "games/mame/a.zip".to_string(),
            ManifestEntry {
                hash: "abc".into(),
                size: 1,
                url: "http://x/a.zip".into(),
                tags: vec![0, 2],
            },
        );
        Database::new(DEFAULT_DB_ID, files, &TagDictionary::seeded(), timestamp)
    }

    #[test]
    fn folders_carry_structural_tags() {
        let db = sample(1);
        assert_eq!(db.folders["games/mame"].tags, vec![0, 2]);
        assert_eq!(db.folders["games/hbmame"].tags, vec![1, 2]);
        assert!(db.folders["games"].tags.is_empty());
        assert!(db.zips.is_empty());
    }

    #[test]
    fn timestamps_do_not_affect_comparison() {
        let a = sample(1_600_000_000);
        let b = sample(1_700_000_000);
        assert_ne!(a, b);
        let prior = serde_json::to_value(&b).unwrap();
        assert!(a.same_content_as(&prior).unwrap());
    }

    #[test]
    fn content_changes_are_detected() {
        let a = sample(1);
        let mut b = sample(1);
        b.files.get_mut("games/mame/a.zip").unwrap().size = 2;
        let prior = serde_json::to_value(&b).unwrap();
        assert!(!a.same_content_as(&prior).unwrap());
    }

    #[test]
    fn foreign_documents_compare_unequal() {
        let a = sample(1);
        assert!(!a.same_content_as(&serde_json::json!([1, 2, 3])).unwrap());
        assert!(!a.same_content_as(&serde_json::json!({"timestamp": 5})).unwrap());
    }
}
