//! romdb data records.
//!
//! These are the typed shapes shared between the harvester (which produces
//! reference tables) and the database builder (which consumes them and emits
//! manifest entries). Models are mostly "dumb" data; policy lives in
//! `crate::assemble` and `crate::harvest`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Digest and byte size of one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashRecord {
    pub md5: String,
    pub size: u64,
}

impl HashRecord {
    pub fn new(md5: impl Into<String>, size: u64) -> Self {
        Self {
            md5: md5.into(),
            size,
        }
    }
}

/// Archive filename -> hash record, for one `(flavor, version)` pair.
pub type ReferenceTable = BTreeMap<String, HashRecord>;

/// One published file of the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub hash: String,
    pub size: u64,
    pub url: String,
    pub tags: Vec<u32>,
}

/// Destination path -> entry.
pub type Manifest = BTreeMap<String, ManifestEntry>;

/// One published folder of the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<u32>,
}

impl FolderEntry {
    pub fn with_tags(tags: Vec<u32>) -> Self {
        Self { tags }
    }
}

/// Lightweight validation helpers for records read from disk.
pub mod validate {
    use super::*;
    use crate::errors::{RomDbError, RomDbResult};

    /// Check that a hash record looks like an MD5 digest in lowercase hex.
    pub fn hash_record(name: &str, record: &HashRecord) -> RomDbResult<()> {
        let ok = record.md5.len() == 32
            && record
                .md5
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !ok {
            return Err(RomDbError::invalid_argument(format!(
                "invalid md5 for {name}: {}",
                record.md5
            )));
        }
        Ok(())
    }
}
