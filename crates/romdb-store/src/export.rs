//! Database artifacts.
//!
//! A build writes two files next to each other:
//! - `<stem>.json`: pretty, key-sorted, for people and diffs
//! - `<stem>.json.zip`: one minified `<stem>.json` member, for clients

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use romdb_core::database::Database;
use romdb_core::determinism::canonical_json::{to_canonical_bytes, to_pretty_bytes};
use romdb_core::{RomDbError, RomDbResult};
use serde_json::Value;
use tracing::info;

use crate::archive::{read_single_json, zip_single_entry};
use crate::write_atomic;

/// Paths of the files written for one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDatabase {
    pub json: PathBuf,
    pub zip: PathBuf,
}

impl WrittenDatabase {
    /// File name of the zip, as committed when publishing.
    pub fn zip_name(&self) -> RomDbResult<String> {
        file_name(&self.zip)
    }
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = stem.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn file_name(path: &Path) -> RomDbResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| RomDbError::invalid_argument(format!("no file name in {}", path.display())))
}

pub fn write_database(db: &Database, stem: &Path) -> RomDbResult<WrittenDatabase> {
    let json = with_suffix(stem, ".json");
    let zip = with_suffix(stem, ".json.zip");
    let entry_name = file_name(&json)?;

    let pretty = to_pretty_bytes(db)?;
    write_atomic(&json, &pretty)?;

    let packed = zip_single_entry(&entry_name, &to_canonical_bytes(db)?)?;
    write_atomic(&zip, &packed)?;

    info!(
        json = %json.display(),
        zip = %zip.display(),
        files = db.files.len(),
        json_size = %ByteSize(pretty.len() as u64),
        zip_size = %ByteSize(packed.len() as u64),
        "database written"
    );
    Ok(WrittenDatabase { json, zip })
}

/// Read the document out of a zipped database file.
pub fn read_zipped_document(path: &Path) -> RomDbResult<Value> {
    read_single_json(&fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use romdb_core::model::{Manifest, ManifestEntry};
    use romdb_core::tags::TagDictionary;

    fn sample(timestamp: i64) -> Database {
        let mut files = Manifest::new();
        files.insert(
            "games/mame/a.zip".into(),
            ManifestEntry {
                hash: "0123456789abcdef0123456789abcdef".into(),
                size: 10,
                url: "https://x/a.zip".into(),
                tags: vec![0, 2],
            },
        );
        Database::new("arcade_roms_db", files, &TagDictionary::seeded(), timestamp)
    }

    #[test]
    fn writes_json_and_zip_side_by_side() {
        let dir = tempfile::tempdir().unwrap();
        let out = write_database(&sample(42), &dir.path().join("arcade_roms_db")).unwrap();
        assert!(out.json.ends_with("arcade_roms_db.json"));
        assert_eq!(out.zip_name().unwrap(), "arcade_roms_db.json.zip");

        let text = fs::read_to_string(&out.json).unwrap();
        assert!(text.starts_with("{\n    \"base_files_url\": \"\","));

        let doc = read_zipped_document(&out.zip).unwrap();
        assert_eq!(doc["timestamp"], 42);
        assert_eq!(doc, serde_json::from_str::<Value>(&text).unwrap());
    }

    #[test]
    fn rebuild_with_new_timestamp_has_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let out = write_database(&sample(1), &dir.path().join("db")).unwrap();
        let prior = read_zipped_document(&out.zip).unwrap();
        assert!(sample(2).same_content_as(&prior).unwrap());
    }
}
