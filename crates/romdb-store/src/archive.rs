//! Zip handling.
//!
//! Three uses: pulling descriptor members out of source bundles, checking
//! that a downloaded archive is intact, and packing the database document.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use romdb_core::{RomDbError, RomDbResult};
use serde_json::Value;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

fn zip_err(e: zip::result::ZipError) -> RomDbError {
    RomDbError::archive(e.to_string())
}

/// Whether a member name is selected by a source's member pattern.
///
/// A trailing `*` selects every member under that prefix; anything else must
/// match the member name exactly.
pub fn member_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}

/// Extract the members of `bytes` matched by `pattern` under `dest`.
///
/// Returns the number of files written. Members whose names would escape
/// `dest` are skipped. Selecting nothing is an error: a source that yields no
/// descriptors is misconfigured.
pub fn extract_members(bytes: &[u8], pattern: &str, dest: &Path) -> RomDbResult<usize> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_err)?;
    let mut matched = 0usize;
    let mut written = 0usize;

    for i in 0..archive.len() {
        let mut member = archive.by_index(i).map_err(zip_err)?;
        if !member_matches(pattern, member.name()) {
            continue;
        }
        matched += 1;

        let Some(relative) = member.enclosed_name() else {
            warn!(member = member.name(), "member path escapes the extraction dir, skipping");
            continue;
        };
        let target = dest.join(relative);
        if member.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut member, &mut out)?;
        written += 1;
    }

    if matched == 0 {
        return Err(RomDbError::archive(format!("no member matches {pattern}")));
    }
    debug!(pattern, written, dest = %dest.display(), "extracted members");
    Ok(written)
}

/// Read every member of the zip at `path` to the end.
///
/// Reading to the end makes the zip reader check each member's CRC, so a
/// truncated or corrupted archive fails here. Returns the member count.
pub fn verify_zip(path: &Path) -> RomDbResult<usize> {
    let mut archive = ZipArchive::new(File::open(path)?).map_err(zip_err)?;
    for i in 0..archive.len() {
        let mut member = archive.by_index(i).map_err(zip_err)?;
        let name = member.name().to_string();
        io::copy(&mut member, &mut io::sink())
            .map_err(|e| RomDbError::archive(format!("{}: member {name}: {e}", path.display())))?;
    }
    Ok(archive.len())
}

/// A deflated zip holding one member with fixed metadata, so equal input
/// gives equal bytes.
pub fn zip_single_entry(name: &str, bytes: &[u8]) -> RomDbResult<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(name, options).map_err(zip_err)?;
    writer.write_all(bytes)?;
    let cursor = writer.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}

/// Parse the first member of a zip as JSON.
pub fn read_single_json(bytes: &[u8]) -> RomDbResult<Value> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_err)?;
    if archive.is_empty() {
        return Err(RomDbError::archive("zip has no members"));
    }
    let mut member = archive.by_index(0).map_err(zip_err)?;
    let mut raw = Vec::new();
    member.read_to_end(&mut raw)?;
    Ok(serde_json::from_slice(&raw)?)
}
