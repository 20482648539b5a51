//! romdb-store
//!
//! Filesystem side of romdb:
//! - reference tables stored as `{flavor}_{version}.json` in one directory
//! - the harvest progress file, rewritten atomically after every entry
//! - zip handling for descriptor bundles, downloaded archives, and the
//!   zipped database
//! - descriptor discovery under an extraction directory

pub mod archive;
pub mod descriptors;
pub mod export;
pub mod progress;
pub mod tables;

pub use crate::descriptors::find_descriptors;
pub use crate::export::{write_database, WrittenDatabase};
pub use crate::progress::ProgressFile;
pub use crate::tables::FsTableSource;

use std::fs;
use std::io::Write;
use std::path::Path;

use romdb_core::{RomDbError, RomDbResult};
use tempfile::NamedTempFile;

/// Replace `path` with `bytes` through a temp file in the same directory.
///
/// Readers see either the old or the new content, never a partial write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> RomDbResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| RomDbError::Io(e.error))?;
    Ok(())
}
