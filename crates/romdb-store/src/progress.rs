//! Harvest progress file.
//!
//! The harvester's output table doubles as its checkpoint: it is loaded at
//! startup so known archives are skipped, and rewritten in full after every
//! resolved entry.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use romdb_core::determinism::canonical_json::to_pretty_bytes;
use romdb_core::harvest::ProgressSink;
use romdb_core::model::ReferenceTable;
use romdb_core::reference::parse_table;
use romdb_core::RomDbResult;
use tracing::{debug, info};

use crate::write_atomic;

#[derive(Debug, Clone)]
pub struct ProgressFile {
    path: PathBuf,
}

impl ProgressFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the table accumulated by earlier runs. A missing file is an
    /// empty table; an unreadable one is a corrupt table error.
    pub fn load(&self) -> RomDbResult<ReferenceTable> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no progress file, starting empty");
                return Ok(ReferenceTable::new());
            }
            Err(e) => return Err(e.into()),
        };
        let table = parse_table(&self.path.display().to_string(), &bytes)?;
        info!(path = %self.path.display(), entries = table.len(), "loaded progress");
        Ok(table)
    }
}

impl ProgressSink for ProgressFile {
    fn save(&mut self, table: &ReferenceTable) -> RomDbResult<()> {
        let bytes = to_pretty_bytes(table)?;
        write_atomic(&self.path, &bytes)?;
        debug!(
            path = %self.path.display(),
            entries = table.len(),
            size = %ByteSize(bytes.len() as u64),
            "saved progress"
        );
        Ok(())
    }
}
