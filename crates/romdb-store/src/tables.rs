//! Reference tables on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use romdb_core::reference::TableSource;
use romdb_core::version::ReferenceKey;
use romdb_core::RomDbResult;
use tracing::debug;

/// Directory of `{flavor}_{version}.json` files.
#[derive(Debug, Clone)]
pub struct FsTableSource {
    root: PathBuf,
}

impl FsTableSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &ReferenceKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Keys of every table file in the directory, sorted. Other files are ignored.
    pub fn available(&self) -> RomDbResult<Vec<ReferenceKey>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            match ReferenceKey::from_file_name(&name.to_string_lossy()) {
                Ok(key) => keys.push(key),
                Err(e) => debug!(file = ?name, error = %e, "ignoring file in table directory"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

impl TableSource for FsTableSource {
    fn read_table(&self, key: &ReferenceKey) -> RomDbResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
