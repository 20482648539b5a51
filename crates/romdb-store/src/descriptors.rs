//! Descriptor discovery.

use std::path::{Path, PathBuf};

use romdb_core::determinism::stable_sort::sort_by_normalized_name;
use romdb_core::{RomDbError, RomDbResult};
use walkdir::WalkDir;

const DESCRIPTOR_EXTENSION: &str = "mra";

fn is_descriptor(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(DESCRIPTOR_EXTENSION))
}

/// Every `.mra` file under `dir`, in the order manifest assembly consumes
/// them: lowercase file name, ties broken by full path.
pub fn find_descriptors(dir: &Path) -> RomDbResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| RomDbError::Io(e.into()))?;
        if entry.file_type().is_file() && is_descriptor(entry.path()) {
            out.push(entry.into_path());
        }
    }
    out.sort();
    sort_by_normalized_name(&mut out, |p| p.to_str().unwrap_or_default());
    Ok(out)
}
