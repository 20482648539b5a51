//! Text normalization for descriptor documents.
//!
//! Reference table keys and archive flags are lowercase, so descriptors are
//! compared case-insensitively by lowercasing the whole document up front.

/// Normalize a raw descriptor document.
///
/// Rules:
/// - decode as UTF-8, replacing invalid sequences
/// - remove UTF-8 BOM if present
/// - lowercase everything (tags, attribute names, attribute values, text)
pub fn normalize_document(bytes: &[u8]) -> String {
    let s = String::from_utf8_lossy(bytes);
    let s = s.trim_start_matches('\u{FEFF}');
    s.to_lowercase()
}

/// Normalize a single text field: trim and lowercase. Empty fields are absent.
pub fn normalize_field(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_lowercase())
    }
}

/// Split a `|`-separated archive list into normalized, non-empty names.
pub fn split_archive_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value.split('|').filter_map(normalize_field)
}

/// Base file name of a slash-separated archive reference.
pub fn base_name(archive_ref: &str) -> &str {
    archive_ref.rsplit('/').next().unwrap_or(archive_ref)
}
