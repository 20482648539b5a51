//! Deterministic JSON encoding.
//!
//! Values go through `serde_json::Value` first so object keys come out sorted
//! regardless of struct field order. Two encodings are produced:
//! - pretty (4-space indent) for files meant to be read and diffed
//! - compact for the zipped database and byte-for-byte comparisons

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

use crate::errors::RomDbResult;

/// Convert to a `Value` with sorted object keys.
pub fn canonical_value<T: Serialize>(value: &T) -> RomDbResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Compact, key-sorted bytes.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> RomDbResult<Vec<u8>> {
    let v = canonical_value(value)?;
    Ok(serde_json::to_vec(&v)?)
}

/// Pretty-printed, key-sorted bytes with a 4-space indent and trailing newline.
pub fn to_pretty_bytes<T: Serialize>(value: &T) -> RomDbResult<Vec<u8>> {
    let v = canonical_value(value)?;
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    v.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}
