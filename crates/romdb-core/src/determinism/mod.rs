//! Deterministic helpers: hashing, text normalization, ordering, and JSON
//! encoding. Everything here is in-memory and depends only on its inputs.

pub mod canonical_json;
pub mod hashing;
pub mod normalize_text;
pub mod stable_sort;
