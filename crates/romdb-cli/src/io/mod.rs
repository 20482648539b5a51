pub mod git;
pub mod transport;

use std::fs;

use anyhow::{Context, Result};

/// Bytes of a JSON argument given either inline or as a file path.
pub fn read_json_arg(value: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim_start();
    if trimmed.starts_with('{') {
        return Ok(trimmed.as_bytes().to_vec());
    }
    fs::read(value).with_context(|| format!("failed to read {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_or_file() {
        assert_eq!(read_json_arg(r#" {"a": 1}"#).unwrap(), br#"{"a": 1}"#);

        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("s.json");
        fs::write(&p, b"{}").unwrap();
        assert_eq!(read_json_arg(p.to_str().unwrap()).unwrap(), b"{}");
        assert!(read_json_arg("/definitely/not/here.json").is_err());
    }
}
