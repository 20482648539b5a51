//! Error types shared by the romdb crates.
//!
//! Every variant here is fatal for the run that raises it. Recoverable
//! conditions (duplicate destinations, archives missing from a table, excluded
//! archives) are logged where they happen and never become errors.

use thiserror::Error;

pub type RomDbResult<T> = Result<T, RomDbError>;

#[derive(Debug, Error)]
pub enum RomDbError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed descriptor {source_id}: {message}")]
    Descriptor { source_id: String, message: String },

    #[error("corrupt reference table {key}: {message}")]
    CorruptTable { key: String, message: String },

    #[error("missing reference table for default version {key}")]
    MissingDefaultTable { key: String },

    #[error("no base url configured for {key}")]
    MissingBaseUrl { key: String },

    #[error("size mismatch for {name}: expected {expected} bytes, got {actual}")]
    SizeMismatch { name: String, expected: u64, actual: u64 },

    #[error("giving up on {name} after {attempts} failed attempts")]
    RetriesExhausted { name: String, attempts: u32 },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RomDbError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn descriptor(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Descriptor {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn corrupt_table(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptTable {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for RomDbError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_source() {
        let e = RomDbError::descriptor("games/foo.mra", "unexpected eof");
        assert_eq!(
            e.to_string(),
            "malformed descriptor games/foo.mra: unexpected eof"
        );
    }

    #[test]
    fn json_errors_become_serialization() {
        let e: RomDbError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(e, RomDbError::Serialization(_)));
    }
}
