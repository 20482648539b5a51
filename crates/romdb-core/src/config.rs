//! Configuration structures for romdb-core.
//!
//! The core crate itself does not read environment variables. The CLI maps
//! its flags and environment onto these structs and passes them in.

use crate::database::DEFAULT_DB_ID;
use crate::errors::{RomDbError, RomDbResult};
use crate::harvest::retry::RetryPolicy;

/// Placeholder archive that descriptors reference but that is never
/// distributed.
pub const EXCLUDED_ARCHIVE: &str = "jtbeta.zip";

/// Archive known to be broken upstream; the harvester never records it.
pub const HARVEST_SKIP_LIST: &[&str] = &["hapyfsh2.zip"];

/// Archives declared larger than this are not recorded by the harvester.
pub const MAX_ARCHIVE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Database build configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub db_id: String,
    pub excluded_archives: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            db_id: DEFAULT_DB_ID.to_string(),
            excluded_archives: vec![EXCLUDED_ARCHIVE.to_string()],
        }
    }
}

/// Harvester configuration.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub skip_list: Vec<String>,
    pub max_archive_size: u64,
    pub retry: RetryPolicy,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            skip_list: HARVEST_SKIP_LIST.iter().map(|s| s.to_string()).collect(),
            max_archive_size: MAX_ARCHIVE_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl HarvestConfig {
    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip_list.iter().any(|s| s == name)
    }
}

pub fn validate_build_config(cfg: &BuildConfig) -> RomDbResult<()> {
    if cfg.db_id.trim().is_empty() {
        return Err(RomDbError::invalid_argument("db_id must not be empty"));
    }
    if cfg.excluded_archives.iter().any(|a| a.contains('/')) {
        return Err(RomDbError::invalid_argument(
            "excluded archives are matched by base name and must not contain '/'",
        ));
    }
    Ok(())
}

pub fn validate_harvest_config(cfg: &HarvestConfig) -> RomDbResult<()> {
    if cfg.retry.attempts == 0 {
        return Err(RomDbError::invalid_argument(
            "retry attempts must be greater than zero",
        ));
    }
    if cfg.max_archive_size == 0 {
        return Err(RomDbError::invalid_argument(
            "max_archive_size must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_are_valid() {
        validate_build_config(&BuildConfig::default()).unwrap();
        validate_harvest_config(&HarvestConfig::default()).unwrap();
    }

    #[test]
    fn empty_db_id_detected() {
        let mut cfg = BuildConfig::default();
        cfg.db_id = " ".to_string();
        assert!(validate_build_config(&cfg).is_err());
    }

    #[test]
    fn zero_attempts_detected() {
        let mut cfg = HarvestConfig::default();
        cfg.retry.attempts = 0;
        assert!(validate_harvest_config(&cfg).is_err());
    }

    #[test]
    fn skip_list_matches_exact_names() {
        let cfg = HarvestConfig::default();
        assert!(cfg.is_skipped("hapyfsh2.zip"));
        assert!(!cfg.is_skipped("hapyfsh.zip"));
    }
}
