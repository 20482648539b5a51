//! Reference table lookup.
//!
//! Reference tables are produced by the harvester and map archive filenames
//! to `{md5, size}` for one `(flavor, version)` pair. This module does not
//! touch the filesystem: a [`TableSource`] hands over raw bytes and this
//! module parses, validates, and caches them.
//!
//! Two layers:
//! - [`ReferenceLoader`]: exact lookups with positive and negative caching
//! - [`VersionResolver`]: falls back to the flavor's default version when the
//!   requested one has no table

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{RomDbError, RomDbResult};
use crate::model::ReferenceTable;
use crate::version::{is_plain_version, Flavor, ReferenceKey};

/// Where reference table bytes come from.
///
/// `Ok(None)` means the table does not exist, which is a valid state and
/// distinct from an empty table.
pub trait TableSource {
    fn read_table(&self, key: &ReferenceKey) -> RomDbResult<Option<Vec<u8>>>;
}

impl<S: TableSource + ?Sized> TableSource for &S {
    fn read_table(&self, key: &ReferenceKey) -> RomDbResult<Option<Vec<u8>>> {
        (**self).read_table(key)
    }
}

/// In-memory source, handy for tests and for callers that already hold tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    tables: BTreeMap<ReferenceKey, ReferenceTable>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ReferenceKey, table: ReferenceTable) {
        self.tables.insert(key, table);
    }

    pub fn with(mut self, key: ReferenceKey, table: ReferenceTable) -> Self {
        self.insert(key, table);
        self
    }
}

impl TableSource for MemoryTables {
    fn read_table(&self, key: &ReferenceKey) -> RomDbResult<Option<Vec<u8>>> {
        self.tables
            .get(key)
            .map(|t| serde_json::to_vec(t).map_err(RomDbError::from))
            .transpose()
    }
}

/// Parse table bytes, failing with a "corrupt reference table" error naming
/// the table instead of surfacing a lookup crash later.
pub fn parse_table(label: &str, bytes: &[u8]) -> RomDbResult<ReferenceTable> {
    serde_json::from_slice(bytes).map_err(|e| RomDbError::corrupt_table(label, e.to_string()))
}

/// Exact-version table loader with caching.
pub struct ReferenceLoader<S> {
    source: S,
    cache: BTreeMap<ReferenceKey, Option<Arc<ReferenceTable>>>,
    reads: usize,
}

impl<S: TableSource> ReferenceLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: BTreeMap::new(),
            reads: 0,
        }
    }

    /// Number of times the underlying source was consulted.
    pub fn source_reads(&self) -> usize {
        self.reads
    }

    /// Load the table for `(flavor, version)`.
    ///
    /// A `None` version returns `None` without consulting the source. Misses
    /// are cached too, so a missing version is probed once per run. A version
    /// that could escape the table directory is treated as absent.
    pub fn load(
        &mut self,
        version: Option<&str>,
        flavor: Flavor,
    ) -> RomDbResult<Option<Arc<ReferenceTable>>> {
        let Some(version) = version else {
            return Ok(None);
        };
        if !is_plain_version(version) {
            warn!(version, %flavor, "ignoring unusable reference version");
            return Ok(None);
        }
        let key = ReferenceKey::new(flavor, version);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }

        self.reads += 1;
        let table = match self.source.read_table(&key)? {
            Some(bytes) => {
                let table = parse_table(&key.file_name(), &bytes)?;
                debug!(table = %key, entries = table.len(), "loaded reference table");
                Some(Arc::new(table))
            }
            None => {
                debug!(table = %key, "reference table not found");
                None
            }
        };
        self.cache.insert(key, table.clone());
        Ok(table)
    }
}

/// A resolved table plus the version that actually provided it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub table: Arc<ReferenceTable>,
    pub effective_version: String,
}

/// Version-aware lookup with a per-flavor default fallback.
pub struct VersionResolver<S> {
    loader: ReferenceLoader<S>,
}

impl<S: TableSource> VersionResolver<S> {
    pub fn new(source: S) -> Self {
        Self {
            loader: ReferenceLoader::new(source),
        }
    }

    pub fn loader(&self) -> &ReferenceLoader<S> {
        &self.loader
    }

    /// Resolve the table for a descriptor's declared version.
    ///
    /// If the declared version has no table (or none was declared) the
    /// flavor's default version is used instead. The default table must
    /// exist; its absence is a configuration error for the whole run.
    pub fn resolve(
        &mut self,
        version: Option<&str>,
        flavor: Flavor,
        source: &str,
    ) -> RomDbResult<Resolved> {
        if let (Some(table), Some(v)) = (self.loader.load(version, flavor)?, version) {
            return Ok(Resolved {
                table,
                effective_version: v.to_string(),
            });
        }

        let fallback = flavor.default_version();
        warn!(
            requested = version.unwrap_or("<none>"),
            fallback,
            %flavor,
            source,
            "no reference table for requested version, using default"
        );
        match self.loader.load(Some(fallback), flavor)? {
            Some(table) => Ok(Resolved {
                table,
                effective_version: fallback.to_string(),
            }),
            None => Err(RomDbError::MissingDefaultTable {
                key: ReferenceKey::new(flavor, fallback).to_string(),
            }),
        }
    }
}

/// Download base URLs keyed by flavor, then by version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseUrls(BTreeMap<Flavor, BTreeMap<String, String>>);

impl BaseUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(bytes: &[u8]) -> RomDbResult<Self> {
        let urls: Self = serde_json::from_slice(bytes)
            .map_err(|e| RomDbError::invalid_argument(format!("invalid base url table: {e}")))?;
        Ok(urls)
    }

    pub fn insert(&mut self, flavor: Flavor, version: impl Into<String>, url: impl Into<String>) {
        self.0.entry(flavor).or_default().insert(version.into(), url.into());
    }

    pub fn with(mut self, flavor: Flavor, version: impl Into<String>, url: impl Into<String>) -> Self {
        self.insert(flavor, version, url);
        self
    }

    pub fn url_for(&self, flavor: Flavor, version: &str) -> RomDbResult<&str> {
        self.0
            .get(&flavor)
            .and_then(|m| m.get(version))
            .map(String::as_str)
            .ok_or_else(|| RomDbError::MissingBaseUrl {
                key: ReferenceKey::new(flavor, version).to_string(),
            })
    }
}
