//! romdb-core
//!
//! Core primitives for building arcade ROM databases:
//! - MRA descriptor extraction
//! - Version-aware reference table lookup with default fallback
//! - Manifest assembly and the published database document
//! - Harvest policy for growing reference tables (retry, cancellation, intake)
//!
//! This crate performs no filesystem or network I/O. Hosts plug storage and
//! transport in through the [`reference::TableSource`],
//! [`harvest::ArchiveProbe`], [`harvest::ProgressSink`], and
//! [`harvest::retry::Sleeper`] traits.

pub mod assemble;
pub mod config;
pub mod database;
pub mod descriptor;
pub mod determinism;
pub mod errors;
pub mod harvest;
pub mod model;
pub mod reference;
pub mod tags;
pub mod version;

pub use crate::errors::{RomDbError, RomDbResult};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::assemble::{assemble, Assembler, AssemblyReport};
    pub use crate::config::{BuildConfig, HarvestConfig};
    pub use crate::database::Database;
    pub use crate::descriptor::{extract, Descriptor};
    pub use crate::harvest::cancel::CancelToken;
    pub use crate::harvest::retry::{RetryPolicy, Sleeper};
    pub use crate::harvest::{ArchiveProbe, HarvestReport, ProgressSink};
    pub use crate::model::{HashRecord, Manifest, ManifestEntry, ReferenceTable};
    pub use crate::reference::{BaseUrls, ReferenceLoader, TableSource, VersionResolver};
    pub use crate::tags::TagDictionary;
    pub use crate::version::{Flavor, ReferenceKey};
    pub use crate::{RomDbError, RomDbResult};
}
