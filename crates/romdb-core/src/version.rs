//! Flavor and reference version helpers.
//!
//! Two parallel archive universes exist: regular MAME sets and HBMAME
//! (homebrew/hack) sets. Each has its own reference table history, so every
//! table is identified by a `(flavor, version)` pair.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{RomDbError, RomDbResult};

/// Version used when a descriptor does not declare one (or declares one
/// without a table) and the archive is a MAME set.
pub const DEFAULT_MAME_VERSION: &str = "0217";

/// Same as [`DEFAULT_MAME_VERSION`] for HBMAME sets.
pub const DEFAULT_HBMAME_VERSION: &str = "0220";

/// Path segment that marks an archive reference as an HBMAME set.
pub const HBMAME_SEGMENT: &str = "hbmame/";

/// Whether `version` can be embedded in a table file name. Path separators
/// and parent references are refused.
pub fn is_plain_version(version: &str) -> bool {
    !version.is_empty() && !version.contains(&['/', '\\'][..]) && !version.contains("..")
}

/// Archive universe an archive reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Mame,
    Hbmame,
}

impl Flavor {
    /// Classify an archive reference as it appears in a descriptor.
    pub fn of_archive_ref(archive_ref: &str) -> Self {
        if archive_ref.contains(HBMAME_SEGMENT) {
            Self::Hbmame
        } else {
            Self::Mame
        }
    }

    pub fn parse(s: &str) -> RomDbResult<Self> {
        match s {
            "mame" => Ok(Self::Mame),
            "hbmame" => Ok(Self::Hbmame),
            _ => Err(RomDbError::invalid_argument(format!("unknown flavor: {s}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mame => "mame",
            Self::Hbmame => "hbmame",
        }
    }

    pub fn default_version(&self) -> &'static str {
        match self {
            Self::Mame => DEFAULT_MAME_VERSION,
            Self::Hbmame => DEFAULT_HBMAME_VERSION,
        }
    }

    /// Folder, inside the published database, receiving this flavor's archives.
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Mame => "games/mame",
            Self::Hbmame => "games/hbmame",
        }
    }

    /// Destination path for an archive base name.
    pub fn destination(&self, base_name: &str) -> String {
        format!("{}/{}", self.folder(), base_name)
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one reference table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferenceKey {
    pub flavor: Flavor,
    pub version: String,
}

impl ReferenceKey {
    pub fn new(flavor: Flavor, version: impl Into<String>) -> Self {
        Self {
            flavor,
            version: version.into(),
        }
    }

    /// Canonical storage name, e.g. `mame_0217.json`.
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.flavor, self.version)
    }

    /// Parse a storage name produced by [`ReferenceKey::file_name`].
    pub fn from_file_name(name: &str) -> RomDbResult<Self> {
        let stem = name
            .strip_suffix(".json")
            .ok_or_else(|| RomDbError::invalid_argument(format!("not a table file: {name}")))?;
        let (flavor, version) = stem
            .split_once('_')
            .ok_or_else(|| RomDbError::invalid_argument(format!("not a table file: {name}")))?;
        if version.is_empty() {
            return Err(RomDbError::invalid_argument(format!("missing version: {name}")));
        }
        Ok(Self::new(Flavor::parse(flavor)?, version))
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.flavor, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hbmame_segment_selects_flavor() {
        assert_eq!(Flavor::of_archive_ref("a.zip"), Flavor::Mame);
        assert_eq!(Flavor::of_archive_ref("hbmame/a.zip"), Flavor::Hbmame);
        assert_eq!(Flavor::of_archive_ref("roms/hbmame/a.zip"), Flavor::Hbmame);
    }

    #[test]
    fn destinations_differ_per_flavor() {
        assert_eq!(Flavor::Mame.destination("a.zip"), "games/mame/a.zip");
        assert_eq!(Flavor::Hbmame.destination("a.zip"), "games/hbmame/a.zip");
    }

    #[test]
    fn file_name_round_trips() {
        let key = ReferenceKey::new(Flavor::Hbmame, "0220");
        assert_eq!(key.file_name(), "hbmame_0220.json");
        assert_eq!(ReferenceKey::from_file_name("hbmame_0220.json").unwrap(), key);
    }

    #[test]
    fn rejects_unknown_flavor() {
        let e = ReferenceKey::from_file_name("neogeo_0001.json").unwrap_err();
        assert!(e.to_string().contains("unknown flavor"));
    }

    #[test]
    fn path_like_versions_are_not_plain() {
        assert!(is_plain_version("0217"));
        assert!(is_plain_version("0.217"));
        for v in ["", "../../x", "a/b", "a\\b", ".."] {
            assert!(!is_plain_version(v), "{v:?}");
        }
    }

    #[test]
    fn display_is_flavor_at_version() {
        assert_eq!(ReferenceKey::new(Flavor::Mame, "0223").to_string(), "mame@0223");
    }
}
