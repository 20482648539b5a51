//! Harvest intake: which archives to look at.
//!
//! Two strategies, chosen from the shape of the source string:
//! - an archive.org download directory (`https://archive.org/download/<item>/<set>.zip/`):
//!   the index page is scraped for `(filename, size)` pairs and every archive
//!   is downloaded and hashed
//! - a bare archive.org item identifier: the item's metadata listing already
//!   declares md5 and size for every file

use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;

use crate::errors::{RomDbError, RomDbResult};

const DOWNLOAD_SOURCE_PATTERN: &str =
    r"^https://archive[.]org/download/([-_a-z0-9.%]+)/([-_a-z0-9.%]+)[.]zip/$";
const ITEM_SOURCE_PATTERN: &str = r"^([-_a-z0-9.%]+)$";
const INDEX_LINE_PATTERN: &str = r#".*>([-_a-z0-9.]+[.]zip)<.*"size">([0-9]+)<.*"#;

const INDEX_REGION_START: &str = r#"<main id="maincontent">"#;
const INDEX_REGION_END: &str = "</main>";

const METADATA_ENDPOINT: &str = "https://archive.org/metadata/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestSource {
    /// Directory listing URL; archives are fetched as `url + name`.
    Index { url: String },
    /// archive.org item identifier.
    Metadata { item: String },
}

impl HarvestSource {
    /// Classify a source string. Matching is case-insensitive; the original
    /// spelling is kept for requests.
    pub fn classify(source: &str) -> RomDbResult<Self> {
        let source = source.trim();
        let lowered = source.to_lowercase();

        let download = Regex::new(DOWNLOAD_SOURCE_PATTERN)
            .map_err(|e| RomDbError::invalid_argument(e.to_string()))?;
        if download.is_match(&lowered) {
            return Ok(Self::Index {
                url: source.to_string(),
            });
        }

        let item = Regex::new(ITEM_SOURCE_PATTERN)
            .map_err(|e| RomDbError::invalid_argument(e.to_string()))?;
        if item.is_match(&lowered) {
            return Ok(Self::Metadata {
                item: source.to_string(),
            });
        }

        Err(RomDbError::invalid_argument(format!(
            "could not process source {source}"
        )))
    }

    /// URL to request for the listing.
    pub fn listing_url(&self) -> String {
        match self {
            Self::Index { url } => url.clone(),
            Self::Metadata { item } => format!("{METADATA_ENDPOINT}{item}"),
        }
    }
}

/// Extract `(filename, size)` pairs from a directory index page.
///
/// Only lines inside the main content region are considered, and lines are
/// lowercased before matching.
pub fn scrape_index(html: &str) -> RomDbResult<BTreeMap<String, u64>> {
    let line_re =
        Regex::new(INDEX_LINE_PATTERN).map_err(|e| RomDbError::invalid_argument(e.to_string()))?;

    let mut inside = false;
    let mut out = BTreeMap::new();
    for line in html.lines() {
        if !inside && line.contains(INDEX_REGION_START) {
            inside = true;
        } else if line.contains(INDEX_REGION_END) {
            inside = false;
        }
        if !inside {
            continue;
        }

        let lowered = line.to_lowercase();
        let Some(caps) = line_re.captures(&lowered) else {
            continue;
        };
        let size: u64 = caps[2]
            .parse()
            .map_err(|e| RomDbError::invalid_argument(format!("bad size in index: {e}")))?;
        out.insert(caps[1].to_string(), size);
    }
    Ok(out)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
struct RawMetadataFile {
    name: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    md5: Option<String>,
    #[serde(default)]
    size: Option<SizeField>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    files: Vec<RawMetadataFile>,
}

/// One file of an archive.org metadata listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFile {
    pub name: String,
    pub format: String,
    pub md5: Option<String>,
    pub size: Option<u64>,
}

impl MetadataFile {
    pub fn is_zip(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case("zip")
    }
}

/// Parse an archive.org metadata response.
pub fn parse_metadata(bytes: &[u8]) -> RomDbResult<Vec<MetadataFile>> {
    let raw: RawMetadata = serde_json::from_slice(bytes)?;
    raw.files
        .into_iter()
        .map(|f| {
            let size = match f.size {
                None => None,
                Some(SizeField::Number(n)) => Some(n),
                Some(SizeField::Text(t)) => Some(t.trim().parse::<u64>().map_err(|e| {
                    RomDbError::serialization(format!("bad size for {}: {e}", f.name))
                })?),
            };
            Ok(MetadataFile {
                format: f.format.unwrap_or_default(),
                md5: f.md5.map(|m| m.trim().to_string()),
                size,
                name: f.name,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_download_directories() {
        let s = "https://archive.org/download/MAME-0217/MAME%200.217%20ROMs.zip/";
        assert_eq!(
            HarvestSource::classify(s).unwrap(),
            HarvestSource::Index { url: s.to_string() }
        );
    }

    #[test]
    fn classifies_items() {
        let s = HarvestSource::classify("hbmame-0220").unwrap();
        assert_eq!(s.listing_url(), "https://archive.org/metadata/hbmame-0220");
    }

    #[test]
    fn rejects_other_sources() {
        assert!(HarvestSource::classify("https://example.com/roms/").is_err());
        assert!(HarvestSource::classify("two words").is_err());
    }

    #[test]
    fn scrapes_only_main_region() {
        let html = r#"<html>
<a href="x">outside.zip</a><td class="size">"size">1</td>
<main id="maincontent">
<tr><td><a href="/d/Pacman.zip">Pacman.zip</a></td><td id="size">"size">12345</td></tr>
<tr><td><a href="/d/readme.txt">readme.txt</a></td><td>"size">9</td></tr>
</main>
<a>late.zip</a>"size">5<
</html>"#;
        let roms = scrape_index(html).unwrap();
        assert_eq!(roms.len(), 1);
        assert_eq!(roms["pacman.zip"], 12345);
    }

    #[test]
    fn parses_metadata_sizes_as_text_or_number() {
        let body = br#"{"files": [
            {"name": "a.zip", "format": "ZIP", "md5": " 0123 ", "size": "10"},
            {"name": "b.zip", "format": "zip", "md5": "4567", "size": 20},
            {"name": "item_meta.xml", "format": "Metadata"}
        ]}"#;
        let files = parse_metadata(body).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].size, Some(10));
        assert_eq!(files[0].md5.as_deref(), Some("0123"));
        assert_eq!(files[1].size, Some(20));
        assert!(files[0].is_zip() && files[1].is_zip());
        assert!(!files[2].is_zip());
    }
}
