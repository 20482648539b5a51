//! MRA descriptor field extraction.
//!
//! An MRA ("MiSTer Arcade") descriptor is a small XML document. Only three
//! things matter for the database:
//! - `<mameversion>`: the reference table version the descriptor was written against
//! - `<rom zip="...">`: archive filenames, possibly `|`-separated
//! - `<rbf>`: the core the descriptor launches
//!
//! The document is lowercased before parsing. A malformed document is fatal
//! for the whole run: the caller gets a [`RomDbError::Descriptor`].

use std::collections::BTreeSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use crate::determinism::normalize_text::{normalize_document, normalize_field, split_archive_list};
use crate::errors::{RomDbError, RomDbResult};

const VERSION_TAG: &[u8] = b"mameversion";
const CORE_TAG: &[u8] = b"rbf";
const ROM_TAG: &[u8] = b"rom";
const ZIP_ATTR: &[u8] = b"zip";

/// Fields read from one descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    /// Where the descriptor came from, for diagnostics and ordering.
    pub source: String,
    pub dependency_version: Option<String>,
    pub archive_refs: BTreeSet<String>,
    pub core_id: Option<String>,
}

impl Descriptor {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.dependency_version = Some(version.into());
        self
    }

    pub fn with_archive(mut self, archive_ref: impl Into<String>) -> Self {
        self.archive_refs.insert(archive_ref.into());
        self
    }

    pub fn with_core(mut self, core_id: impl Into<String>) -> Self {
        self.core_id = Some(core_id.into());
        self
    }

    fn read_rom(&mut self, e: &BytesStart<'_>) -> RomDbResult<()> {
        for attr in e.attributes() {
            let attr = attr.map_err(|err| RomDbError::descriptor(&self.source, err.to_string()))?;
            if attr.key.as_ref() != ZIP_ATTR {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_err(|err| RomDbError::descriptor(&self.source, err.to_string()))?;
            self.archive_refs.extend(split_archive_list(&value));
        }
        Ok(())
    }
}

/// Which single-valued field a text node belongs to.
#[derive(Debug, Clone, Copy)]
enum Field {
    Version,
    Core,
}

impl Field {
    fn of_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            VERSION_TAG => Some(Self::Version),
            CORE_TAG => Some(Self::Core),
            _ => None,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Self::Version => "mameversion",
            Self::Core => "rbf",
        }
    }
}

fn set_first(slot: &mut Option<String>, field: Field, source: &str, text: &str) {
    let Some(value) = normalize_field(text) else {
        return;
    };
    match slot {
        Some(prior) => warn!(
            source,
            field = field.tag(),
            first = %prior,
            later = %value,
            "duplicated field in descriptor, keeping the first value"
        ),
        None => *slot = Some(value),
    }
}

/// Parse one descriptor document.
pub fn extract(source: &str, bytes: &[u8]) -> RomDbResult<Descriptor> {
    let text = normalize_document(bytes);
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);

    let mut out = Descriptor::new(source);
    let mut open: Vec<Vec<u8>> = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => {
                return Err(RomDbError::descriptor(
                    source,
                    format!("at byte {}: {e}", reader.buffer_position()),
                ))
            }
        };

        match event {
            Event::Start(e) => {
                if e.name().as_ref() == ROM_TAG {
                    out.read_rom(&e)?;
                }
                open.push(e.name().as_ref().to_vec());
            }
            Event::Empty(e) => {
                if e.name().as_ref() == ROM_TAG {
                    out.read_rom(&e)?;
                }
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Text(e) => {
                let Some(field) = open.last().and_then(|tag| Field::of_tag(tag)) else {
                    continue;
                };
                let value = e
                    .unescape()
                    .map_err(|err| RomDbError::descriptor(source, err.to_string()))?;
                match field {
                    Field::Version => set_first(&mut out.dependency_version, field, source, &value),
                    Field::Core => set_first(&mut out.core_id, field, source, &value),
                }
            }
            Event::CData(e) => {
                let Some(field) = open.last().and_then(|tag| Field::of_tag(tag)) else {
                    continue;
                };
                let value = String::from_utf8_lossy(&e).into_owned();
                match field {
                    Field::Version => set_first(&mut out.dependency_version, field, source, &value),
                    Field::Core => set_first(&mut out.core_id, field, source, &value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(tag) = open.last() {
        return Err(RomDbError::descriptor(
            source,
            format!("unclosed element <{}>", String::from_utf8_lossy(tag)),
        ));
    }

    Ok(out)
}
