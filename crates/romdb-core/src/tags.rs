//! Tag dictionary.
//!
//! Tags are dense integers attached to files and folders of the published
//! database; the dictionary maps their names to ids. It is seeded with the
//! structural tags and grows whenever a descriptor names a core not seen
//! before. Ids are never reassigned or removed.

use std::collections::BTreeMap;

use crate::version::Flavor;

pub const MAME_TAG: &str = "mame";
pub const HBMAME_TAG: &str = "hbmame";
pub const ARCADE_TAG: &str = "arcade";

const MAME_TAG_ID: u32 = 0;
const HBMAME_TAG_ID: u32 = 1;
const ARCADE_TAG_ID: u32 = 2;

/// Core ids of this family are used as tag names verbatim.
const VERBATIM_CORE_PREFIX: &str = "jt";
/// Prefix for every other core's tag name.
const CORE_TAG_PREFIX: &str = "arcade-";

/// Append-only name -> id registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDictionary {
    ids: BTreeMap<String, u32>,
    next: u32,
}

impl Default for TagDictionary {
    fn default() -> Self {
        Self::seeded()
    }
}

impl TagDictionary {
    /// Dictionary holding the structural tags: `mame=0`, `hbmame=1`, `arcade=2`.
    pub fn seeded() -> Self {
        let mut dict = Self {
            ids: BTreeMap::new(),
            next: 0,
        };
        dict.intern(MAME_TAG);
        dict.intern(HBMAME_TAG);
        dict.intern(ARCADE_TAG);
        dict
    }

    /// Id for `name`, allocating the next unused id on first sight.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.next;
        self.ids.insert(name.to_string(), id);
        self.next += 1;
        id
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    pub fn flavor_tag(&self, flavor: Flavor) -> u32 {
        match flavor {
            Flavor::Mame => MAME_TAG_ID,
            Flavor::Hbmame => HBMAME_TAG_ID,
        }
    }

    pub fn arcade_tag(&self) -> u32 {
        ARCADE_TAG_ID
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, u32> {
        &self.ids
    }
}

/// Tag name for a descriptor's core id.
pub fn core_tag_name(core_id: &str) -> String {
    if core_id.starts_with(VERBATIM_CORE_PREFIX) {
        core_id.to_string()
    } else {
        format!("{CORE_TAG_PREFIX}{core_id}")
    }
}
