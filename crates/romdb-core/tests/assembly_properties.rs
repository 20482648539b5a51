//! assembly_properties.rs
//!
//! End-to-end checks of the build path through the public API:
//! descriptor text in, database document out.

use proptest::prelude::*;
use romdb_core::prelude::*;
use romdb_core::reference::MemoryTables;

const MD5_A: &str = "0123456789abcdef0123456789abcdef";
const MD5_B: &str = "fedcba9876543210fedcba9876543210";

fn tables() -> MemoryTables {
    let mame_0217 = ReferenceTable::from([
        ("pacman.zip".to_string(), HashRecord::new(MD5_A, 100)),
        ("galaga.zip".to_string(), HashRecord::new(MD5_B, 200)),
        ("namco.zip".to_string(), HashRecord::new(MD5_A, 50)),
    ]);
    let mame_0229 = ReferenceTable::from([("galaga.zip".to_string(), HashRecord::new(MD5_A, 229))]);
    let hbmame_0220 = ReferenceTable::from([("pacman.zip".to_string(), HashRecord::new(MD5_B, 300))]);
    MemoryTables::new()
        .with(ReferenceKey::new(Flavor::Mame, "0217"), mame_0217)
        .with(ReferenceKey::new(Flavor::Mame, "0229"), mame_0229)
        .with(ReferenceKey::new(Flavor::Hbmame, "0220"), hbmame_0220)
}

fn base_urls() -> BaseUrls {
    BaseUrls::new()
        .with(Flavor::Mame, "0217", "https://mirror/0217/")
        .with(Flavor::Mame, "0229", "https://mirror/0229/")
        .with(Flavor::Hbmame, "0220", "https://mirror/hb0220/")
}

fn build(descriptors: Vec<Descriptor>) -> (Manifest, TagDictionary) {
    let mut resolver = VersionResolver::new(tables());
    let mut tags = TagDictionary::seeded();
    let (files, _) = assemble(
        descriptors,
        &mut resolver,
        &base_urls(),
        &mut tags,
        &BuildConfig::default().excluded_archives,
    )
    .unwrap();
    (files, tags)
}

#[test]
fn descriptor_text_to_database() {
    let pacman = br#"<misterromdescription>
    <name>Pac-Man</name>
    <mameversion>0223</mameversion>
    <rbf>Pacman</rbf>
    <rom index="0" zip="pacman.zip|namco.zip|jtbeta.zip" md5="none"/>
</misterromdescription>"#;
    let galaga = br#"<misterromdescription>
    <mameversion>0229</mameversion>
    <rbf>jtgalaga</rbf>
    <rom index="0" zip="galaga.zip"/>
    <rom index="1" zip="hbmame/pacman.zip"/>
</misterromdescription>"#;

    let descriptors = vec![
        extract("_Arcade/Pac-Man.mra", pacman).unwrap(),
        extract("_Arcade/Galaga.mra", galaga).unwrap(),
    ];
    let (files, tags) = build(descriptors);

    // 0223 has no table, so pacman.zip and namco.zip come from 0217. The
    // hbmame reference has no 0229 table and falls back to 0220.
    assert_eq!(files["games/mame/galaga.zip"].url, "https://mirror/0229/galaga.zip");
    assert_eq!(files["games/mame/galaga.zip"].size, 229);
    assert_eq!(files["games/mame/pacman.zip"].url, "https://mirror/0217/pacman.zip");
    assert_eq!(files["games/mame/namco.zip"].hash, MD5_A);
    assert_eq!(files["games/hbmame/pacman.zip"].url, "https://mirror/hb0220/pacman.zip");
    assert!(!files.keys().any(|k| k.ends_with("jtbeta.zip")));

    let jtgalaga = tags.get("jtgalaga").unwrap();
    let pacman_core = tags.get("arcade-pacman").unwrap();
    assert_eq!(files["games/mame/galaga.zip"].tags, vec![0, 2, jtgalaga]);
    assert_eq!(files["games/hbmame/pacman.zip"].tags, vec![1, 2, jtgalaga]);
    assert_eq!(files["games/mame/pacman.zip"].tags, vec![0, 2, pacman_core]);

    let db = Database::new("arcade_roms_db", files, &tags, 1_700_000_000);
    let doc = serde_json::to_value(&db).unwrap();
    assert_eq!(doc["db_id"], "arcade_roms_db");
    assert_eq!(doc["tag_dictionary"]["arcade"], 2);
    assert!(db.same_content_as(&serde_json::to_value(db.normalized()).unwrap()).unwrap());
}

fn descriptor_strategy() -> impl Strategy<Value = Vec<Descriptor>> {
    let archives = prop::sample::subsequence(
        vec!["pacman.zip", "galaga.zip", "namco.zip", "hbmame/pacman.zip", "jtbeta.zip"],
        0..=5,
    );
    let version = prop::option::of(prop::sample::select(vec!["0217", "0229", "0250"]));
    let core = prop::option::of(prop::sample::select(vec!["jtcps1", "pacman", "galaga"]));
    prop::collection::vec((archives, version, core), 1..8).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (archives, version, core))| {
                let mut d = Descriptor::new(format!("_Arcade/game{i:02}.mra"));
                for a in archives {
                    d = d.with_archive(a);
                }
                if let Some(v) = version {
                    d = d.with_version(v);
                }
                if let Some(c) = core {
                    d = d.with_core(c);
                }
                d
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn manifest_ignores_discovery_order(
        (descriptors, shuffled) in descriptor_strategy()
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let (a, _) = build(descriptors);
        let (b, _) = build(shuffled);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn every_entry_points_at_a_known_base_url(descriptors in descriptor_strategy()) {
        let (files, _) = build(descriptors);
        for (path, entry) in &files {
            prop_assert!(path.starts_with("games/mame/") || path.starts_with("games/hbmame/"));
            prop_assert!(entry.url.starts_with("https://mirror/"));
            prop_assert!(entry.url.ends_with(path.rsplit('/').next().unwrap_or_default()));
            prop_assert_eq!(&entry.tags[1..2], &[2u32][..]);
        }
    }

    #[test]
    fn tag_ids_are_append_only(names in prop::collection::vec("[a-z]{1,6}", 0..40)) {
        let mut tags = TagDictionary::seeded();
        let mut seen: Vec<(String, u32)> = Vec::new();
        for name in &names {
            let prior = tags.get(name);
            let next = tags.len() as u32;
            let id = tags.intern(name);
            match prior {
                Some(p) => { prop_assert_eq!(id, p); }
                None => { prop_assert_eq!(id, next); }
            }
            seen.push((name.clone(), id));
        }
        for (name, id) in &seen {
            prop_assert_eq!(tags.get(name), Some(*id));
        }
        prop_assert_eq!(tags.get("mame"), Some(0));
        prop_assert_eq!(tags.get("hbmame"), Some(1));
        prop_assert_eq!(tags.get("arcade"), Some(2));
    }
}
