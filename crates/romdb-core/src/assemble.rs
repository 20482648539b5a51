//! Manifest assembly.
//!
//! Walks descriptors in normalized-name order and turns every archive they
//! reference into a manifest entry:
//!
//! 1. excluded archive names are dropped silently
//! 2. the flavor comes from the reference path (`hbmame/` segment or not)
//! 3. the destination is the flavor folder plus the archive's base name
//! 4. a destination already claimed by an earlier descriptor is kept as is
//! 5. the reference table is resolved from the descriptor's declared version
//! 6. archives missing from the resolved table are skipped
//! 7. tags: flavor, `arcade`, and the descriptor's core tag when it has one
//! 8. the entry's URL is the base URL of the effective version plus the name
//!
//! Only configuration problems (missing default table, missing base URL) are
//! errors. Everything else is logged and skipped.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::descriptor::Descriptor;
use crate::determinism::normalize_text::base_name;
use crate::determinism::stable_sort::sort_by_normalized_name;
use crate::errors::RomDbResult;
use crate::model::{Manifest, ManifestEntry};
use crate::reference::{BaseUrls, TableSource, VersionResolver};
use crate::tags::{core_tag_name, TagDictionary};
use crate::version::Flavor;

/// Counters describing one assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub descriptors: usize,
    pub entries: usize,
    pub excluded: usize,
    pub conflicts: usize,
    pub missing: usize,
}

/// Accumulates manifest entries one descriptor at a time.
///
/// Callers must feed descriptors in normalized-name order; [`assemble`] does
/// the sorting for a whole batch.
pub struct Assembler<'a, S> {
    resolver: &'a mut VersionResolver<S>,
    base_urls: &'a BaseUrls,
    tags: &'a mut TagDictionary,
    excluded: BTreeSet<String>,
    files: Manifest,
    report: AssemblyReport,
}

impl<'a, S: TableSource> Assembler<'a, S> {
    pub fn new(
        resolver: &'a mut VersionResolver<S>,
        base_urls: &'a BaseUrls,
        tags: &'a mut TagDictionary,
        excluded: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            resolver,
            base_urls,
            tags,
            excluded: excluded.into_iter().collect(),
            files: Manifest::new(),
            report: AssemblyReport::default(),
        }
    }

    /// Add every archive referenced by one descriptor.
    pub fn add(&mut self, descriptor: &Descriptor) -> RomDbResult<()> {
        self.report.descriptors += 1;
        let source = descriptor.source.as_str();

        for archive_ref in &descriptor.archive_refs {
            let name = base_name(archive_ref);
            if self.excluded.contains(name) {
                self.report.excluded += 1;
                continue;
            }

            let flavor = Flavor::of_archive_ref(archive_ref);
            let destination = flavor.destination(name);
            if self.files.contains_key(&destination) {
                warn!(%destination, source, "destination already claimed, skipping");
                self.report.conflicts += 1;
                continue;
            }

            let resolved =
                self.resolver
                    .resolve(descriptor.dependency_version.as_deref(), flavor, source)?;
            let Some(record) = resolved.table.get(name) else {
                info!(
                    archive = name,
                    version = %resolved.effective_version,
                    %flavor,
                    source,
                    "archive not in reference table, skipping"
                );
                self.report.missing += 1;
                continue;
            };

            let mut tags = vec![self.tags.flavor_tag(flavor), self.tags.arcade_tag()];
            if let Some(core) = &descriptor.core_id {
                tags.push(self.tags.intern(&core_tag_name(core)));
            }

            let base = self.base_urls.url_for(flavor, &resolved.effective_version)?;
            let entry = ManifestEntry {
                hash: record.md5.clone(),
                size: record.size,
                url: format!("{base}{name}"),
                tags,
            };
            self.files.insert(destination, entry);
            self.report.entries += 1;
        }
        Ok(())
    }

    pub fn finish(self) -> (Manifest, AssemblyReport) {
        (self.files, self.report)
    }
}

/// Sort a batch of descriptors and assemble them into one manifest.
pub fn assemble<S: TableSource>(
    mut descriptors: Vec<Descriptor>,
    resolver: &mut VersionResolver<S>,
    base_urls: &BaseUrls,
    tags: &mut TagDictionary,
    excluded: &[String],
) -> RomDbResult<(Manifest, AssemblyReport)> {
    sort_by_normalized_name(&mut descriptors, |d| d.source.as_str());
    let mut assembler = Assembler::new(resolver, base_urls, tags, excluded.iter().cloned());
    for d in &descriptors {
        assembler.add(d)?;
    }
    Ok(assembler.finish())
}
