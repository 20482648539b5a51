//! Reference table harvesting.
//!
//! The harvester grows a reference table for one archive.org source. It
//! persists the whole table after every resolved entry, so an abrupt stop
//! loses at most the entry in flight, and it stops cleanly at safe points
//! when the [`CancelToken`] ends the run.
//!
//! I/O is supplied by the host:
//! - an [`ArchiveProbe`] downloads, verifies, and hashes one archive
//! - a [`ProgressSink`] persists the table
//! - a [`Sleeper`] pauses between attempts

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::HarvestConfig;
use crate::errors::{RomDbError, RomDbResult};
use crate::model::{validate, HashRecord, ReferenceTable};

pub mod cancel;
pub mod intake;
pub mod retry;

use cancel::CancelToken;
use intake::MetadataFile;
use retry::{RetryOutcome, Sleeper};

/// Download, verify, and hash one archive.
#[allow(async_fn_in_trait)]
pub trait ArchiveProbe {
    async fn probe(&self, name: &str, expected_size: u64) -> RomDbResult<HashRecord>;
}

/// Persist the accumulated table.
pub trait ProgressSink {
    fn save(&mut self, table: &ReferenceTable) -> RomDbResult<()>;
}

/// Counters describing one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    pub candidates: usize,
    pub resolved: usize,
    pub already_known: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Fail unless a downloaded archive has the size the listing declared.
pub fn check_size(name: &str, expected: u64, actual: u64) -> RomDbResult<()> {
    if expected != actual {
        return Err(RomDbError::SizeMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn record<K: ProgressSink>(
    sink: &mut K,
    table: &mut ReferenceTable,
    name: &str,
    entry: HashRecord,
) -> RomDbResult<()> {
    info!(archive = name, md5 = %entry.md5, size = entry.size, "resolved");
    table.insert(name.to_string(), entry);
    sink.save(table)
}

/// Resolve every unknown archive of an index listing by downloading it.
pub async fn harvest_downloads<P, K, S>(
    candidates: &BTreeMap<String, u64>,
    table: &mut ReferenceTable,
    probe: &P,
    sink: &mut K,
    cfg: &HarvestConfig,
    sleeper: &S,
    cancel: &CancelToken,
) -> RomDbResult<HarvestReport>
where
    P: ArchiveProbe,
    K: ProgressSink,
    S: Sleeper,
{
    let mut report = HarvestReport {
        candidates: candidates.len(),
        ..HarvestReport::default()
    };

    for (name, expected_size) in candidates {
        if table.contains_key(name) {
            report.already_known += 1;
            continue;
        }

        let outcome = cfg
            .retry
            .run(name, cancel, sleeper, |_| probe.probe(name, *expected_size))
            .await?;
        match outcome {
            RetryOutcome::Done(entry) => {
                record(sink, table, name, entry)?;
                report.resolved += 1;
            }
            RetryOutcome::Cancelled => {
                report.cancelled = true;
                return Ok(report);
            }
        }

        if cancel.should_end() {
            report.cancelled = true;
            return Ok(report);
        }
    }
    Ok(report)
}

/// Record declared hashes from a metadata listing.
pub fn harvest_metadata<K: ProgressSink>(
    files: &[MetadataFile],
    table: &mut ReferenceTable,
    sink: &mut K,
    cfg: &HarvestConfig,
    cancel: &CancelToken,
) -> RomDbResult<HarvestReport> {
    let mut report = HarvestReport::default();

    for file in files.iter().filter(|f| f.is_zip()) {
        report.candidates += 1;
        if table.contains_key(&file.name) {
            report.already_known += 1;
            continue;
        }
        if cfg.is_skipped(&file.name) {
            info!(archive = %file.name, "on skip list, skipping");
            report.skipped += 1;
            continue;
        }

        let (Some(md5), Some(size)) = (&file.md5, file.size) else {
            warn!(archive = %file.name, "listing has no md5 or size, skipping");
            report.skipped += 1;
            continue;
        };
        if size > cfg.max_archive_size {
            info!(archive = %file.name, size, limit = cfg.max_archive_size, "too large, skipping");
            report.skipped += 1;
            continue;
        }

        let entry = HashRecord::new(md5.clone(), size);
        if let Err(e) = validate::hash_record(&file.name, &entry) {
            warn!(error = %e, "listing has a malformed md5, skipping");
            report.skipped += 1;
            continue;
        }
        record(sink, table, &file.name, entry)?;
        report.resolved += 1;

        if cancel.should_end() {
            report.cancelled = true;
            return Ok(report);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::retry::testing::FakeClock;
    use super::*;
    use assert_matches::assert_matches;
    use futures::executor::block_on;

    const MD5: &str = "0123456789abcdef0123456789abcdef";

    #[derive(Default)]
    struct Snapshots(Vec<ReferenceTable>);

    impl ProgressSink for Snapshots {
        fn save(&mut self, table: &ReferenceTable) -> RomDbResult<()> {
            self.0.push(table.clone());
            Ok(())
        }
    }

    /// Serves archives of a fixed size, counting attempts per name.
    struct FixedSizeProbe {
        actual_size: u64,
        attempts: RefCell<BTreeMap<String, u32>>,
    }

    impl ArchiveProbe for FixedSizeProbe {
        async fn probe(&self, name: &str, expected_size: u64) -> RomDbResult<HashRecord> {
            *self.attempts.borrow_mut().entry(name.to_string()).or_default() += 1;
            check_size(name, expected_size, self.actual_size)?;
            Ok(HashRecord::new(MD5, self.actual_size))
        }
    }

    fn probe(actual_size: u64) -> FixedSizeProbe {
        FixedSizeProbe {
            actual_size,
            attempts: RefCell::new(BTreeMap::new()),
        }
    }

    #[test]
    fn size_mismatch_retries_then_aborts_without_recording() {
        let candidates = BTreeMap::from([("foo.zip".to_string(), 500u64)]);
        let mut table = ReferenceTable::new();
        let mut sink = Snapshots::default();
        let p = probe(400);
        let clock = FakeClock::default();
        let err = block_on(harvest_downloads(
            &candidates,
            &mut table,
            &p,
            &mut sink,
            &HarvestConfig::default(),
            &clock,
            &CancelToken::new(),
        ))
        .unwrap_err();
        assert_matches!(err, RomDbError::RetriesExhausted { ref name, attempts: 3 } if name == "foo.zip");
        assert_eq!(p.attempts.borrow()["foo.zip"], 3);
        assert!(table.is_empty());
        assert!(sink.0.is_empty());
    }

    #[test]
    fn persists_after_every_entry_and_skips_known() {
        let candidates = BTreeMap::from([
            ("a.zip".to_string(), 10u64),
            ("b.zip".to_string(), 10u64),
            ("c.zip".to_string(), 10u64),
        ]);
        let mut table = ReferenceTable::from([("b.zip".to_string(), HashRecord::new(MD5, 10))]);
        let mut sink = Snapshots::default();
        let p = probe(10);
        let report = block_on(harvest_downloads(
            &candidates,
            &mut table,
            &p,
            &mut sink,
            &HarvestConfig::default(),
            &FakeClock::default(),
            &CancelToken::new(),
        ))
        .unwrap();
        assert_eq!(report.resolved, 2);
        assert_eq!(report.already_known, 1);
        assert_eq!(sink.0.len(), 2);
        assert_eq!(sink.0[0].len(), 2);
        assert_eq!(sink.0[1].len(), 3);
        assert!(!p.attempts.borrow().contains_key("b.zip"));
    }

    #[test]
    fn stops_after_current_entry_when_cancelled() {
        struct CancelOnFirst {
            token: CancelToken,
            calls: Cell<u32>,
        }
        impl ArchiveProbe for CancelOnFirst {
            async fn probe(&self, _name: &str, expected_size: u64) -> RomDbResult<HashRecord> {
                self.calls.set(self.calls.get() + 1);
                self.token.cancel();
                Ok(HashRecord::new(MD5, expected_size))
            }
        }

        let token = CancelToken::new();
        let p = CancelOnFirst {
            token: token.clone(),
            calls: Cell::new(0),
        };
        let candidates = BTreeMap::from([("a.zip".to_string(), 1u64), ("b.zip".to_string(), 2u64)]);
        let mut table = ReferenceTable::new();
        let mut sink = Snapshots::default();
        let report = block_on(harvest_downloads(
            &candidates,
            &mut table,
            &p,
            &mut sink,
            &HarvestConfig::default(),
            &FakeClock::default(),
            &token,
        ))
        .unwrap();
        assert!(report.cancelled);
        assert_eq!(p.calls.get(), 1);
        assert_eq!(table.len(), 1);
        assert_eq!(sink.0.len(), 1);
    }

    fn meta(name: &str, format: &str, md5: Option<&str>, size: Option<u64>) -> MetadataFile {
        MetadataFile {
            name: name.to_string(),
            format: format.to_string(),
            md5: md5.map(str::to_string),
            size,
        }
    }

    #[test]
    fn metadata_filters_formats_known_skipped_and_oversized() {
        let files = vec![
            meta("a.zip", "ZIP", Some(MD5), Some(10)),
            meta("notes.txt", "Text", Some(MD5), Some(1)),
            meta("known.zip", "zip", Some(MD5), Some(1)),
            meta("hapyfsh2.zip", "zip", Some(MD5), Some(1)),
            meta("huge.zip", "zip", Some(MD5), Some(u64::MAX)),
            meta("nohash.zip", "zip", None, Some(1)),
        ];
        let mut table = ReferenceTable::from([("known.zip".to_string(), HashRecord::new(MD5, 1))]);
        let mut sink = Snapshots::default();
        let report = harvest_metadata(
            &files,
            &mut table,
            &mut sink,
            &HarvestConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(report.candidates, 5);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.already_known, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(table["a.zip"], HashRecord::new(MD5, 10));
        assert_eq!(sink.0.len(), 1);
    }

    #[test]
    fn check_size_reports_both_sizes() {
        let e = check_size("foo.zip", 500, 400).unwrap_err();
        assert_eq!(e.to_string(), "size mismatch for foo.zip: expected 500 bytes, got 400");
    }
}
