use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use romdb_core::config::{validate_harvest_config, HarvestConfig};
use romdb_core::determinism::hashing::md5_reader_hex;
use romdb_core::harvest::cancel::CancelToken;
use romdb_core::harvest::intake::{parse_metadata, scrape_index, HarvestSource};
use romdb_core::harvest::retry::{RetryPolicy, Sleeper};
use romdb_core::harvest::{check_size, harvest_downloads, harvest_metadata, ArchiveProbe, HarvestReport};
use romdb_core::model::HashRecord;
use romdb_core::RomDbResult;
use romdb_store::archive::verify_zip;
use romdb_store::ProgressFile;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::io::transport::{HttpTransport, Transport, TransportOptions};
use crate::output;
use crate::shutdown;

const DOWNLOAD_FILE: &str = "archive.zip";

pub struct HarvestArgs {
    pub source: String,
    pub db_file: PathBuf,
    pub timeout_minutes: Option<i64>,
    pub max_archive_size: u64,
    pub retry_pause_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct HarvestOut {
    pub source: String,
    pub db_file: String,
    pub entries: usize,
    pub report: HarvestReport,
}

/// Downloads one archive to a scratch file, then checks size and zip
/// integrity before hashing it.
pub struct DownloadProbe<'a, T> {
    transport: &'a T,
    base_url: String,
    scratch: PathBuf,
}

impl<'a, T: Transport> DownloadProbe<'a, T> {
    pub fn new(transport: &'a T, base_url: impl Into<String>, scratch: PathBuf) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            scratch,
        }
    }
}

impl<T: Transport> ArchiveProbe for DownloadProbe<'_, T> {
    async fn probe(&self, name: &str, expected_size: u64) -> RomDbResult<HashRecord> {
        let url = format!("{}{}", self.base_url, name);
        info!(archive = name, %url, "downloading");
        let written = self.transport.download_to(&url, &self.scratch).await?;
        check_size(name, expected_size, written)?;
        verify_zip(&self.scratch)?;
        let (md5, size) = md5_reader_hex(File::open(&self.scratch)?)?;
        Ok(HashRecord::new(md5, size))
    }
}

/// Timer-backed pause that ends early on a shutdown request or once the
/// token's deadline passes.
pub struct TokioSleeper {
    cancel: CancelToken,
    wake: Arc<Notify>,
}

impl TokioSleeper {
    pub fn new(cancel: CancelToken, wake: Arc<Notify>) -> Self {
        Self { cancel, wake }
    }
}

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        let limit = match self.cancel.deadline() {
            Some(deadline) => Duration::try_from(deadline - OffsetDateTime::now_utc())
                .unwrap_or(Duration::ZERO)
                .min(duration),
            None => duration,
        };
        tokio::select! {
            _ = tokio::time::sleep(limit) => {}
            _ = self.wake.notified() => debug!("pause interrupted"),
        }
    }
}

pub async fn run(transport: &TransportOptions, args: HarvestArgs) -> Result<()> {
    let cfg = HarvestConfig {
        max_archive_size: args.max_archive_size,
        retry: RetryPolicy {
            pause: Duration::from_secs(args.retry_pause_secs),
            ..RetryPolicy::default()
        },
        ..HarvestConfig::default()
    };
    validate_harvest_config(&cfg)?;

    let source = HarvestSource::classify(&args.source)?;
    let cancel = match args.timeout_minutes {
        Some(minutes) => CancelToken::with_timeout_minutes(minutes),
        None => CancelToken::new(),
    };
    if let Some(deadline) = cancel.deadline() {
        info!(%deadline, "harvest deadline");
    }
    let sleeper = TokioSleeper::new(cancel.clone(), shutdown::install(&cancel)?);

    let mut progress = ProgressFile::new(&args.db_file);
    let mut table = progress.load()?;
    let http = HttpTransport::new(transport)?;

    let listing_url = source.listing_url();
    info!(url = %listing_url, "querying listing");
    let listing = http
        .fetch_bytes(&listing_url)
        .await
        .with_context(|| format!("failed to query {listing_url}"))?;

    let report = match &source {
        HarvestSource::Index { url } => {
            let candidates = scrape_index(&String::from_utf8_lossy(&listing))?;
            info!(count = candidates.len(), "archives listed");
            let scratch = tempfile::tempdir()?;
            let probe = DownloadProbe::new(&http, url.as_str(), scratch.path().join(DOWNLOAD_FILE));
            harvest_downloads(
                &candidates,
                &mut table,
                &probe,
                &mut progress,
                &cfg,
                &sleeper,
                &cancel,
            )
            .await?
        }
        HarvestSource::Metadata { .. } => {
            let files = parse_metadata(&listing)?;
            info!(count = files.len(), "files listed");
            harvest_metadata(&files, &mut table, &mut progress, &cfg, &cancel)?
        }
    };

    output::print(&HarvestOut {
        source: args.source,
        db_file: args.db_file.display().to_string(),
        entries: table.len(),
        report,
    })?;
    Ok(())
}
