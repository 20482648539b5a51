use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use romdb_core::assemble::{assemble, AssemblyReport};
use romdb_core::config::{validate_build_config, BuildConfig};
use romdb_core::database::Database;
use romdb_core::descriptor::{extract, Descriptor};
use romdb_core::reference::{BaseUrls, VersionResolver};
use romdb_core::tags::TagDictionary;
use romdb_store::archive::extract_members;
use romdb_store::{find_descriptors, write_database, FsTableSource};
use serde::Serialize;
use tempfile::TempDir;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::cmd::publish::{self, PublishOutcome};
use crate::io::git::GitCli;
use crate::io::read_json_arg;
use crate::io::transport::{HttpTransport, Transport, TransportOptions};
use crate::output;

pub struct BuildArgs {
    pub sources: String,
    pub hash_dbs: PathBuf,
    pub base_urls: String,
    pub output: PathBuf,
    pub db_id: String,
    pub work_dir: Option<PathBuf>,
    pub publish_branch: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BuildOut {
    pub db_id: String,
    pub sources: usize,
    pub assembly: AssemblyReport,
    pub tables_read: usize,
    pub tags: usize,
    pub json: String,
    pub zip: String,
    pub publish: Option<PublishOutcome>,
}

/// Extraction directory: the user's, or a temp dir removed on drop. A kept
/// directory is cleared of descriptors from earlier runs before use.
enum WorkDir {
    Kept(PathBuf),
    Temp(TempDir),
}

impl WorkDir {
    fn open(dir: Option<PathBuf>) -> Result<Self> {
        match dir {
            Some(d) => {
                fs::create_dir_all(&d)
                    .with_context(|| format!("failed to create {}", d.display()))?;
                let stale = find_descriptors(&d)?;
                for path in &stale {
                    fs::remove_file(path)
                        .with_context(|| format!("failed to remove {}", path.display()))?;
                }
                if !stale.is_empty() {
                    info!(dir = %d.display(), removed = stale.len(), "cleared descriptors from a previous run");
                }
                Ok(Self::Kept(d))
            }
            None => Ok(Self::Temp(tempfile::tempdir()?)),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Kept(p) => p,
            Self::Temp(t) => t.path(),
        }
    }
}

fn read_descriptors(root: &Path) -> Result<Vec<Descriptor>> {
    let mut out = Vec::new();
    for path in find_descriptors(root)? {
        let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let source = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        out.push(extract(&source, &bytes)?);
    }
    Ok(out)
}

pub async fn run(transport: &TransportOptions, args: BuildArgs) -> Result<()> {
    let cfg = BuildConfig {
        db_id: args.db_id,
        ..BuildConfig::default()
    };
    validate_build_config(&cfg)?;

    let sources: BTreeMap<String, String> = serde_json::from_slice(&read_json_arg(&args.sources)?)
        .context("descriptor sources must be a JSON object of {url: member pattern}")?;
    let base_urls = BaseUrls::from_json(&read_json_arg(&args.base_urls)?)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    let work = WorkDir::open(args.work_dir)?;
    let http = HttpTransport::new(transport)?;
    for (location, pattern) in &sources {
        pb.set_message(format!("downloading {location}"));
        info!(source = %location, pattern = %pattern, "downloading descriptor bundle");
        let bytes = http
            .fetch_bytes(location)
            .await
            .with_context(|| format!("failed to download {location}"))?;
        let n = extract_members(&bytes, pattern, work.path())
            .with_context(|| format!("failed to extract {pattern} from {location}"))?;
        info!(source = %location, files = n, "extracted");
    }

    pb.set_message("reading descriptors");
    let descriptors = read_descriptors(work.path())?;
    info!(count = descriptors.len(), "descriptors found");

    pb.set_message("assembling");
    let tables = FsTableSource::new(&args.hash_dbs);
    debug!(available = ?tables.available().unwrap_or_default(), "reference tables");
    let mut resolver = VersionResolver::new(tables);
    let mut tags = TagDictionary::seeded();
    let (files, assembly) = assemble(
        descriptors,
        &mut resolver,
        &base_urls,
        &mut tags,
        &cfg.excluded_archives,
    )?;
    let db = Database::new(
        cfg.db_id.as_str(),
        files,
        &tags,
        OffsetDateTime::now_utc().unix_timestamp(),
    );

    pb.set_message("writing database");
    let written = write_database(&db, &args.output)?;

    let publish = match &args.publish_branch {
        Some(branch) => {
            pb.set_message(format!("publishing to {branch}"));
            let git = GitCli::new(std::env::current_dir()?);
            Some(publish::sync(&git, &db, branch, &written).await?)
        }
        None => None,
    };
    pb.finish_and_clear();

    output::print(&BuildOut {
        db_id: db.db_id.clone(),
        sources: sources.len(),
        assembly,
        tables_read: resolver.loader().source_reads(),
        tags: tags.len(),
        json: written.json.display().to_string(),
        zip: written.zip.display().to_string(),
        publish,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_sources_are_relative_to_the_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let arcade = dir.path().join("_Arcade");
        fs::create_dir_all(&arcade).unwrap();
        fs::write(arcade.join("B.mra"), br#"<misterromdescription><rom zip="b.zip"/></misterromdescription>"#).unwrap();
        fs::write(arcade.join("a.mra"), br#"<misterromdescription><rom zip="a.zip"/></misterromdescription>"#).unwrap();

        let ds = read_descriptors(dir.path()).unwrap();
        let sources: Vec<String> = ds.iter().map(|d| d.source.clone()).collect();
        let expected: Vec<String> = ["a.mra", "B.mra"]
            .iter()
            .map(|n| Path::new("_Arcade").join(n).display().to_string())
            .collect();
        assert_eq!(sources, expected);
        assert!(ds[0].archive_refs.contains("a.zip"));
    }

    #[test]
    fn kept_work_dir_drops_previous_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("_Arcade");
        fs::create_dir_all(&old).unwrap();
        fs::write(old.join("stale.mra"), b"<misterromdescription/>").unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

        let work = WorkDir::open(Some(dir.path().to_path_buf())).unwrap();
        assert!(read_descriptors(work.path()).unwrap().is_empty());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn malformed_descriptor_fails_the_build() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.mra"), b"<misterromdescription><rom zip='a.zip'>").unwrap();
        assert!(read_descriptors(dir.path()).is_err());
    }
}
