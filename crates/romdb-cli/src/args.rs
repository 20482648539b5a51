use std::path::PathBuf;

use clap::{Parser, Subcommand};
use romdb_core::config::MAX_ARCHIVE_SIZE;
use romdb_core::database::DEFAULT_DB_ID;

#[derive(Parser, Debug, Clone)]
#[command(name = "romdb", version, about = "Arcade ROM database builder")]
pub struct Cli {
    /// Emit the run summary as compact JSON and disable colored logs.
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging, including every transport request.
    #[arg(long, global = true, env = "VERBOSE")]
    pub verbose: bool,

    /// Extra transport security flags in curl syntax: `--cacert <pem>`, `--insecure`.
    #[arg(long, global = true, env = "CURL_SECURE", allow_hyphen_values = true)]
    pub curl_secure: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the database from descriptor bundles and reference tables.
    Build {
        /// Descriptor sources, `{url: member pattern}`: inline JSON or a file path.
        #[arg(long, env = "MRA_SOURCES", default_value = "arcade_mra_sources.json")]
        sources: String,

        /// Directory of `{flavor}_{version}.json` reference tables.
        #[arg(long, env = "HASH_DBS_DIR", default_value = "hash_dbs")]
        hash_dbs: PathBuf,

        /// Download base URLs, `{flavor: {version: url}}`: inline JSON or a file path.
        #[arg(long, env = "BASE_URLS", default_value = "base_urls.json")]
        base_urls: String,

        /// Output stem; `.json` and `.json.zip` are appended.
        #[arg(long, env = "DB_OUTPUT", default_value = DEFAULT_DB_ID)]
        output: PathBuf,

        #[arg(long, env = "DB_ID", default_value = DEFAULT_DB_ID)]
        db_id: String,

        /// Where descriptor bundles are extracted (default: a temp dir).
        #[arg(long, env = "WORK_DIR")]
        work_dir: Option<PathBuf>,

        /// Publish the zipped database to this branch when its content changed.
        #[arg(long, env = "PUBLISH_BRANCH")]
        publish_branch: Option<String>,
    },

    /// Grow a reference table from an archive.org item or download directory.
    Harvest {
        /// archive.org item id, or `https://archive.org/download/<item>/<set>.zip/`.
        #[arg(long, env = "SOURCE")]
        source: String,

        /// Reference table file; read at start, rewritten after every entry.
        #[arg(long, env = "DB_FILE")]
        db_file: PathBuf,

        /// Stop at the next safe point after this many minutes.
        #[arg(long, env = "TIMEOUT_MINUTES")]
        timeout_minutes: Option<i64>,

        /// Archives declared larger than this many bytes are skipped.
        #[arg(long, env = "MAX_ARCHIVE_SIZE", default_value_t = MAX_ARCHIVE_SIZE)]
        max_archive_size: u64,

        /// Pause between failed download attempts.
        #[arg(long, env = "RETRY_PAUSE_SECS", default_value_t = 300)]
        retry_pause_secs: u64,
    },
}
