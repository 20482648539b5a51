use anyhow::Result;

use crate::args::{Cli, Command};
use crate::io::transport::TransportOptions;

mod build;
mod harvest;
mod publish;

pub async fn dispatch(cli: Cli) -> Result<()> {
    let transport = TransportOptions::parse(cli.curl_secure.as_deref())?;
    match cli.command {
        Command::Build {
            sources,
            hash_dbs,
            base_urls,
            output,
            db_id,
            work_dir,
            publish_branch,
        } => {
            build::run(
                &transport,
                build::BuildArgs {
                    sources,
                    hash_dbs,
                    base_urls,
                    output,
                    db_id,
                    work_dir,
                    publish_branch,
                },
            )
            .await
        }
        Command::Harvest {
            source,
            db_file,
            timeout_minutes,
            max_archive_size,
            retry_pause_secs,
        } => {
            harvest::run(
                &transport,
                harvest::HarvestArgs {
                    source,
                    db_file,
                    timeout_minutes,
                    max_archive_size,
                    retry_pause_secs,
                },
            )
            .await
        }
    }
}
