use anyhow::Result;
use romdb_core::database::Database;
use romdb_store::archive::read_single_json;
use romdb_store::WrittenDatabase;
use serde::Serialize;
use tracing::{info, warn};

use crate::io::git::VersionControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    Unchanged,
    Published,
}

/// Publish the zipped database to `branch` unless the branch already holds
/// the same content. Any git failure aborts the run.
pub async fn sync<V: VersionControl>(
    vc: &V,
    db: &Database,
    branch: &str,
    written: &WrittenDatabase,
) -> Result<PublishOutcome> {
    vc.fetch().await?;
    let zip_name = written.zip_name()?;

    let changed = match vc.read_file(branch, &zip_name).await? {
        None => {
            info!(branch, "no previously published database");
            true
        }
        Some(bytes) => match read_single_json(&bytes) {
            Ok(prior) => !db.same_content_as(&prior)?,
            Err(e) => {
                warn!(branch, error = %e, "published database is unreadable, replacing it");
                true
            }
        },
    };

    if !changed {
        info!(branch, "database unchanged, nothing to publish");
        return Ok(PublishOutcome::Unchanged);
    }

    let message = format!("{} {}", db.db_id, db.timestamp);
    vc.replace_branch(branch, &written.zip, &zip_name, &message).await?;
    info!(branch, file = %zip_name, "database published");
    Ok(PublishOutcome::Published)
}
