//! Git operations used when publishing.
//!
//! Publishing builds the commit with plumbing commands (`hash-object`,
//! `mktree`, `commit-tree`) and pushes it by id, so the working copy, its
//! index, and its local branches are left untouched.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const REMOTE: &str = "origin";

#[allow(async_fn_in_trait)]
pub trait VersionControl {
    /// Update remote-tracking branches.
    async fn fetch(&self) -> Result<()>;

    /// Content of `path` on the remote `branch`, or `None` when the branch or
    /// the file does not exist.
    async fn read_file(&self, branch: &str, path: &str) -> Result<Option<Vec<u8>>>;

    /// Point the remote `branch` at a new parentless commit whose tree holds
    /// only `artifact`, stored at the root as `name`.
    async fn replace_branch(&self, branch: &str, artifact: &Path, name: &str, message: &str) -> Result<()>;
}

/// The `git` binary, run inside a working copy.
pub struct GitCli {
    dir: PathBuf,
}

impl GitCli {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn output(&self, args: &[&str], input: Option<&[u8]>) -> Result<std::process::Output> {
        debug!(?args, "git");
        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run `git {}`", args.join(" ")))?;
        if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(bytes).await?;
        }
        child
            .wait_with_output()
            .await
            .with_context(|| format!("failed to wait for `git {}`", args.join(" ")))
    }

    /// Run a command that must succeed; returns its trimmed stdout.
    async fn run(&self, args: &[&str], input: Option<&[u8]>) -> Result<String> {
        let out = self.output(args, input).await?;
        if !out.status.success() {
            return Err(anyhow!(
                "git {} failed:\n{}",
                args.join(" "),
                String::from_utf8_lossy(&out.stderr)
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }
}

impl VersionControl for GitCli {
    async fn fetch(&self) -> Result<()> {
        self.run(&["fetch", REMOTE], None).await?;
        Ok(())
    }

    async fn read_file(&self, branch: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let object = format!("{REMOTE}/{branch}:{path}");
        let out = self.output(&["show", &object], None).await?;
        if !out.status.success() {
            debug!(%object, "not found on remote");
            return Ok(None);
        }
        Ok(Some(out.stdout))
    }

    async fn replace_branch(&self, branch: &str, artifact: &Path, name: &str, message: &str) -> Result<()> {
        let artifact = artifact
            .to_str()
            .ok_or_else(|| anyhow!("artifact path is not UTF-8: {}", artifact.display()))?;

        let blob = self.run(&["hash-object", "-w", "--", artifact], None).await?;
        let listing = format!("100644 blob {blob}\t{name}\n");
        let tree = self.run(&["mktree"], Some(listing.as_bytes())).await?;
        let commit = self.run(&["commit-tree", &tree, "-m", message], None).await?;
        debug!(%commit, %tree, name, "publish commit created");

        let refspec = format!("{commit}:refs/heads/{branch}");
        self.run(&["push", "--force", REMOTE, &refspec], None).await?;
        Ok(())
    }
}
