//! A small shell-out-to-`git` helper shared by the tool registry's
//! auto-commit hook and the improvement loop's VCS operations (spec.md
//! §4.1's auto-commit side effect and §4.9's short-lived branch cycle are
//! the same subprocess seam).

use crate::registry::AutoCommit;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Shells out to the `git` binary against a fixed working directory.
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    /// Build a `GitCli` rooted at `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let output = Command::new("git").args(args).current_dir(&self.workdir).output().await?;
        if !output.status.success() {
            return Err(format!("git {args:?} failed: {}", String::from_utf8_lossy(&output.stderr)).into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// The currently checked-out branch name.
    pub async fn current_branch(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    /// Create and check out a new branch from the current HEAD.
    pub async fn create_branch(&self, name: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.run(&["checkout", "-b", name]).await.map(|_| ())
    }

    /// Check out an existing branch.
    pub async fn checkout(&self, name: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.run(&["checkout", name]).await.map(|_| ())
    }

    /// Paths changed on the current branch relative to `base`.
    pub async fn changed_paths_vs(&self, base: &str) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
        let out = self.run(&["diff", "--name-only", base]).await?;
        Ok(out.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    /// Stage everything and commit.
    pub async fn commit_all(&self, message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.run(&["add", "-A"]).await?;
        match self.run(&["commit", "-m", message]).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("nothing to commit") => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Merge `branch` into the currently checked-out branch.
    pub async fn merge(&self, branch: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.run(&["merge", "--no-ff", branch]).await.map(|_| ())
    }

    /// Delete a local branch. Best-effort: failures are the caller's
    /// concern (the improvement loop treats this as best-effort cleanup).
    pub async fn delete_branch(&self, name: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.run(&["branch", "-D", name]).await.map(|_| ())
    }

    /// The working directory this instance operates against.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

#[async_trait]
impl AutoCommit for GitCli {
    async fn commit(&self, message: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.commit_all(message).await
    }
}
