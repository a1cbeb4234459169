//! A small VCS facade (SPEC_FULL.md §4.9 expansion): spec.md assumes "a
//! VCS" without naming an interface, so the improvement cycle is written
//! against this trait rather than `forge_tool::GitCli` directly, letting
//! the cycle's branch/merge/cleanup logic be tested without a real `git`
//! binary. `GitCli` is the production implementation — the same subprocess
//! seam the tool registry's auto-commit hook uses.

use async_trait::async_trait;
use forge_tool::GitCli;
use std::error::Error;

/// The VCS operations one improvement cycle drives (spec.md §4.9 steps 2-6).
#[async_trait]
pub trait VcsOps: Send + Sync {
    /// The currently checked-out branch name.
    async fn current_branch(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Create and check out a new branch from the current HEAD.
    async fn create_branch(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Check out an existing branch.
    async fn checkout(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Paths changed on the current branch relative to `base`.
    async fn changed_paths_vs(&self, base: &str) -> Result<Vec<String>, Box<dyn Error + Send + Sync>>;

    /// Stage everything and commit.
    async fn commit_all(&self, message: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Merge `branch` into the currently checked-out branch.
    async fn merge(&self, branch: &str) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Delete a local branch, best-effort.
    async fn delete_branch(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

#[async_trait]
impl VcsOps for GitCli {
    async fn current_branch(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        GitCli::current_branch(self).await
    }

    async fn create_branch(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        GitCli::create_branch(self, name).await
    }

    async fn checkout(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        GitCli::checkout(self, name).await
    }

    async fn changed_paths_vs(&self, base: &str) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
        GitCli::changed_paths_vs(self, base).await
    }

    async fn commit_all(&self, message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        GitCli::commit_all(self, message).await
    }

    async fn merge(&self, branch: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        GitCli::merge(self, branch).await
    }

    async fn delete_branch(&self, name: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        GitCli::delete_branch(self, name).await
    }
}
