//! Template and theme content fetching.
//!
//! The workflows only need "given a repository URL and branch, give me a
//! local directory of files plus a hint for finding the useful subtree".
//! [`RepositoryFetcher`] is that seam; [`GitCloneFetcher`] is the default
//! implementation, materializing the tree with a shallow branch-qualified
//! clone. Provider archive downloads can implement the same trait without
//! the workflows noticing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::git::GitCommand;
use crate::provider;

/// A fetched content tree on local disk.
pub struct FetchedContent {
    /// Staging directory holding the fetched files.
    pub dir: PathBuf,
    /// Best-effort marker (`<owner>-<repo>`) for locating the content root
    /// when the fetched tree wraps it in a generated subdirectory. Archive
    /// naming is not stable across providers, so consumers fall back to the
    /// staging root when no entry matches.
    pub hint: String,
}

pub trait RepositoryFetcher {
    /// Materialize the repository content at `dest`, replacing whatever was
    /// staged there before.
    fn fetch(&self, repo_url: &str, branch: Option<&str>, dest: &Path) -> Result<FetchedContent>;
}

/// Fetches content by shallow-cloning the repository with the git binary.
pub struct GitCloneFetcher;

impl RepositoryFetcher for GitCloneFetcher {
    fn fetch(&self, repo_url: &str, branch: Option<&str>, dest: &Path) -> Result<FetchedContent> {
        let (owner, repo) = provider::parse_owner_repo(repo_url)?;

        // Staging is transient: clear leftovers from any earlier fetch so
        // the clone lands in an empty directory.
        if dest.exists() {
            std::fs::remove_dir_all(dest)
                .with_context(|| format!("Failed to clear staging dir {}", dest.display()))?;
        }

        log::info!(
            "Fetching {repo_url} (branch: {}) into {}",
            branch.unwrap_or("default"),
            dest.display()
        );
        let git = GitCommand::create(dest)?;
        git.clone(repo_url, branch, Some(1))?;

        // Only the content tree matters downstream; the clone's history must
        // not leak into the repository the content gets copied over.
        let git_dir = dest.join(".git");
        if git_dir.exists() {
            std::fs::remove_dir_all(&git_dir)
                .with_context(|| format!("Failed to remove {}", git_dir.display()))?;
        }

        Ok(FetchedContent {
            dir: dest.to_path_buf(),
            hint: format!("{owner}-{repo}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_shape() {
        // The fetch itself needs a network; the hint derivation does not.
        let (owner, repo) =
            provider::parse_owner_repo("https://github.com/zoeingwingkei/frame.git").unwrap();
        assert_eq!(format!("{owner}-{repo}"), "zoeingwingkei-frame");
    }
}
