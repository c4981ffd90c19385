//! Per-task workspace layout under the system temp directory.
//!
//! Every path the worker touches lives below one task-owned root:
//!
//! ```text
//! <tmp>/<workspace>/<repoName>/   content repository working tree
//! <tmp>/<workspace>/.template/    transient template staging
//! <tmp>/<workspace>/.theme/       transient theme staging
//! <tmp>/<workspace>/backup/       preserved user content during overwrites
//! ```
//!
//! The workspace is created at task start and never reused across tasks;
//! tearing it down is the surrounding runtime's job.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create the workspace root for one task.
    ///
    /// `name` must be unique per task (the backend derives it from the task
    /// id); two tasks sharing a name would share a working directory.
    pub fn create(name: &str) -> Result<Self> {
        let root = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create workspace root {}", root.display()))?;
        log::info!("Workspace created at {}", root.display());
        Ok(Workspace { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working tree of the content repository.
    pub fn repo_dir(&self, repo_name: &str) -> PathBuf {
        self.root.join(repo_name)
    }

    /// Staging area for fetched templates, cleared before each use.
    pub fn template_staging(&self) -> PathBuf {
        self.root.join(".template")
    }

    /// Staging area for fetched themes, cleared before each use.
    pub fn theme_staging(&self) -> PathBuf {
        self.root.join(".theme")
    }

    /// Holding area for user content during a template overwrite.
    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backup")
    }
}
