//! Merging fetched template and theme trees into a working repository.
//!
//! Template assembly is an overwrite-on-conflict copy. A full template
//! overwrite additionally runs a preserve-replace-restore sequence so that
//! user-authored content under the framework's source directory survives
//! while layout, config, and assets are taken from the new template
//! verbatim. The ordering of those steps is load-bearing: backup before
//! delete, delete the template's own source before restoring the backup.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::task::{FrameworkKind, ThemeDescriptor};

/// Locate the actual content root inside a fetched staging tree.
///
/// Provider archives wrap the content in a single generated subdirectory
/// whose exact name is unpredictable; the hint (`<owner>-<repo>`) is matched
/// as a prefix, and the staging root itself is used when nothing matches.
pub fn resolve_content_root(staging: &Path, hint: &str) -> PathBuf {
    let matched = std::fs::read_dir(staging).ok().and_then(|entries| {
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(hint))
            })
    });
    match matched {
        Some(subdir) => {
            log::debug!("Content root resolved to {}", subdir.display());
            subdir
        }
        None => staging.to_path_buf(),
    }
}

/// Copy a template's content tree over the repository path,
/// overwrite-on-conflict.
pub fn assemble_from_template(content_root: &Path, repo_path: &Path) -> Result<()> {
    log::info!(
        "Copying template files from {} to {}",
        content_root.display(),
        repo_path.display()
    );
    copy_dir_over(content_root, repo_path)
}

/// Replace the whole repository content with a new template while keeping
/// user-authored content under the framework's source directory.
pub fn overwrite_template_preserving_source(
    content_root: &Path,
    framework: FrameworkKind,
    repo_path: &Path,
    backup_dir: &Path,
) -> Result<()> {
    let source_name = framework.source_dir();
    let repo_source = repo_path.join(source_name);
    if !repo_source.is_dir() {
        bail!(
            "Expected source directory {} is missing, refusing to overwrite",
            repo_source.display()
        );
    }

    // 1. Preserve the user content before anything is deleted.
    let backup = backup_dir.join(source_name);
    if backup.exists() {
        std::fs::remove_dir_all(&backup)
            .with_context(|| format!("Failed to clear backup dir {}", backup.display()))?;
    }
    log::info!("Backing up {} to {}", repo_source.display(), backup.display());
    copy_dir_over(&repo_source, &backup)?;

    // 2. Drop everything except the version-control metadata.
    clear_dir_except_git(repo_path)?;

    // 3. Bring in the new template.
    assemble_from_template(content_root, repo_path)?;

    // 4. The template's own source tree must not merge with the restored
    //    one, so it goes before the backup comes back.
    if repo_source.exists() {
        std::fs::remove_dir_all(&repo_source).with_context(|| {
            format!("Failed to remove template source {}", repo_source.display())
        })?;
    }

    // 5. Restore the preserved user content.
    log::info!("Restoring {} from backup", repo_source.display());
    copy_dir_over(&backup, &repo_source)?;

    Ok(())
}

/// Install a theme's content tree under `<repo>/<themesDir>/<themeName>`.
///
/// Packaged themes are distributed through a language package manager and
/// carry no content tree; they are not this worker's job.
pub fn assemble_theme(
    theme_root: &Path,
    theme: &ThemeDescriptor,
    repo_path: &Path,
) -> Result<()> {
    if theme.is_package {
        log::info!(
            "Theme {} is distributed as a package, nothing to assemble",
            theme.theme_name
        );
        return Ok(());
    }

    let dest = repo_path
        .join(theme.framework.themes_dir())
        .join(&theme.theme_name);
    log::info!(
        "Installing theme {} into {}",
        theme.theme_name,
        dest.display()
    );
    copy_dir_over(theme_root, &dest)
}

/// Recursively copy `src` into `dst`, overwriting existing files. `.git`
/// entries are never copied.
fn copy_dir_over(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("Failed to relativize {}", entry.path().display()))?;
        if relative.components().any(|c| c.as_os_str() == ".git") {
            continue;
        }

        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Delete every entry in `dir` except the `.git` metadata directory.
fn clear_dir_except_git(dir: &Path) -> Result<()> {
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        } else {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}
