//! # meta-git-worker
//!
//! A task-driven worker that materializes, updates, and publishes
//! static-site repositories on behalf of a CMS backend. The backend assigns
//! a task (create a repo from a template, amend and push, overwrite a
//! theme, publish generated output to a pages branch, regenerate site
//! metadata); the worker executes the corresponding sequence of git
//! operations against the hosting provider and reports completion.
//!
//! All git work goes through the `git` binary as a subprocess. Credentials
//! are installed into the repository-local config with a
//! placeholder-then-patch sequence and retracted after every network
//! operation, so a token never appears in an argument list, a process
//! listing, or a log line.

/// Merging fetched template and theme trees into a working repository,
/// including the preserve-replace-restore sequence that keeps user content
/// alive through a full template overwrite.
pub mod assembly;

/// Fetching template and theme content trees to local staging directories.
pub mod fetch;

/// The git subprocess executor and the repository-local auth lifecycle.
pub mod git;

/// Logging configuration.
pub mod logger;

/// Hosting-provider URL and credential conventions (GitHub, Gitee).
pub mod provider;

/// Task acquisition, execution, and completion reporting.
pub mod runner;

/// `meta-space-config.yml` generation.
pub mod site_config;

/// Task descriptors and payload types received from the backend.
pub mod task;

/// The per-task operation sequences, one per task method.
pub mod workflow;

/// Per-task temporary directory layout.
pub mod workspace;
