//! Git subprocess executor bound to one working directory.
//!
//! All git work in the worker funnels through [`GitCommand`]: it invokes the
//! binary directly with an argv array (never a shell), merges a fixed
//! baseline over the inherited environment so no subcommand can stall on an
//! interactive credential prompt, and verifies once at construction that the
//! installed git is new enough. Secrets are never placed in the argument
//! vector; the auth helper patches them into the repository config file
//! instead.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use semver::Version;

/// Oldest git this worker drives. `init --initial-branch` and the shallow
/// fetch behavior the workflows rely on appeared in this release line.
const MINIMUM_GIT_VERSION: Version = Version::new(2, 28, 0);

/// Fixed machine identity for every commit the worker creates.
pub const SERVICE_AUTHOR_NAME: &str = "Meta Network";
pub const SERVICE_AUTHOR_EMAIL: &str = "noreply@meta.io";

/// Captured result of one git invocation.
#[derive(Debug)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub struct GitCommand {
    workdir: PathBuf,
    env: Vec<(String, String)>,
}

impl GitCommand {
    /// Bind an executor to `workdir`, creating the directory if needed.
    pub fn create(workdir: impl Into<PathBuf>) -> Result<Self> {
        let workdir = workdir.into();
        std::fs::create_dir_all(&workdir)
            .with_context(|| format!("Failed to create directory {}", workdir.display()))?;
        Self::with_probed_version(workdir)
    }

    /// Bind an executor to an existing repository.
    pub fn open(workdir: impl Into<PathBuf>) -> Result<Self> {
        let workdir = workdir.into();
        if !workdir.join(".git").exists() {
            bail!(
                "Not a git repository: '{}' (no .git directory)",
                workdir.display()
            );
        }
        Self::with_probed_version(workdir)
    }

    fn with_probed_version(workdir: PathBuf) -> Result<Self> {
        let mut git = GitCommand {
            workdir,
            env: vec![
                // No terminal prompts, no credential-manager prompts: a
                // missing credential must fail, not hang the task.
                ("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()),
                ("GCM_INTERACTIVE".to_string(), "Never".to_string()),
                (
                    "GIT_AUTHOR_NAME".to_string(),
                    SERVICE_AUTHOR_NAME.to_string(),
                ),
                (
                    "GIT_AUTHOR_EMAIL".to_string(),
                    SERVICE_AUTHOR_EMAIL.to_string(),
                ),
                (
                    "GIT_COMMITTER_NAME".to_string(),
                    SERVICE_AUTHOR_NAME.to_string(),
                ),
                (
                    "GIT_COMMITTER_EMAIL".to_string(),
                    SERVICE_AUTHOR_EMAIL.to_string(),
                ),
            ],
        };

        let output = git.exec(&["--version"])?;
        let version = parse_git_version(&output.stdout).ok_or_else(|| {
            anyhow!(
                "Could not parse a git version from '{}'",
                output.stdout.trim()
            )
        })?;
        log::debug!("Detected git version {version}");
        if version < MINIMUM_GIT_VERSION {
            bail!("Minimum git version is {MINIMUM_GIT_VERSION}, current is {version}");
        }

        let user_agent = format!("git/{version} (meta-git-worker)");
        log::debug!("Git HTTP user agent set to: {user_agent}");
        git.env.push(("GIT_HTTP_USER_AGENT".to_string(), user_agent));

        Ok(git)
    }

    pub fn working_directory(&self) -> &Path {
        &self.workdir
    }

    /// Run git in the bound working directory.
    ///
    /// A non-zero exit is a hard failure unless `allow_failure` is set, in
    /// which case the caller inspects the exit code itself (existence
    /// probes do this).
    pub fn execute(&self, args: &[&str], allow_failure: bool) -> Result<GitOutput> {
        let output = self.invoke(args)?;
        if !allow_failure && output.exit_code != 0 {
            bail!(
                "git {} failed with exit code {}\nstdout: {}\nstderr: {}",
                args.join(" "),
                output.exit_code,
                output.stdout.trim(),
                output.stderr.trim()
            );
        }
        Ok(output)
    }

    fn exec(&self, args: &[&str]) -> Result<GitOutput> {
        self.execute(args, false)
    }

    fn exec_unchecked(&self, args: &[&str]) -> Result<GitOutput> {
        self.execute(args, true)
    }

    fn invoke(&self, args: &[&str]) -> Result<GitOutput> {
        log::debug!("Exec git command: git {}", args.join(" "));

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .with_context(|| format!("Failed to run 'git {}'", args.join(" ")))?;

        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Stage entries matching a pathspec, returning the added-entry lines.
    pub fn add(&self, pattern: &str) -> Result<Vec<String>> {
        let output = self.exec(&["add", "--verbose", pattern])?;
        Ok(added_lines(&output.stdout))
    }

    /// Stage everything, returning the added-entry lines.
    pub fn add_all(&self) -> Result<Vec<String>> {
        let output = self.exec(&["add", "--verbose", "--all"])?;
        Ok(added_lines(&output.stdout))
    }

    pub fn branch_current(&self) -> Result<String> {
        let output = self.exec(&["branch", "--show-current"])?;
        Ok(output.stdout.trim().to_string())
    }

    pub fn checkout(&self, branch: &str, force: bool) -> Result<()> {
        let mut args = vec!["checkout", "--progress"];
        if force {
            args.push("--force");
        }
        args.push(branch);
        self.exec(&args)?;
        Ok(())
    }

    /// Create (or reset) `branch` and check it out, optionally from a start
    /// point such as `refs/remotes/origin/<branch>`.
    pub fn checkout_new(&self, branch: &str, start_point: Option<&str>) -> Result<()> {
        let mut args = vec!["checkout", "--progress", "-B", branch];
        if let Some(start) = start_point {
            args.push(start);
        }
        self.exec(&args)?;
        Ok(())
    }

    /// Clone `repo_url` into the bound working directory.
    pub fn clone(&self, repo_url: &str, branch: Option<&str>, depth: Option<u32>) -> Result<()> {
        let branch_arg = branch.map(|b| format!("--branch={b}"));
        let depth_arg = depth.filter(|d| *d > 0).map(|d| format!("--depth={d}"));

        let mut args = vec!["clone", "--progress"];
        if let Some(branch) = branch_arg.as_deref() {
            args.push(branch);
        }
        if let Some(depth) = depth_arg.as_deref() {
            args.push(depth);
        }
        args.push(repo_url);
        args.push(".");
        self.exec(&args)?;
        Ok(())
    }

    /// Commit staged changes. Authorship comes from the fixed service
    /// identity in the executor environment.
    pub fn commit(&self, message: &str, allow_empty: bool) -> Result<()> {
        let message_arg = format!("--message={message}");
        let mut args = vec!["commit", message_arg.as_str()];
        if allow_empty {
            args.push("--allow-empty");
        }
        self.exec(&args)?;
        Ok(())
    }

    pub fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.exec(&["config", "--local", key, value])?;
        Ok(())
    }

    pub fn config_exists(&self, key: &str) -> Result<bool> {
        let output = self.exec_unchecked(&["config", "--local", "--get-all", key])?;
        Ok(output.exit_code == 0)
    }

    pub fn config_unset(&self, key: &str) -> Result<bool> {
        let output = self.exec_unchecked(&["config", "--local", "--unset-all", key])?;
        Ok(output.exit_code == 0)
    }

    /// Fetch the given refspecs from `origin`.
    ///
    /// With no depth, a previously shallow repository is unshallowed so the
    /// fetched refs are usable for further history operations.
    pub fn fetch(&self, refspecs: &[String], depth: Option<u32>) -> Result<()> {
        let mut args = vec![
            "fetch".to_string(),
            "--no-tags".to_string(),
            "--no-recurse-submodules".to_string(),
            "--prune".to_string(),
            "--progress".to_string(),
        ];
        match depth.filter(|d| *d > 0) {
            Some(depth) => args.push(format!("--depth={depth}")),
            None => {
                if self.workdir.join(".git").join("shallow").exists() {
                    args.push("--unshallow".to_string());
                }
            }
        }
        args.push("origin".to_string());
        args.extend(refspecs.iter().cloned());

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.exec(&args)?;
        Ok(())
    }

    pub fn init(&self, branch: Option<&str>) -> Result<()> {
        let branch_arg = branch.map(|b| format!("--initial-branch={b}"));
        let mut args = vec!["init"];
        if let Some(branch) = branch_arg.as_deref() {
            args.push(branch);
        }
        args.push(".");
        self.exec(&args)?;
        Ok(())
    }

    /// Push one branch with an explicit refspec so the remote ref is always
    /// `refs/heads/<branch>`, whatever HEAD currently is.
    pub fn push(&self, remote: &str, branch: &str, force: bool) -> Result<()> {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.push(remote);
        args.push(&refspec);
        self.exec(&args)?;
        Ok(())
    }

    pub fn remote_add(&self, name: &str, url: &str) -> Result<()> {
        self.exec(&["remote", "add", name, url])?;
        Ok(())
    }

    pub fn remote_remove(&self, name: &str) -> Result<()> {
        self.exec(&["remote", "remove", name])?;
        Ok(())
    }

    pub fn remote_show(&self) -> Result<Vec<String>> {
        let output = self.exec(&["remote", "show"])?;
        Ok(output
            .stdout
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }
}

fn added_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Pull a semantic version out of free-form `git --version` output, e.g.
/// `git version 2.39.2` or `git version 2.37.1.windows.1`.
fn parse_git_version(output: &str) -> Option<Version> {
    output.split_whitespace().find_map(|word| {
        let numeric: String = word
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let major: u64 = parts.next()?.parse().ok()?;
        let minor: u64 = parts.next()?.parse().ok()?;
        let patch: u64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        Some(Version::new(major, minor, patch))
    })
}
