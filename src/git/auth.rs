//! Repository-local HTTP authorization lifecycle.
//!
//! The credential is installed as an `http.<origin>/.extraheader` config
//! value using a placeholder-then-patch sequence: a `***` marker goes
//! through the normal `git config` path, then the marker is replaced with
//! the real header by rewriting the config file directly. The secret
//! therefore never appears in a subprocess argument vector, a process
//! listing, or the executor's command trace.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::git::command::GitCommand;
use crate::task::GitIdentity;

const TOKEN_PLACEHOLDER_VALUE: &str = "AUTHORIZATION: basic ***";

pub struct GitAuth<'a> {
    git: &'a GitCommand,
    config_key: String,
    config_value: String,
}

impl<'a> GitAuth<'a> {
    /// Bind an auth session to one repository and one identity.
    ///
    /// Only one session per repository may be configured at a time; callers
    /// bracket every network operation with configure/remove.
    pub fn new(git: &'a GitCommand, identity: &GitIdentity) -> Self {
        let origin = identity.service_type.server_origin();
        let credential = identity
            .service_type
            .basic_credential(&identity.token, &identity.username);
        GitAuth {
            git,
            config_key: format!("http.{origin}/.extraheader"),
            config_value: format!("AUTHORIZATION: basic {credential}"),
        }
    }

    /// Install the authorization header in the repository-local config.
    ///
    /// Starts from a clean slate so a stale header from an earlier run can
    /// never survive with rotated credentials.
    pub fn configure_auth(&self) -> Result<()> {
        self.remove_auth()?;
        self.git
            .config_set(&self.config_key, TOKEN_PLACEHOLDER_VALUE)?;
        self.replace_token_placeholder()
    }

    /// Drop the authorization header if present. Absence is not an error.
    pub fn remove_auth(&self) -> Result<()> {
        if self.git.config_exists(&self.config_key)? {
            log::debug!("Removing git config {}", self.config_key);
            self.git.config_unset(&self.config_key)?;
        }
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.git.working_directory().join(".git").join("config")
    }

    fn replace_token_placeholder(&self) -> Result<()> {
        let config_path = self.config_path();
        log::debug!(
            "Patching auth token header into {}",
            config_path.display()
        );

        let config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        if !config.contains(TOKEN_PLACEHOLDER_VALUE) {
            // The placeholder went through `git config` but is not in the
            // file: the repository config is in an unexpected state, and
            // proceeding could push unauthenticated.
            bail!(
                "Unable to find auth placeholder in {}",
                config_path.display()
            );
        }
        let patched = config.replace(TOKEN_PLACEHOLDER_VALUE, &self.config_value);
        std::fs::write(&config_path, patched)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| {
                    format!("Failed to restrict permissions on {}", config_path.display())
                })?;
        }

        Ok(())
    }
}
