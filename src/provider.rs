//! Hosting-provider URL and credential conventions.
//!
//! Each supported provider knows how to build a canonical fetch URL and how
//! to encode a basic-auth credential for its token scheme. These are pure
//! string computations; no network I/O happens here.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

/// Hosting provider for a repository target.
///
/// Adding a provider means adding a variant here; every consumer matches
/// exhaustively, so the compiler points at each site that needs a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GitServiceType {
    Github,
    Gitee,
}

impl GitServiceType {
    /// Scheme + host origin of the provider, without a trailing slash.
    pub fn server_origin(&self) -> &'static str {
        match self {
            GitServiceType::Github => "https://github.com",
            GitServiceType::Gitee => "https://gitee.com",
        }
    }

    /// Canonical HTTPS fetch URL, `<origin>/<owner>/<repo>.git`.
    ///
    /// Owner and repository names are percent-encoded as path segments.
    pub fn fetch_url(&self, owner: &str, repo: &str) -> Result<String> {
        let mut url = Url::parse(self.server_origin())
            .with_context(|| format!("Failed to parse server origin for {self:?}"))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Server origin cannot be a base URL"))?
            .pop_if_empty()
            .push(owner)
            .push(&format!("{repo}.git"));
        Ok(url.to_string())
    }

    /// Basic-auth credential for the provider's token convention.
    ///
    /// GitHub authenticates installation tokens as `x-access-token:<token>`;
    /// Gitee expects `<owner>:<token>`. The result is the base64 payload that
    /// goes after `AUTHORIZATION: basic`.
    pub fn basic_credential(&self, token: &str, owner: &str) -> String {
        let raw = match self {
            GitServiceType::Github => format!("x-access-token:{token}"),
            GitServiceType::Gitee => format!("{owner}:{token}"),
        };
        STANDARD.encode(raw)
    }
}

/// Extract `(owner, repo)` from a repository URL such as
/// `https://github.com/owner/repo.git`.
pub fn parse_owner_repo(repo_url: &str) -> Result<(String, String)> {
    let url = Url::parse(repo_url)
        .with_context(|| format!("Failed to parse repository URL '{repo_url}'"))?;
    let mut segments = url
        .path_segments()
        .ok_or_else(|| anyhow!("Repository URL '{repo_url}' has no path"))?;

    let owner = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("Repository URL '{repo_url}' is missing an owner segment"))?;
    let repo = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("Repository URL '{repo_url}' is missing a repository segment"))?;

    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    Ok((owner.to_string(), repo.to_string()))
}
