//! Task descriptors handed to the worker by the CMS backend.
//!
//! A task is immutable once received: its method selects the operation
//! sequence the workflow runs, and the payload carries the repository
//! identities and content descriptors that sequence needs. Unknown methods
//! fail at deserialization, before any side effect.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provider::GitServiceType;
use crate::site_config::SiteConfigFields;

/// Operation the backend wants executed. The enum is the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskMethod {
    CloneCheckout,
    CommitPush,
    InitPush,
    OverwritePush,
    OverwriteTheme,
    PublishPages,
    GenerateConfig,
}

impl fmt::Display for TaskMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskMethod::CloneCheckout => "CLONE_CHECKOUT",
            TaskMethod::CommitPush => "COMMIT_PUSH",
            TaskMethod::InitPush => "INIT_PUSH",
            TaskMethod::OverwritePush => "OVERWRITE_PUSH",
            TaskMethod::OverwriteTheme => "OVERWRITE_THEME",
            TaskMethod::PublishPages => "PUBLISH_PAGES",
            TaskMethod::GenerateConfig => "GENERATE_CONFIG",
        };
        f.write_str(name)
    }
}

/// One provider-scoped credential + repository target.
///
/// A task may carry two of these (content repo and publish repo); they must
/// never share an auth session at the same time.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitIdentity {
    pub service_type: GitServiceType,
    pub token: String,
    pub username: String,
    pub repo_name: String,
    pub branch_name: String,
}

// Tokens must never reach logs, so Debug renders everything but the secret.
impl fmt::Debug for GitIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitIdentity")
            .field("service_type", &self.service_type)
            .field("token", &"***")
            .field("username", &self.username)
            .field("repo_name", &self.repo_name)
            .field("branch_name", &self.branch_name)
            .finish()
    }
}

/// Static-site generator convention the template or theme follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameworkKind {
    Hexo,
}

impl FrameworkKind {
    /// Directory holding user-authored content, preserved across template
    /// overwrites.
    pub fn source_dir(&self) -> &'static str {
        match self {
            FrameworkKind::Hexo => "source",
        }
    }

    /// Directory themes are installed under.
    pub fn themes_dir(&self) -> &'static str {
        match self {
            FrameworkKind::Hexo => "themes",
        }
    }
}

/// Template to materialize a new site from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDescriptor {
    pub repo_url: String,
    pub branch_name: Option<String>,
    pub framework: FrameworkKind,
}

/// Theme to install into an existing site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDescriptor {
    pub repo_url: String,
    pub branch_name: Option<String>,
    pub framework: FrameworkKind,
    pub theme_name: String,
    /// Themes distributed through a language package manager carry no
    /// content tree; assembling them is a no-op for this worker.
    #[serde(default)]
    pub is_package: bool,
}

/// Where the generated site output lives and which branch serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSettings {
    pub publish_dir: String,
    pub publish_branch: String,
}

/// One unit of work from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    pub id: Uuid,
    pub method: TaskMethod,
    /// Workspace directory name. The backend derives this from the task id,
    /// which is what keeps concurrently running workers from colliding.
    pub workspace: String,
    pub git: GitIdentity,
    #[serde(default)]
    pub publisher: Option<GitIdentity>,
    #[serde(default)]
    pub template: Option<TemplateDescriptor>,
    #[serde(default)]
    pub theme: Option<ThemeDescriptor>,
    #[serde(default)]
    pub publish: Option<PublishSettings>,
    #[serde(default)]
    pub site: Option<SiteConfigFields>,
}
