//! Task-method orchestration.
//!
//! One [`GitWorkflow`] owns a task descriptor and a workspace and drives the
//! executor, auth helper, provider abstraction, and assembly code through
//! the operation sequence the task's method calls for. Every sequence is
//! terminal: a step failure aborts the remainder and surfaces to the task
//! runner, which reports it upstream.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::assembly;
use crate::fetch::{FetchedContent, RepositoryFetcher};
use crate::git::{GitAuth, GitCommand};
use crate::site_config::{self, SiteConfigFields};
use crate::task::{
    GitIdentity, PublishSettings, TaskDescriptor, TaskMethod, TemplateDescriptor, ThemeDescriptor,
};
use crate::workspace::Workspace;

/// Remote name reserved for the task's primary remote.
pub const DEFAULT_REMOTE: &str = "origin";

const INITIAL_COMMIT_MESSAGE: &str = "Initial commit.";
const UPDATE_COMMIT_MESSAGE: &str = "Update site content";
const PUBLISH_COMMIT_MESSAGE: &str = "Publish site output";

/// Marker telling the pages host not to run its own site generator.
const NO_JEKYLL_FILE_NAME: &str = ".nojekyll";
/// Marker carrying the custom domain for the pages host.
const CNAME_FILE_NAME: &str = "CNAME";

pub struct GitWorkflow<'a> {
    task: &'a TaskDescriptor,
    workspace: Workspace,
    fetcher: &'a dyn RepositoryFetcher,
}

impl<'a> GitWorkflow<'a> {
    pub fn new(task: &'a TaskDescriptor, fetcher: &'a dyn RepositoryFetcher) -> Result<Self> {
        let workspace = Workspace::create(&task.workspace)?;
        Ok(GitWorkflow {
            task,
            workspace,
            fetcher,
        })
    }

    /// Execute the task's operation sequence to completion.
    pub fn run(&self) -> Result<()> {
        log::info!("Task {} started, method {}", self.task.id, self.task.method);
        match self.task.method {
            TaskMethod::CloneCheckout => self.clone_checkout(),
            TaskMethod::CommitPush => self.commit_push(),
            TaskMethod::InitPush => self.init_push(),
            TaskMethod::OverwritePush => self.overwrite_push(),
            TaskMethod::OverwriteTheme => self.overwrite_theme(),
            TaskMethod::PublishPages => self.publish_pages(),
            TaskMethod::GenerateConfig => self.generate_config(),
        }
        .with_context(|| format!("Task {} ({}) failed", self.task.id, self.task.method))
    }

    fn clone_checkout(&self) -> Result<()> {
        let git = self.clone_and_checkout(&self.task.git)?;
        match &self.task.theme {
            Some(theme) => self.apply_theme(theme, git.working_directory()),
            None => {
                log::debug!("No theme in task payload, checkout only");
                Ok(())
            }
        }
    }

    fn commit_push(&self) -> Result<()> {
        let identity = &self.task.git;
        let git = GitCommand::open(self.workspace.repo_dir(&identity.repo_name))?;

        if git.branch_current()? != identity.branch_name {
            git.checkout(&identity.branch_name, false)?;
        }
        git.add_all()?;
        git.commit(UPDATE_COMMIT_MESSAGE, true)?;
        self.push_with_auth(&git, identity, &identity.branch_name, false)
    }

    fn init_push(&self) -> Result<()> {
        let template = self.require_template()?;
        let site = self.require_site()?;
        let identity = &self.task.git;

        let repo_path = self.workspace.repo_dir(&identity.repo_name);
        let git = GitCommand::create(&repo_path)?;
        git.init(Some(&identity.branch_name))?;

        let content = self.fetch_template(template)?;
        let root = assembly::resolve_content_root(&content.dir, &content.hint);
        assembly::assemble_from_template(&root, &repo_path)?;
        site_config::write_site_config(site, &repo_path)?;

        git.add_all()?;
        git.commit(INITIAL_COMMIT_MESSAGE, false)?;
        self.push_with_auth(&git, identity, &identity.branch_name, false)
    }

    fn overwrite_push(&self) -> Result<()> {
        let template = self.require_template()?;
        let identity = &self.task.git;

        let git = self.clone_and_checkout(identity)?;
        let content = self.fetch_template(template)?;
        let root = assembly::resolve_content_root(&content.dir, &content.hint);
        assembly::overwrite_template_preserving_source(
            &root,
            template.framework,
            git.working_directory(),
            &self.workspace.backup_dir(),
        )?;

        git.add_all()?;
        git.commit(UPDATE_COMMIT_MESSAGE, true)?;
        self.push_with_auth(&git, identity, &identity.branch_name, false)
    }

    fn overwrite_theme(&self) -> Result<()> {
        let theme = self.require_theme()?;
        let repo_path = self.workspace.repo_dir(&self.task.git.repo_name);
        self.apply_theme(theme, &repo_path)
    }

    fn publish_pages(&self) -> Result<()> {
        let publish = self.require_publish()?;
        let publisher = self.require_publisher()?;

        let publish_path = self
            .workspace
            .repo_dir(&self.task.git.repo_name)
            .join(&publish.publish_dir);
        self.write_publish_markers(&publish_path)?;

        let git = GitCommand::create(&publish_path)?;
        git.init(Some(&publish.publish_branch))?;
        git.add_all()?;
        git.commit(PUBLISH_COMMIT_MESSAGE, true)?;

        // The publish branch is wholly regenerated output, so overwriting
        // divergent remote history is safe here and only here.
        self.push_with_auth(&git, publisher, &publish.publish_branch, true)
    }

    fn generate_config(&self) -> Result<()> {
        let site = self.require_site()?;
        let repo_path = self.workspace.repo_dir(&self.task.git.repo_name);
        std::fs::create_dir_all(&repo_path)
            .with_context(|| format!("Failed to create {}", repo_path.display()))?;
        site_config::write_site_config(site, &repo_path)
    }

    /// Materialize the remote branch in a fresh local repository: init at
    /// the target branch, fetch it shallow into a remote-tracking ref under
    /// auth, then check out a local branch from that ref.
    fn clone_and_checkout(&self, identity: &GitIdentity) -> Result<GitCommand> {
        let repo_path = self.workspace.repo_dir(&identity.repo_name);
        let git = GitCommand::create(&repo_path)?;
        git.init(Some(&identity.branch_name))?;
        self.set_repository_remote(&git, identity)?;

        let branch = &identity.branch_name;
        let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        let auth = GitAuth::new(&git, identity);
        auth.configure_auth()?;
        let fetched = git.fetch(&[refspec], Some(1));
        let removed = auth.remove_auth();
        fetched?;
        removed?;

        git.checkout_new(branch, Some(&format!("refs/remotes/origin/{branch}")))?;
        Ok(git)
    }

    /// Point `origin` at the freshly computed provider URL, dropping any
    /// pre-existing remote first: hosting details or credentials may have
    /// changed since a previous task used this workspace name.
    fn set_repository_remote(&self, git: &GitCommand, identity: &GitIdentity) -> Result<()> {
        let remotes = git.remote_show()?;
        if remotes.iter().any(|name| name == DEFAULT_REMOTE) {
            log::debug!("Removing pre-existing remote {DEFAULT_REMOTE}");
            git.remote_remove(DEFAULT_REMOTE)?;
        }

        let url = identity
            .service_type
            .fetch_url(&identity.username, &identity.repo_name)?;
        log::info!("Git remote url is: {url}");
        git.remote_add(DEFAULT_REMOTE, &url)
    }

    /// Auth-bracketed remote setup and push. `remove_auth` runs on every
    /// exit path so a failed push cannot leave the header resident.
    fn push_with_auth(
        &self,
        git: &GitCommand,
        identity: &GitIdentity,
        branch: &str,
        force: bool,
    ) -> Result<()> {
        let auth = GitAuth::new(git, identity);
        auth.configure_auth()?;
        let pushed = self.set_repository_remote(git, identity).and_then(|_| {
            log::info!(
                "Pushing {} to {DEFAULT_REMOTE}/{branch} (force: {force})",
                identity.repo_name
            );
            git.push(DEFAULT_REMOTE, branch, force)
        });
        let removed = auth.remove_auth();
        pushed?;
        removed?;
        log::info!("Pushed {} to {DEFAULT_REMOTE}/{branch}", identity.repo_name);
        Ok(())
    }

    fn apply_theme(&self, theme: &ThemeDescriptor, repo_path: &Path) -> Result<()> {
        if theme.is_package {
            // Package-managed themes install at build time, not here.
            log::info!("Theme {} is packaged, skipping assembly", theme.theme_name);
            return Ok(());
        }
        let content = self.fetcher.fetch(
            &theme.repo_url,
            theme.branch_name.as_deref(),
            &self.workspace.theme_staging(),
        )?;
        let root = assembly::resolve_content_root(&content.dir, &content.hint);
        assembly::assemble_theme(&root, theme, repo_path)
    }

    fn fetch_template(&self, template: &TemplateDescriptor) -> Result<FetchedContent> {
        self.fetcher.fetch(
            &template.repo_url,
            template.branch_name.as_deref(),
            &self.workspace.template_staging(),
        )
    }

    fn write_publish_markers(&self, publish_path: &Path) -> Result<()> {
        std::fs::create_dir_all(publish_path)
            .with_context(|| format!("Failed to create {}", publish_path.display()))?;

        let no_jekyll = publish_path.join(NO_JEKYLL_FILE_NAME);
        std::fs::write(&no_jekyll, "")
            .with_context(|| format!("Failed to write {}", no_jekyll.display()))?;

        let domain = self
            .task
            .site
            .as_ref()
            .and_then(|site| site.site.domain.as_deref());
        if let Some(domain) = domain {
            let cname = publish_path.join(CNAME_FILE_NAME);
            std::fs::write(&cname, format!("https://{domain}\n"))
                .with_context(|| format!("Failed to write {}", cname.display()))?;
        } else {
            log::debug!("No site domain set, skipping {CNAME_FILE_NAME}");
        }

        Ok(())
    }

    fn require_template(&self) -> Result<&TemplateDescriptor> {
        self.task
            .template
            .as_ref()
            .ok_or_else(|| anyhow!("Task {} is missing a template descriptor", self.task.id))
    }

    fn require_theme(&self) -> Result<&ThemeDescriptor> {
        self.task
            .theme
            .as_ref()
            .ok_or_else(|| anyhow!("Task {} is missing a theme descriptor", self.task.id))
    }

    fn require_publish(&self) -> Result<&PublishSettings> {
        self.task
            .publish
            .as_ref()
            .ok_or_else(|| anyhow!("Task {} is missing publish settings", self.task.id))
    }

    fn require_publisher(&self) -> Result<&GitIdentity> {
        self.task
            .publisher
            .as_ref()
            .ok_or_else(|| anyhow!("Task {} is missing a publisher identity", self.task.id))
    }

    fn require_site(&self) -> Result<&SiteConfigFields> {
        self.task
            .site
            .as_ref()
            .ok_or_else(|| anyhow!("Task {} is missing site config fields", self.task.id))
    }
}
