//! Integration tests driving the real git binary through the worker's
//! public API. Network-facing pushes go to local bare repositories; content
//! fetching uses a stub fetcher so no hosting provider is contacted.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use tempfile::TempDir;
use uuid::Uuid;

use meta_git_worker::assembly;
use meta_git_worker::fetch::{FetchedContent, RepositoryFetcher};
use meta_git_worker::git::GitCommand;
use meta_git_worker::provider::GitServiceType;
use meta_git_worker::site_config::{
    write_site_config, SiteConfigFields, SiteFields, ThemeFields, UserFields,
};
use meta_git_worker::task::{
    FrameworkKind, GitIdentity, TaskDescriptor, TaskMethod, ThemeDescriptor,
};
use meta_git_worker::workflow::GitWorkflow;

/// Fetcher that serves a prepared local directory instead of the network.
struct StubFetcher {
    source: PathBuf,
    hint: String,
}

impl RepositoryFetcher for StubFetcher {
    fn fetch(&self, _repo_url: &str, _branch: Option<&str>, dest: &Path) -> Result<FetchedContent> {
        if dest.exists() {
            std::fs::remove_dir_all(dest)?;
        }
        copy_tree(&self.source, dest);
        Ok(FetchedContent {
            dir: dest.to_path_buf(),
            hint: self.hint.clone(),
        })
    }
}

fn copy_tree(src: &Path, dst: &Path) {
    std::fs::create_dir_all(dst).unwrap();
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry.unwrap();
        let target = dst.join(entry.path().strip_prefix(src).unwrap());
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn git_in(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a bare repository to stand in for a hosting provider.
fn bare_remote(dir: &Path, initial_branch: &str) -> String {
    let branch_arg = format!("--initial-branch={initial_branch}");
    let dir_arg = dir.to_string_lossy().to_string();
    git_in(
        dir.parent().unwrap(),
        &["init", "--bare", &branch_arg, &dir_arg],
    );
    format!("file://{}", dir.display())
}

fn identity() -> GitIdentity {
    GitIdentity {
        service_type: GitServiceType::Github,
        token: "gho_secret".to_string(),
        username: "octocat".to_string(),
        repo_name: "my-site".to_string(),
        branch_name: "main".to_string(),
    }
}

fn site_fields() -> SiteConfigFields {
    SiteConfigFields {
        user: UserFields {
            username: "octocat".to_string(),
            nickname: None,
        },
        site: SiteFields {
            title: "Test Site".to_string(),
            subtitle: None,
            description: None,
            author: None,
            keywords: Vec::new(),
            favicon: None,
            domain: Some("site.example".to_string()),
            language: None,
            timezone: None,
        },
        theme: ThemeFields {
            theme_name: "cactus".to_string(),
        },
        gateway: None,
        metadata: None,
    }
}

fn task(method: TaskMethod) -> TaskDescriptor {
    TaskDescriptor {
        id: Uuid::new_v4(),
        method,
        workspace: format!("test-integration-{}", Uuid::new_v4()),
        git: identity(),
        publisher: None,
        template: None,
        theme: None,
        publish: None,
        site: Some(site_fields()),
    }
}

fn workspace_root(task: &TaskDescriptor) -> PathBuf {
    std::env::temp_dir().join(&task.workspace)
}

#[test]
fn test_overwrite_theme_task_installs_theme_tree() {
    let theme_content = TempDir::new().unwrap();
    write(&theme_content.path().join("layout/index.ejs"), "layout");
    write(&theme_content.path().join("_config.yml"), "theme: cactus");

    let fetcher = StubFetcher {
        source: theme_content.path().to_path_buf(),
        hint: "octocat-cactus".to_string(),
    };

    let mut descriptor = task(TaskMethod::OverwriteTheme);
    descriptor.theme = Some(ThemeDescriptor {
        repo_url: "https://github.com/octocat/cactus.git".to_string(),
        branch_name: None,
        framework: FrameworkKind::Hexo,
        theme_name: "cactus".to_string(),
        is_package: false,
    });

    let workflow = GitWorkflow::new(&descriptor, &fetcher).unwrap();
    workflow.run().unwrap();

    let repo = workspace_root(&descriptor).join("my-site");
    assert!(repo.join("themes/cactus/layout/index.ejs").exists());
    assert!(repo.join("themes/cactus/_config.yml").exists());

    std::fs::remove_dir_all(workspace_root(&descriptor)).unwrap();
}

#[test]
fn test_generate_config_task_writes_metadata_only() {
    let fetcher = StubFetcher {
        source: PathBuf::new(),
        hint: String::new(),
    };
    let descriptor = task(TaskMethod::GenerateConfig);

    let workflow = GitWorkflow::new(&descriptor, &fetcher).unwrap();
    workflow.run().unwrap();

    let repo = workspace_root(&descriptor).join("my-site");
    let config = std::fs::read_to_string(repo.join("meta-space-config.yml")).unwrap();
    assert!(config.contains("title: Test Site"));
    assert!(!repo.join(".git").exists());

    std::fs::remove_dir_all(workspace_root(&descriptor)).unwrap();
}

#[test]
fn test_template_assembly_commit_and_push_round_trip() {
    // The INIT_PUSH sequence against a local bare remote: init at the
    // target branch, assemble the template, write the metadata file,
    // stage, commit, push an explicit refspec.
    let template = TempDir::new().unwrap();
    // Fetched trees commonly wrap the content in a generated subdirectory.
    write(
        &template.path().join("octocat-frame-1305c4/_config.yml"),
        "title: template",
    );
    write(
        &template.path().join("octocat-frame-1305c4/source/_posts/hello.md"),
        "hello",
    );

    let remote_dir = TempDir::new().unwrap();
    let remote_url = bare_remote(&remote_dir.path().join("my-site.git"), "main");

    let workdir = TempDir::new().unwrap();
    let git = GitCommand::create(workdir.path()).unwrap();
    git.init(Some("main")).unwrap();

    let root = assembly::resolve_content_root(template.path(), "octocat-frame");
    assert!(root.ends_with("octocat-frame-1305c4"));
    assembly::assemble_from_template(&root, workdir.path()).unwrap();
    write_site_config(&site_fields(), workdir.path()).unwrap();

    let added = git.add_all().unwrap();
    assert_eq!(added.len(), 3);
    git.commit("Initial commit.", false).unwrap();
    git.remote_add("origin", &remote_url).unwrap();
    git.push("origin", "main", false).unwrap();

    // The remote branch now holds the assembled tree.
    let remote_files = git_in(
        &remote_dir.path().join("my-site.git"),
        &["ls-tree", "-r", "--name-only", "refs/heads/main"],
    );
    assert!(remote_files.contains("_config.yml"));
    assert!(remote_files.contains("source/_posts/hello.md"));
    assert!(remote_files.contains("meta-space-config.yml"));
}

#[test]
fn test_fetch_and_checkout_target_branch_from_remote() {
    // The CLONE_CHECKOUT materialization: a fresh local repository picks up
    // one remote branch through a shallow fetch into a remote-tracking ref.
    let remote_dir = TempDir::new().unwrap();
    let remote_url = bare_remote(&remote_dir.path().join("my-site.git"), "meow");

    let seed = TempDir::new().unwrap();
    let seed_git = GitCommand::create(seed.path()).unwrap();
    seed_git.init(Some("meow")).unwrap();
    write(&seed.path().join("index.md"), "seeded");
    seed_git.add_all().unwrap();
    seed_git.commit("Initial commit.", false).unwrap();
    seed_git.remote_add("origin", &remote_url).unwrap();
    seed_git.push("origin", "meow", false).unwrap();

    let workdir = TempDir::new().unwrap();
    let git = GitCommand::create(workdir.path()).unwrap();
    git.init(Some("meow")).unwrap();
    git.remote_add("origin", &remote_url).unwrap();
    git.fetch(
        &["+refs/heads/meow:refs/remotes/origin/meow".to_string()],
        Some(1),
    )
    .unwrap();
    git.checkout_new("meow", Some("refs/remotes/origin/meow"))
        .unwrap();

    assert_eq!(git.branch_current().unwrap(), "meow");
    assert_eq!(
        std::fs::read_to_string(workdir.path().join("index.md")).unwrap(),
        "seeded"
    );
}

#[test]
fn test_force_push_overwrites_divergent_publish_history() {
    // PUBLISH_PAGES regenerates the branch wholesale, so a force push must
    // succeed against divergent remote history where a plain push fails.
    let remote_dir = TempDir::new().unwrap();
    let remote_url = bare_remote(&remote_dir.path().join("pages.git"), "gh-pages");

    let first = TempDir::new().unwrap();
    let first_git = GitCommand::create(first.path()).unwrap();
    first_git.init(Some("gh-pages")).unwrap();
    write(&first.path().join("index.html"), "v1");
    first_git.add_all().unwrap();
    first_git.commit("Publish site output", false).unwrap();
    first_git.remote_add("origin", &remote_url).unwrap();
    first_git.push("origin", "gh-pages", false).unwrap();

    // A second, unrelated publish directory: divergent history.
    let second = TempDir::new().unwrap();
    let second_git = GitCommand::create(second.path()).unwrap();
    second_git.init(Some("gh-pages")).unwrap();
    write(&second.path().join("index.html"), "v2");
    write(&second.path().join(".nojekyll"), "");
    write(&second.path().join("CNAME"), "https://site.example\n");
    second_git.add_all().unwrap();
    second_git.commit("Publish site output", false).unwrap();
    second_git.remote_add("origin", &remote_url).unwrap();

    assert!(second_git.push("origin", "gh-pages", false).is_err());
    second_git.push("origin", "gh-pages", true).unwrap();

    let remote_files = git_in(
        &remote_dir.path().join("pages.git"),
        &["ls-tree", "-r", "--name-only", "refs/heads/gh-pages"],
    );
    assert!(remote_files.contains(".nojekyll"));
    assert!(remote_files.contains("CNAME"));

    let cname = git_in(
        &remote_dir.path().join("pages.git"),
        &["show", "refs/heads/gh-pages:CNAME"],
    );
    assert_eq!(cname, "https://site.example");
}

#[test]
fn test_overwrite_preserving_source_keeps_user_content_through_task() {
    // OVERWRITE_PUSH's assembly step on a repository with real git
    // metadata: user content under source/ survives a full template swap.
    let workdir = TempDir::new().unwrap();
    let git = GitCommand::create(workdir.path()).unwrap();
    git.init(Some("main")).unwrap();
    write(&workdir.path().join("source/_posts/mine.md"), "user post");
    write(&workdir.path().join("layout.ejs"), "old layout");
    git.add_all().unwrap();
    git.commit("Initial commit.", false).unwrap();

    let template = TempDir::new().unwrap();
    write(&template.path().join("source/_posts/sample.md"), "sample");
    write(&template.path().join("layout.ejs"), "new layout");

    let backup = TempDir::new().unwrap();
    assembly::overwrite_template_preserving_source(
        template.path(),
        FrameworkKind::Hexo,
        workdir.path(),
        backup.path(),
    )
    .unwrap();

    git.add_all().unwrap();
    git.commit("Update site content", true).unwrap();

    assert_eq!(
        std::fs::read_to_string(workdir.path().join("source/_posts/mine.md")).unwrap(),
        "user post"
    );
    assert!(!workdir.path().join("source/_posts/sample.md").exists());
    assert_eq!(
        std::fs::read_to_string(workdir.path().join("layout.ejs")).unwrap(),
        "new layout"
    );
    // The repository is still on its branch with a clean tree.
    assert_eq!(git.branch_current().unwrap(), "main");
}
