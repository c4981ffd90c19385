use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use meta_git_worker::fetch::GitCloneFetcher;
use meta_git_worker::logger;
use meta_git_worker::runner::{self, JsonTaskSource, LogReporter, TaskSource};

#[derive(Parser)]
#[command(name = "meta-git-worker")]
#[command(about = "Task-driven git worker for static-site repositories", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the tasks in a JSON descriptor document
    Run {
        /// Path to the task document, or '-' to read from stdin
        #[arg(short, long)]
        task: PathBuf,
    },
}

fn main() -> Result<()> {
    logger::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { task } => run_tasks(&task),
    }
}

fn run_tasks(task_path: &Path) -> Result<()> {
    let mut source = if task_path == Path::new("-") {
        JsonTaskSource::from_reader(std::io::stdin().lock())?
    } else {
        JsonTaskSource::from_path(task_path)?
    };

    let fetcher = GitCloneFetcher;
    let reporter = LogReporter;
    let mut completed = 0usize;
    let mut failed = 0usize;

    while let Some(task) = source.next_task()? {
        println!(
            "{} task {} ({})",
            "Running".cyan().bold(),
            task.id,
            task.method
        );
        match runner::run_task(&task, &fetcher, &reporter) {
            Ok(()) => {
                completed += 1;
                println!("  {} Task {} finished", "✓".green(), task.id);
            }
            Err(error) => {
                failed += 1;
                println!("  {} Task {} failed: {error:#}", "✗".red(), task.id);
            }
        }
    }

    println!(
        "\n{} {completed} completed, {failed} failed",
        "Done:".bold()
    );
    if failed > 0 {
        bail!("{failed} task(s) failed");
    }
    Ok(())
}
