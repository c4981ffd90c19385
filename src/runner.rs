//! Task acquisition and completion reporting.
//!
//! The backend transport is deliberately behind traits: the worker core only
//! needs "give me the next task" and "this task finished / failed". The
//! bundled implementations read descriptors from a JSON file (or stdin) and
//! report through the log, which is what container deployments collect.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::fetch::RepositoryFetcher;
use crate::task::TaskDescriptor;
use crate::workflow::GitWorkflow;

pub trait TaskSource {
    /// Next task to execute, or `None` when the source is drained.
    fn next_task(&mut self) -> Result<Option<TaskDescriptor>>;
}

pub trait TaskReporter {
    fn report_success(&self, task: &TaskDescriptor) -> Result<()>;
    fn report_failure(&self, task: &TaskDescriptor, error: &anyhow::Error) -> Result<()>;
}

/// Tasks parsed from a JSON document: either one descriptor or an array.
pub struct JsonTaskSource {
    // Reversed so next_task can pop from the back in order.
    tasks: Vec<TaskDescriptor>,
}

impl JsonTaskSource {
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .context("Failed to read task input")?;
        Self::parse(&raw)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read task file {}", path.display()))?;
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> Result<Self> {
        let mut tasks = match serde_json::from_str::<Vec<TaskDescriptor>>(raw) {
            Ok(tasks) => tasks,
            Err(_) => vec![serde_json::from_str::<TaskDescriptor>(raw)
                .context("Failed to parse task descriptor JSON")?],
        };
        tasks.reverse();
        Ok(JsonTaskSource { tasks })
    }
}

impl TaskSource for JsonTaskSource {
    fn next_task(&mut self) -> Result<Option<TaskDescriptor>> {
        Ok(self.tasks.pop())
    }
}

/// Reports task completion through the log.
pub struct LogReporter;

impl TaskReporter for LogReporter {
    fn report_success(&self, task: &TaskDescriptor) -> Result<()> {
        log::info!("Task {} ({}) finished", task.id, task.method);
        Ok(())
    }

    fn report_failure(&self, task: &TaskDescriptor, error: &anyhow::Error) -> Result<()> {
        log::error!("Task {} ({}) failed: {error:#}", task.id, task.method);
        Ok(())
    }
}

/// Execute one task and report its outcome exactly once.
pub fn run_task(
    task: &TaskDescriptor,
    fetcher: &dyn RepositoryFetcher,
    reporter: &dyn TaskReporter,
) -> Result<()> {
    let outcome = GitWorkflow::new(task, fetcher).and_then(|workflow| workflow.run());
    match &outcome {
        Ok(()) => reporter.report_success(task)?,
        Err(error) => reporter.report_failure(task, error)?,
    }
    outcome
}
