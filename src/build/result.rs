//! Task and run result types.

use std::path::PathBuf;
use std::time::Duration;

/// Outcome of a single task in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task completed
    Success,
    /// Task was planned but not executed (dry run)
    Skipped,
    /// Task returned an error
    Failed(String),
    /// Task did not run because a predecessor failed
    Blocked(String),
}

impl TaskStatus {
    /// Success or skipped.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Skipped)
    }

    /// Failed or blocked.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed(_) | TaskStatus::Blocked(_))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Failed(err) => write!(f, "failed: {}", err),
            TaskStatus::Blocked(by) => write!(f, "blocked by {}", by),
        }
    }
}

/// Files produced by a task plus non-fatal warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    /// Files written
    pub files: Vec<PathBuf>,
    /// Warnings raised while running
    pub warnings: Vec<String>,
}

impl TaskOutput {
    /// Output consisting of the given files.
    pub fn files(files: Vec<PathBuf>) -> Self {
        Self { files, warnings: vec![] }
    }

    /// Attach a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Result of running one task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task name
    pub task: String,
    /// Final status
    pub status: TaskStatus,
    /// Output files produced
    pub outputs: Vec<PathBuf>,
    /// Time spent running the task
    pub duration: Duration,
    /// Warning messages
    pub warnings: Vec<String>,
}

impl TaskResult {
    /// Result of a task that completed.
    pub fn success(task: String, output: TaskOutput, duration: Duration) -> Self {
        Self {
            task,
            status: TaskStatus::Success,
            outputs: output.files,
            duration,
            warnings: output.warnings,
        }
    }

    /// Result of a task that was not executed.
    pub fn skipped(task: String) -> Self {
        Self {
            task,
            status: TaskStatus::Skipped,
            outputs: vec![],
            duration: Duration::ZERO,
            warnings: vec![],
        }
    }

    /// Result of a task that returned an error.
    pub fn failed(task: String, error: String, duration: Duration) -> Self {
        Self {
            task,
            status: TaskStatus::Failed(error),
            outputs: vec![],
            duration,
            warnings: vec![],
        }
    }

    /// Result of a task held back by a failed predecessor.
    pub fn blocked(task: String, by: String) -> Self {
        Self {
            task,
            status: TaskStatus::Blocked(by),
            outputs: vec![],
            duration: Duration::ZERO,
            warnings: vec![],
        }
    }

    /// Whether the task succeeded (or was skipped).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results in plan order
    pub tasks: Vec<TaskResult>,
    /// Wall-clock duration of the run
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task result.
    pub fn add_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Look up the result of a task by name.
    pub fn get(&self, task: &str) -> Option<&TaskResult> {
        self.tasks.iter().find(|r| r.task == task)
    }

    /// Number of tasks that completed.
    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status == TaskStatus::Success).count()
    }

    /// Number of tasks not executed.
    pub fn skipped_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status == TaskStatus::Skipped).count()
    }

    /// Number of tasks that returned an error.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, TaskStatus::Failed(_))).count()
    }

    /// Number of tasks held back by a failure.
    pub fn blocked_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, TaskStatus::Blocked(_))).count()
    }

    /// No task failed or was blocked.
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(TaskResult::is_success)
    }

    /// All files produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.tasks.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// All warnings.
    pub fn all_warnings(&self) -> Vec<&String> {
        self.tasks.iter().flat_map(|r| r.warnings.iter()).collect()
    }

    /// Failed and blocked results.
    pub fn failures(&self) -> Vec<&TaskResult> {
        self.tasks.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Human-readable summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let skipped = self.skipped_count();
        let failed = self.failed_count();
        let blocked = self.blocked_count();
        let total = self.tasks.len();

        if self.is_success() {
            lines.push(format!(
                "Run succeeded: {} ran, {} skipped ({} total) in {:?}",
                success, skipped, total, self.total_duration
            ));
        } else {
            lines.push(format!(
                "Run failed: {} succeeded, {} failed, {} blocked ({} total)",
                success, failed, blocked, total
            ));
            for task in self.failures() {
                lines.push(format!("  - {}: {}", task.task, task.status));
            }
        }

        let warnings = self.all_warnings();
        if !warnings.is_empty() {
            lines.push(format!("Warnings ({}):", warnings.len()));
            for warning in warnings.iter().take(5) {
                lines.push(format!("  - {}", warning));
            }
            if warnings.len() > 5 {
                lines.push(format!("  ... and {} more", warnings.len() - 5));
            }
        }

        lines.join("\n")
    }
}
