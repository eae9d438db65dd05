//! Run progress reporting.
//!
//! The scheduler emits [`ProgressEvent`]s; reporters render them. The
//! console reporter colors its output when stderr is a terminal and turns
//! compile failures into notifications (title, subtitle, message and an
//! optional terminal bell).

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::build::TaskStatus;

/// Events reported during a run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    RunStarted {
        /// Number of tasks in the plan
        total_tasks: usize,
    },
    /// A task started
    TaskStarted {
        /// Task name
        task: String,
    },
    /// A task finished (or was blocked)
    TaskCompleted {
        /// Task name
        task: String,
        /// Final status
        status: TaskStatus,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// Run finished
    RunCompleted {
        /// Whether every task succeeded
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        /// Tasks that completed
        succeeded: usize,
        /// Tasks that failed
        failed: usize,
        /// Tasks held back by failures
        blocked: usize,
    },
    /// A non-fatal warning
    Warning {
        /// Task that raised the warning, if any
        task: Option<String>,
        /// Warning message
        message: String,
    },
    /// A recoverable error surfaced to the user as a desktop-style notice
    Notification {
        /// Notification title
        title: String,
        /// Notification subtitle
        subtitle: String,
        /// Body (the compiler message)
        message: String,
        /// Ring the terminal bell
        bell: bool,
    },
    /// An error outside any task
    Error {
        /// Error message
        message: String,
    },
}

/// Receives progress events.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);
}

/// Discards all events. The scheduler's default reporter.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a null reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of notifications received.
    pub fn notification_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Notification { .. }))
            .count()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// ANSI color used for a label.
#[derive(Debug, Clone, Copy)]
enum Tone {
    Green,
    Yellow,
    Red,
    Cyan,
    Bold,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Tone::Green => "32",
            Tone::Yellow => "33",
            Tone::Red => "31",
            Tone::Cyan => "36",
            Tone::Bold => "1",
        }
    }
}

/// Console reporter with optional colors.
///
/// Lines are rendered first and then written under one lock, so output
/// from tasks finishing on different workers never interleaves.
pub struct ConsoleProgress {
    colored: bool,
    verbose: bool,
    finished: AtomicUsize,
    planned: AtomicUsize,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("colored", &self.colored)
            .field("verbose", &self.verbose)
            .field("finished", &self.finished.load(Ordering::Relaxed))
            .field("planned", &self.planned.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ConsoleProgress {
    fn to_sink(sink: Box<dyn Write + Send>, colored: bool) -> Self {
        Self {
            colored,
            verbose: false,
            finished: AtomicUsize::new(0),
            planned: AtomicUsize::new(0),
            sink: Mutex::new(sink),
        }
    }

    /// Reporter writing to stderr, colored when stderr is a terminal.
    pub fn new() -> Self {
        Self::to_sink(Box::new(std::io::stderr()), atty::is(atty::Stream::Stderr))
    }

    /// Reporter writing to a custom output, without colors.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self::to_sink(Box::new(output), false)
    }

    /// Force colors on or off.
    pub fn with_colors(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Also print a line when each task starts.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn tint(&self, tone: Tone, text: &str) -> String {
        if self.colored {
            format!("\x1b[{}m{}\x1b[0m", tone.code(), text)
        } else {
            text.to_string()
        }
    }

    fn emit(&self, text: &str) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.write_all(text.as_bytes());
            let _ = sink.flush();
        }
    }

    fn status_label(&self, status: &TaskStatus) -> String {
        match status {
            TaskStatus::Success => self.tint(Tone::Green, "ok"),
            TaskStatus::Skipped => self.tint(Tone::Yellow, "planned"),
            TaskStatus::Failed(_) => self.tint(Tone::Red, "FAILED"),
            TaskStatus::Blocked(_) => self.tint(Tone::Yellow, "blocked"),
        }
    }

    /// Text for one event, `None` when the event is not shown.
    fn render(&self, event: ProgressEvent) -> Option<String> {
        let tag = self.tint(Tone::Cyan, "[run]");
        let text = match event {
            ProgressEvent::RunStarted { total_tasks } => {
                self.planned.store(total_tasks, Ordering::SeqCst);
                self.finished.store(0, Ordering::SeqCst);
                if total_tasks == 0 {
                    return None;
                }
                let noun = if total_tasks == 1 { "task" } else { "tasks" };
                format!("{tag} Running {total_tasks} {noun}...\n")
            }
            ProgressEvent::TaskStarted { task } => {
                if !self.verbose {
                    return None;
                }
                format!("{tag} Starting '{task}'...\n")
            }
            ProgressEvent::TaskCompleted { task, status, duration_ms } => {
                let n = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
                let of = self.planned.load(Ordering::SeqCst);
                let mut text = format!(
                    "{tag} [{n}/{of}] {} {task} ({})\n",
                    self.status_label(&status),
                    format_duration(duration_ms)
                );
                match status {
                    TaskStatus::Failed(reason) => {
                        text.push_str(&format!("        {}\n", self.tint(Tone::Red, &reason)))
                    }
                    TaskStatus::Blocked(by) => {
                        text.push_str(&format!("        waiting on failed task '{by}'\n"))
                    }
                    TaskStatus::Success | TaskStatus::Skipped => {}
                }
                text
            }
            ProgressEvent::RunCompleted { success: true, duration_ms, succeeded, .. } => {
                let noun = if succeeded == 1 { "task" } else { "tasks" };
                format!(
                    "{} {} {noun} finished in {}\n",
                    self.tint(Tone::Green, "[done]"),
                    self.tint(Tone::Bold, &succeeded.to_string()),
                    format_duration(duration_ms)
                )
            }
            ProgressEvent::RunCompleted { success: false, duration_ms, succeeded, failed, blocked } => {
                let noun = if failed == 1 { "failure" } else { "failures" };
                format!(
                    "{} Run failed: {succeeded} succeeded, {failed} {noun}, {blocked} blocked in {}\n",
                    self.tint(Tone::Red, "[error]"),
                    format_duration(duration_ms)
                )
            }
            ProgressEvent::Warning { task, message } => match task {
                Some(task) => format!("{} {task}: {message}\n", self.tint(Tone::Yellow, "[warn]")),
                None => format!("{} {message}\n", self.tint(Tone::Yellow, "[warn]")),
            },
            ProgressEvent::Notification { title, subtitle, message, bell } => format!(
                "{}{} {} {message}\n",
                if bell { "\x07" } else { "" },
                self.tint(Tone::Red, &format!("[{title}]")),
                self.tint(Tone::Bold, &subtitle)
            ),
            ProgressEvent::Error { message } => {
                format!("{} {message}\n", self.tint(Tone::Red, "[error]"))
            }
        };
        Some(text)
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        if let Some(text) = self.render(event) {
            self.emit(&text);
        }
    }
}

/// Human-readable duration: `850ms`, `2.4s`, `1m 05s`.
fn format_duration(ms: u64) -> String {
    match ms {
        0..=999 => format!("{ms}ms"),
        1_000..=59_999 => format!("{:.1}s", ms as f64 / 1000.0),
        _ => format!("{}m {:02}s", ms / 60_000, (ms / 1000) % 60),
    }
}
