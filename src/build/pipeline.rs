//! Level scheduler.
//!
//! Resolves a task selection into a [`RunPlan`], groups it into
//! dependency levels and runs each level on scoped worker threads. A
//! failed task blocks its transitive dependents; independent tasks keep
//! running.
//!
//! # Example
//!
//! ```ignore
//! use assetpipe::build::{BuildContext, BuildPipeline};
//! use assetpipe::config::load_config;
//!
//! let loaded = load_config(None, &std::env::current_dir()?)?;
//! let context = BuildContext::new(loaded.config, loaded.root);
//! let result = BuildPipeline::new(context).with_jobs(4).run(&["default"])?;
//! println!("{}", result.summary());
//! ```

use crate::build::{
    BuildContext, BuildResult, GraphError, NullProgress, ProgressEvent, ProgressReporter, RunPlan,
    TaskError, TaskGraph, TaskKind, TaskNode, TaskOutput, TaskResult, TaskStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Function executing one task.
pub type TaskExecutor =
    dyn Fn(&TaskNode, &BuildContext) -> Result<TaskOutput, TaskError> + Send + Sync;

/// Default number of parallel jobs (uses available parallelism).
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Run a task by dispatching on its kind.
pub fn run_task(node: &TaskNode, ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    match node.kind {
        TaskKind::Styles => crate::styles::compile_styles(ctx),
        TaskKind::VendorCss => crate::concat::bundle_vendor_css(ctx),
        TaskKind::VendorJs => crate::concat::bundle_vendor_js(ctx),
        TaskKind::AppJs => crate::concat::bundle_app_js(ctx),
        TaskKind::CopyHtml => crate::copy::copy_html(ctx),
        TaskKind::CopyImages => crate::copy::copy_images(ctx),
        TaskKind::CopyFonts => crate::copy::copy_fonts(ctx),
        TaskKind::Inject => crate::inject::inject_bundles(ctx),
        TaskKind::Group => Ok(TaskOutput::default()),
    }
}

/// Task scheduler.
pub struct BuildPipeline {
    context: BuildContext,
    graph: TaskGraph,
    jobs: usize,
    dry_run: bool,
    reporter: Arc<dyn ProgressReporter>,
    executor: Arc<TaskExecutor>,
}

impl std::fmt::Debug for BuildPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildPipeline")
            .field("context", &self.context)
            .field("jobs", &self.jobs)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl BuildPipeline {
    /// Scheduler over the standard task graph.
    pub fn new(context: BuildContext) -> Self {
        Self::with_graph(context, TaskGraph::standard())
    }

    /// Scheduler over a custom task graph.
    pub fn with_graph(context: BuildContext, graph: TaskGraph) -> Self {
        Self {
            context,
            graph,
            jobs: default_jobs(),
            dry_run: false,
            reporter: Arc::new(NullProgress::new()),
            executor: Arc::new(run_task),
        }
    }

    /// Set the number of worker threads per level.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Resolve and report the plan without running anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the progress reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the task executor.
    pub fn with_executor<F>(mut self, executor: F) -> Self
    where
        F: Fn(&TaskNode, &BuildContext) -> Result<TaskOutput, TaskError> + Send + Sync + 'static,
    {
        self.executor = Arc::new(executor);
        self
    }

    /// Number of worker threads.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// The build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// The task graph.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Resolve a selection into a plan.
    pub fn plan<S: AsRef<str>>(&self, selection: &[S]) -> Result<RunPlan, GraphError> {
        self.graph.plan(selection)
    }

    /// Resolve a selection and run it.
    pub fn run<S: AsRef<str>>(&self, selection: &[S]) -> Result<BuildResult, GraphError> {
        let plan = self.plan(selection)?;
        self.run_plan(&plan)
    }

    /// Run a resolved plan.
    pub fn run_plan(&self, plan: &RunPlan) -> Result<BuildResult, GraphError> {
        let start = Instant::now();
        let levels = plan.levels()?;

        tracing::debug!(
            tasks = plan.len(),
            levels = levels.len(),
            jobs = self.jobs,
            dry_run = self.dry_run,
            "running plan"
        );
        self.report(ProgressEvent::RunStarted { total_tasks: plan.len() });

        let mut result = BuildResult::new();
        // blocked task -> failed task that caused it
        let mut blocked: HashMap<String, String> = HashMap::new();

        for (index, level) in levels.iter().enumerate() {
            let names: Vec<&str> = level.iter().map(|t| t.name.as_str()).collect();
            tracing::debug!(level = index, tasks = ?names, "starting level");

            let (held, runnable): (Vec<&TaskNode>, Vec<&TaskNode>) =
                level.iter().copied().partition(|t| blocked.contains_key(&t.name));

            let mut level_results: HashMap<String, TaskResult> = HashMap::new();
            for task in held {
                let by = blocked.get(&task.name).cloned().unwrap_or_default();
                level_results.insert(task.name.clone(), TaskResult::blocked(task.name.clone(), by));
            }
            for task_result in self.execute_level(&runnable) {
                level_results.insert(task_result.task.clone(), task_result);
            }

            for task in level {
                let Some(task_result) = level_results.remove(&task.name) else {
                    continue;
                };

                if let TaskStatus::Failed(_) = task_result.status {
                    for dependent in plan.dependents_of(&task.name) {
                        blocked.entry(dependent).or_insert_with(|| task.name.clone());
                    }
                }

                self.report_result(&task_result);
                result.add_result(task_result);
            }
        }

        let result = result.with_duration(start.elapsed());
        self.report(ProgressEvent::RunCompleted {
            success: result.is_success(),
            duration_ms: result.total_duration.as_millis() as u64,
            succeeded: result.success_count(),
            failed: result.failed_count(),
            blocked: result.blocked_count(),
        });

        Ok(result)
    }

    /// Execute the tasks of one level, returning results in input order.
    fn execute_level(&self, tasks: &[&TaskNode]) -> Vec<TaskResult> {
        if tasks.is_empty() {
            return vec![];
        }

        if self.jobs == 1 || tasks.len() == 1 {
            return tasks.iter().map(|t| self.execute_task(t)).collect();
        }

        let results: Mutex<Vec<(usize, TaskResult)>> = Mutex::new(Vec::new());
        let next_idx = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..self.jobs.min(tasks.len()) {
                s.spawn(|| loop {
                    let idx = next_idx.fetch_add(1, Ordering::SeqCst);
                    if idx >= tasks.len() {
                        break;
                    }
                    let task_result = self.execute_task(tasks[idx]);
                    if let Ok(mut results) = results.lock() {
                        results.push((idx, task_result));
                    }
                });
            }
        });

        let mut results = results.into_inner().unwrap_or_else(|e| e.into_inner());
        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, r)| r).collect()
    }

    /// Execute a single task.
    fn execute_task(&self, task: &TaskNode) -> TaskResult {
        if self.dry_run {
            return TaskResult::skipped(task.name.clone());
        }

        self.report(ProgressEvent::TaskStarted { task: task.name.clone() });
        tracing::debug!(task = %task.name, "task started");
        let start = Instant::now();

        match (self.executor)(task, &self.context) {
            Ok(output) => {
                let duration = start.elapsed();
                tracing::debug!(task = %task.name, files = output.files.len(), ?duration, "task finished");
                TaskResult::success(task.name.clone(), output, duration)
            }
            Err(e) => {
                tracing::debug!(task = %task.name, error = %e, "task failed");
                if e.is_compile_error() {
                    let notify = &self.context.config().notify;
                    self.report(ProgressEvent::Notification {
                        title: notify.title.clone(),
                        subtitle: notify.subtitle.clone(),
                        message: e.to_string(),
                        bell: notify.bell,
                    });
                }
                TaskResult::failed(task.name.clone(), e.to_string(), start.elapsed())
            }
        }
    }

    fn report_result(&self, task_result: &TaskResult) {
        for warning in &task_result.warnings {
            tracing::warn!(task = %task_result.task, "{}", warning);
            self.report(ProgressEvent::Warning {
                task: Some(task_result.task.clone()),
                message: warning.clone(),
            });
        }
        self.report(ProgressEvent::TaskCompleted {
            task: task_result.task.clone(),
            status: task_result.status.clone(),
            duration_ms: task_result.duration.as_millis() as u64,
        });
    }

    fn report(&self, event: ProgressEvent) {
        self.reporter.report(event);
    }
}
