//! Watch mode for automatic rebuilds on file changes
//!
//! Changed paths are matched against the watch rules; each matching rule
//! names the subsequence to re-run. Rebuilds never overlap: changes seen
//! while a rebuild runs are queued, and each subsequence is queued at most
//! once.

use glob::{MatchOptions, Pattern};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEvent, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::build::BuildPipeline;
use crate::config::schema::{WatchConfig, WatchRule};

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// Source directory not found
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// A rule pattern does not parse
    #[error("Invalid watch pattern '{pattern}': {message}")]
    Pattern {
        /// The offending pattern
        pattern: String,
        /// Parser message
        message: String,
    },
}

/// Coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for changes
    Idle,
    /// Running the named subsequence
    Rebuilding(String),
}

/// Compiled watch rules.
#[derive(Debug, Clone)]
pub struct WatchRules {
    rules: Vec<(Pattern, String)>,
}

impl WatchRules {
    /// Compile rules, keeping their order.
    pub fn compile(rules: &[WatchRule]) -> Result<Self, WatchError> {
        let rules = rules
            .iter()
            .map(|r| {
                Pattern::new(&r.pattern)
                    .map(|p| (p, r.task.clone()))
                    .map_err(|e| WatchError::Pattern {
                        pattern: r.pattern.clone(),
                        message: e.msg.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Tasks triggered by a path relative to the source directory, in rule order.
    pub fn tasks_for(&self, relative: &Path) -> Vec<&str> {
        let options = MatchOptions { require_literal_separator: true, ..MatchOptions::new() };
        let mut tasks: Vec<&str> = Vec::new();
        for (pattern, task) in &self.rules {
            if pattern.matches_path_with(relative, options) && !tasks.contains(&task.as_str()) {
                tasks.push(task);
            }
        }
        tasks
    }

    /// Position of the first rule naming `task`.
    fn rank(&self, task: &str) -> usize {
        self.rules.iter().position(|(_, t)| t == task).unwrap_or(usize::MAX)
    }

    /// Every task named by a rule.
    pub fn tasks(&self) -> Vec<&str> {
        let mut tasks: Vec<&str> = Vec::new();
        for (_, task) in &self.rules {
            if !tasks.contains(&task.as_str()) {
                tasks.push(task);
            }
        }
        tasks
    }
}

/// Decides which subsequence to rebuild next.
#[derive(Debug, Clone)]
pub struct WatchCoordinator {
    rules: WatchRules,
    state: WatchState,
    pending: Vec<String>,
}

impl WatchCoordinator {
    /// Create an idle coordinator.
    pub fn new(rules: WatchRules) -> Self {
        Self { rules, state: WatchState::Idle, pending: Vec::new() }
    }

    /// Current state.
    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Subsequences waiting to run, in rule order.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Record a changed path (relative to the source directory).
    ///
    /// Returns the subsequences the change triggered.
    pub fn record(&mut self, relative: &Path) -> Vec<String> {
        let triggered: Vec<String> =
            self.rules.tasks_for(relative).into_iter().map(str::to_string).collect();

        for task in &triggered {
            if !self.pending.contains(task) {
                self.pending.push(task.clone());
            }
        }
        let rules = &self.rules;
        self.pending.sort_by_key(|t| rules.rank(t));

        triggered
    }

    /// Start the next pending rebuild, if idle.
    pub fn begin_next(&mut self) -> Option<String> {
        if self.state != WatchState::Idle || self.pending.is_empty() {
            return None;
        }
        let task = self.pending.remove(0);
        self.state = WatchState::Rebuilding(task.clone());
        Some(task)
    }

    /// Mark the running rebuild as finished.
    pub fn finish(&mut self) {
        self.state = WatchState::Idle;
    }
}

/// Options for watch mode
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory to watch recursively; rule patterns are relative to it
    pub watch_dir: PathBuf,
    /// Watch configuration (debounce, clear screen, rules)
    pub config: WatchConfig,
}

/// Clear the terminal screen
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Path of `path` relative to `root`, tolerating symlinked roots.
fn relative_to(path: &Path, root: &Path, canonical_root: &Path) -> Option<PathBuf> {
    path.strip_prefix(root)
        .or_else(|_| path.strip_prefix(canonical_root))
        .map(Path::to_path_buf)
        .ok()
}

/// Feed a debounced batch into the coordinator.
fn record_events(
    coordinator: &mut WatchCoordinator,
    events: Vec<DebouncedEvent>,
    (root, canonical_root): &(&Path, &Path),
) {
    for event in events {
        if !matches!(event.kind, DebouncedEventKind::Any) {
            continue;
        }
        let Some(relative) = relative_to(&event.path, root, canonical_root) else {
            continue;
        };
        let triggered = coordinator.record(&relative);
        if !triggered.is_empty() {
            tracing::debug!(path = %relative.display(), tasks = ?triggered, "change");
            println!("[{}] Changed: {}", timestamp(), relative.display());
        }
    }
}

/// Feed one watcher result into the coordinator, reporting watcher errors.
///
/// Returns `false` for an error batch.
fn handle_batch(
    coordinator: &mut WatchCoordinator,
    batch: DebounceEventResult,
    roots: &(&Path, &Path),
) -> bool {
    match batch {
        Ok(events) => {
            record_events(coordinator, events, roots);
            true
        }
        Err(error) => {
            tracing::warn!(?error, "watch error");
            eprintln!("[{}] Watch error: {:?}", timestamp(), error);
            false
        }
    }
}

/// Run one subsequence and print a one-line outcome.
fn rebuild(pipeline: &BuildPipeline, task: &str) {
    let start = Instant::now();
    println!("[{}] Running '{}'...", timestamp(), task);

    match pipeline.run(&[task]) {
        Ok(result) if result.is_success() => {
            println!(
                "[{}] '{}' finished ({}) - {} task{}",
                timestamp(),
                task,
                format_duration(start.elapsed()),
                result.success_count(),
                if result.success_count() == 1 { "" } else { "s" }
            );
        }
        Ok(result) => {
            eprintln!(
                "[{}] '{}' failed ({})\n{}",
                timestamp(),
                task,
                format_duration(start.elapsed()),
                result.summary()
            );
        }
        Err(e) => {
            eprintln!("[{}] '{}' could not run: {}", timestamp(), task, e);
        }
    }
}

/// Watch for file changes and rebuild automatically.
///
/// Runs `initial` once, then blocks until interrupted (Ctrl+C).
///
/// # Returns
/// * `Err(WatchError)` if watch setup fails or the event channel closes
pub fn watch_and_rebuild(
    pipeline: &BuildPipeline,
    options: &WatchOptions,
    initial: &str,
) -> Result<(), WatchError> {
    if !options.watch_dir.exists() {
        return Err(WatchError::SourceNotFound(options.watch_dir.clone()));
    }

    let rules = WatchRules::compile(&options.config.rules)?;
    let mut coordinator = WatchCoordinator::new(rules);
    let canonical_root =
        options.watch_dir.canonicalize().unwrap_or_else(|_| options.watch_dir.clone());
    let roots = (options.watch_dir.as_path(), canonical_root.as_path());

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(options.config.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    debouncer
        .watcher()
        .watch(&options.watch_dir, RecursiveMode::Recursive)
        .map_err(WatchError::WatchPath)?;

    if options.config.clear_screen {
        clear_screen();
    }
    rebuild(pipeline, initial);
    println!("[{}] Watching {} for changes...", timestamp(), options.watch_dir.display());

    loop {
        match rx.recv() {
            Ok(batch) => {
                handle_batch(&mut coordinator, batch, &roots);
            }
            Err(e) => return Err(WatchError::Channel(e.to_string())),
        }

        while let Some(task) = coordinator.begin_next() {
            if options.config.clear_screen {
                clear_screen();
            }
            rebuild(pipeline, &task);

            // Changes that arrived during the rebuild
            while let Ok(batch) = rx.try_recv() {
                handle_batch(&mut coordinator, batch, &roots);
            }
            coordinator.finish();
        }

        println!("[{}] Watching {} for changes...", timestamp(), options.watch_dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildContext;
    use crate::config::default_config;
    use tempfile::TempDir;

    fn coordinator() -> WatchCoordinator {
        WatchCoordinator::new(WatchRules::compile(&WatchConfig::default().rules).unwrap())
    }

    #[test]
    fn test_rules_match_relative_paths() {
        let rules = WatchRules::compile(&WatchConfig::default().rules).unwrap();
        assert_eq!(rules.tasks_for(Path::new("sass/main.sass")), vec!["build:styles"]);
        assert_eq!(rules.tasks_for(Path::new("main.sass")), vec!["build:styles"]);
        assert_eq!(rules.tasks_for(Path::new("index.html")), vec!["build:html"]);
        assert_eq!(rules.tasks_for(Path::new("js/main.js")), vec!["build:js"]);
        assert!(rules.tasks_for(Path::new("partials/nav.html")).is_empty());
        assert!(rules.tasks_for(Path::new("css/style.css")).is_empty());
    }

    #[test]
    fn test_rules_invalid_pattern() {
        let err = WatchRules::compile(&[WatchRule::new("js/[", "build:js")]).unwrap_err();
        assert!(matches!(err, WatchError::Pattern { .. }));
    }

    #[test]
    fn test_idle_to_rebuilding_and_back() {
        let mut c = coordinator();
        assert_eq!(c.state(), &WatchState::Idle);
        assert_eq!(c.begin_next(), None);

        c.record(Path::new("sass/main.sass"));
        assert_eq!(c.begin_next(), Some("build:styles".to_string()));
        assert_eq!(c.state(), &WatchState::Rebuilding("build:styles".to_string()));

        c.finish();
        assert_eq!(c.state(), &WatchState::Idle);
        assert_eq!(c.begin_next(), None);
    }

    #[test]
    fn test_events_during_rebuild_coalesce() {
        let mut c = coordinator();
        c.record(Path::new("js/main.js"));
        assert_eq!(c.begin_next(), Some("build:js".to_string()));

        for _ in 0..3 {
            c.record(Path::new("js/main.js"));
        }
        assert_eq!(c.pending(), &["build:js".to_string()]);
        assert_eq!(c.begin_next(), None);

        c.finish();
        assert_eq!(c.begin_next(), Some("build:js".to_string()));
        c.finish();
        assert_eq!(c.begin_next(), None);
    }

    #[test]
    fn test_pending_runs_in_rule_order() {
        let mut c = coordinator();
        c.record(Path::new("js/main.js"));
        c.record(Path::new("index.html"));
        c.record(Path::new("sass/main.sass"));

        assert_eq!(
            c.pending(),
            &["build:styles".to_string(), "build:html".to_string(), "build:js".to_string()]
        );
    }

    #[test]
    fn test_unmatched_change_is_ignored() {
        let mut c = coordinator();
        assert!(c.record(Path::new("README.md")).is_empty());
        assert!(c.pending().is_empty());
    }

    #[test]
    fn test_relative_to() {
        let rel = relative_to(Path::new("/p/src/a.js"), Path::new("/p"), Path::new("/real/p"));
        assert_eq!(rel, Some(PathBuf::from("src/a.js")));
        let rel = relative_to(Path::new("/real/p/src/a.js"), Path::new("/p"), Path::new("/real/p"));
        assert_eq!(rel, Some(PathBuf::from("src/a.js")));
        assert_eq!(relative_to(Path::new("/q/a.js"), Path::new("/p"), Path::new("/p")), None);
    }

    #[test]
    fn test_changes_under_custom_source_directory_trigger_rules() {
        let rules = WatchRules::compile(&WatchConfig::default().rules).unwrap();
        let watch_dir = Path::new("/site/web");

        let html = relative_to(Path::new("/site/web/index.html"), watch_dir, watch_dir).unwrap();
        assert_eq!(rules.tasks_for(&html), vec!["build:html"]);
        let sass = relative_to(Path::new("/site/web/sass/main.sass"), watch_dir, watch_dir).unwrap();
        assert_eq!(rules.tasks_for(&sass), vec!["build:styles"]);
    }

    #[test]
    fn test_error_batches_are_reported_not_recorded() {
        let mut c = coordinator();
        let root = Path::new("/site/src");
        let roots = (root, root);

        let error: DebounceEventResult = Err(notify::Error::generic("inotify limit"));
        assert!(!handle_batch(&mut c, error, &roots));
        assert!(c.pending().is_empty());

        let events = vec![DebouncedEvent {
            path: PathBuf::from("/site/src/js/main.js"),
            kind: DebouncedEventKind::Any,
        }];
        assert!(handle_batch(&mut c, Ok(events), &roots));
        assert_eq!(c.pending(), &["build:js".to_string()]);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_watch_error_source_not_found() {
        let temp = TempDir::new().unwrap();
        let pipeline =
            BuildPipeline::new(BuildContext::new(default_config(), temp.path().to_path_buf()));
        let options = WatchOptions {
            watch_dir: temp.path().join("missing"),
            config: WatchConfig::default(),
        };

        let err = watch_and_rebuild(&pipeline, &options, "default").unwrap_err();
        assert!(matches!(err, WatchError::SourceNotFound(_)));
        assert!(err.to_string().contains("missing"));
    }
}
