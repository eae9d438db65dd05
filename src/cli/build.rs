//! Task runner command (run, list, dry run, watch)

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use super::{Cli, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::{
    BuildContext, BuildPipeline, ConsoleProgress, GraphError, ProgressEvent, ProgressReporter,
    TaskGraph,
};
use crate::config::{load_config, merge_cli_overrides, CliOverrides, ConfigError, LoadedConfig};
use crate::watch::{watch_and_rebuild, WatchOptions, WatchRules};

/// Pseudo-task that starts watch mode.
const WATCH_TASK: &str = "watch";
/// Task run before watching starts.
const INITIAL_TASK: &str = "default";

/// Load the configuration and determine the project root.
///
/// With an explicit path the root is that file's directory. Otherwise
/// assetpipe.toml is searched upward from the current directory, and the
/// defaults rooted at the current directory are used when none is found.
pub fn load_project(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
    verbose: bool,
) -> Result<LoadedConfig, ConfigError> {
    let cwd = std::env::current_dir()
        .map_err(|source| ConfigError::Io { path: PathBuf::from("."), source })?;
    let mut loaded = load_config(config_path, &cwd)?;

    if verbose {
        match &loaded.path {
            Some(path) => println!("Using config: {}", path.display()),
            None => println!("No assetpipe.toml found, using defaults"),
        }
    }

    if !overrides.is_empty() {
        tracing::debug!(?overrides, "applying command-line overrides");
        merge_cli_overrides(&mut loaded.config, overrides);
    }
    Ok(loaded)
}

/// Print every registered task with its dependencies.
fn print_task_list(graph: &TaskGraph) {
    println!("Tasks:");
    let width = graph.nodes().iter().map(|n| n.name.len()).max().unwrap_or(0);
    for node in graph.nodes() {
        println!("  {:width$}  {}", node.name, node.description, width = width);
        if !node.dependencies.is_empty() {
            let deps: Vec<String> = node
                .dependencies
                .iter()
                .map(|d| match d.kind {
                    crate::build::DependencyKind::Requires => d.task.clone(),
                    crate::build::DependencyKind::After => format!("(after {})", d.task),
                })
                .collect();
            println!("  {:width$}    needs: {}", "", deps.join(", "), width = width);
        }
    }
    println!("  {:width$}  Build, then rebuild on file changes", WATCH_TASK, width = width);
}

fn exit_for_graph_error(error: &GraphError) -> ExitCode {
    eprintln!("Error: {}", error);
    match error {
        GraphError::UnknownTask(_) => {
            eprintln!("Run 'assetpipe --list' to see available tasks");
            ExitCode::from(EXIT_INVALID_ARGS)
        }
        _ => ExitCode::from(EXIT_ERROR),
    }
}

/// Print the levels a selection would run in.
fn print_plan(pipeline: &BuildPipeline, tasks: &[String]) -> ExitCode {
    let plan = match pipeline.plan(tasks) {
        Ok(plan) => plan,
        Err(e) => return exit_for_graph_error(&e),
    };
    let levels = match plan.levels() {
        Ok(levels) => levels,
        Err(e) => return exit_for_graph_error(&e),
    };

    println!("Dry run - would run {} task{}:", plan.len(), if plan.len() == 1 { "" } else { "s" });
    println!("  Output: {}", pipeline.context().out_dir().display());
    for (index, level) in levels.iter().enumerate() {
        let names: Vec<&str> = level.iter().map(|t| t.name.as_str()).collect();
        println!("  {}. {}", index + 1, names.join(", "));
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Reject option combinations that cannot run together.
fn check_task_combination(cli: &Cli) -> Result<(), String> {
    if !cli.tasks.iter().any(|t| t == WATCH_TASK) {
        return Ok(());
    }
    if cli.tasks.len() > 1 {
        return Err(format!("'{}' cannot be combined with other tasks", WATCH_TASK));
    }
    if cli.dry_run {
        return Err(format!("'{}' cannot be combined with --dry-run", WATCH_TASK));
    }
    Ok(())
}

fn report_error(reporter: &dyn ProgressReporter, message: String) -> ExitCode {
    reporter.report(ProgressEvent::Error { message });
    ExitCode::from(EXIT_ERROR)
}

fn run_watch(pipeline: &BuildPipeline, reporter: &dyn ProgressReporter) -> ExitCode {
    let context = pipeline.context();
    let watch_config = context.config().watch.clone();

    let rules = match WatchRules::compile(&watch_config.rules) {
        Ok(rules) => rules,
        Err(e) => return report_error(reporter, e.to_string()),
    };
    for task in rules.tasks() {
        if let Err(e) = pipeline.plan(&[task]) {
            eprintln!("Error in [watch] rules:");
            return exit_for_graph_error(&e);
        }
    }

    let options = WatchOptions { watch_dir: context.src_dir(), config: watch_config };

    println!("Starting watch mode...");
    println!("Press Ctrl+C to stop");
    println!();

    match watch_and_rebuild(pipeline, &options, INITIAL_TASK) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => report_error(reporter, format!("Watch error: {}", e)),
    }
}

/// Run the tasks named on the command line.
pub fn run_tasks(cli: &Cli) -> ExitCode {
    let reporter = Arc::new(ConsoleProgress::new().with_verbose(cli.verbose));
    let overrides =
        CliOverrides { out: cli.out.clone(), src: cli.src.clone(), debounce_ms: cli.debounce };
    let loaded = match load_project(cli.config.as_deref(), &overrides, cli.verbose) {
        Ok(loaded) => loaded,
        Err(e) => return report_error(reporter.as_ref(), format!("Error loading config: {}", e)),
    };

    let context = BuildContext::new(loaded.config, loaded.root);
    let mut pipeline =
        BuildPipeline::new(context).with_dry_run(cli.dry_run).with_reporter(reporter.clone());
    if let Some(jobs) = cli.jobs {
        pipeline = pipeline.with_jobs(jobs);
    }

    if cli.list {
        print_task_list(pipeline.graph());
        return ExitCode::from(EXIT_SUCCESS);
    }

    if let Err(message) = check_task_combination(cli) {
        eprintln!("Error: {}", message);
        return ExitCode::from(EXIT_INVALID_ARGS);
    }
    if cli.tasks.iter().any(|t| t == WATCH_TASK) {
        return run_watch(&pipeline, reporter.as_ref());
    }

    if cli.dry_run {
        return print_plan(&pipeline, &cli.tasks);
    }

    tracing::debug!(tasks = ?cli.tasks, jobs = pipeline.jobs(), "starting run");
    match pipeline.run(&cli.tasks) {
        Ok(result) if result.is_success() => {
            if cli.verbose {
                for path in result.all_outputs() {
                    println!("  wrote {}", path.display());
                }
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(result) => {
            tracing::debug!(summary = %result.summary(), "run failed");
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => exit_for_graph_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("assetpipe").chain(args.iter().copied()))
    }

    #[test]
    fn test_task_combinations() {
        assert!(check_task_combination(&cli(&[])).is_ok());
        assert!(check_task_combination(&cli(&["watch"])).is_ok());
        assert!(check_task_combination(&cli(&["default", "--dry-run"])).is_ok());

        let err = check_task_combination(&cli(&["watch", "js:app"])).unwrap_err();
        assert!(err.contains("other tasks"));
        let err = check_task_combination(&cli(&["watch", "--dry-run"])).unwrap_err();
        assert!(err.contains("--dry-run"));
    }

    #[test]
    fn test_report_error_emits_error_event() {
        let recorder = crate::build::RecordingProgress::new();
        report_error(&recorder, "Error loading config: broken".to_string());

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ProgressEvent::Error { message } if message.ends_with("broken")));
    }

    #[test]
    fn test_load_project_explicit_config_sets_root() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("assetpipe.toml");
        fs::write(&path, "[project]\nname = \"site\"\nout = \"public\"\n").unwrap();

        let loaded = load_project(Some(&path), &CliOverrides::default(), false).unwrap();
        assert_eq!(loaded.config.project.name, "site");
        assert_eq!(loaded.config.project.out, PathBuf::from("public"));
        assert_eq!(loaded.root, temp.path());
        assert_eq!(loaded.path, Some(path));
    }

    #[test]
    fn test_load_project_applies_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("assetpipe.toml");
        fs::write(&path, "[project]\nname = \"site\"\n").unwrap();

        let overrides = CliOverrides {
            out: Some(PathBuf::from("build")),
            src: Some(PathBuf::from("web")),
            debounce_ms: Some(300),
        };
        let loaded = load_project(Some(&path), &overrides, false).unwrap();
        assert_eq!(loaded.config.project.out, PathBuf::from("build"));
        assert_eq!(loaded.config.project.src, PathBuf::from("web"));
        assert_eq!(loaded.config.watch.debounce_ms, 300);
    }

    #[test]
    fn test_load_project_missing_explicit_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.toml");
        assert!(matches!(
            load_project(Some(&path), &CliOverrides::default(), false),
            Err(ConfigError::Io { .. })
        ));
    }
}
