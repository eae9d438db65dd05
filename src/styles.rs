//! Style compilation.
//!
//! Compiles every style entry point with grass, concatenates the results,
//! adds vendor prefixes for the configured browser targets with
//! lightningcss, and writes an expanded and a minified stylesheet.
//!
//! Both outputs are printed from the same lightningcss AST after its
//! minify pass, since that pass is what applies the prefixes. "Expanded"
//! therefore means pretty-printed, not untransformed: colors may be
//! shortened (`#336699` becomes `#369`) and duplicate rules merged.

use crate::build::{discover_all, write_output, BuildContext, SourceFile, TaskError, TaskOutput};
use grass::{Options, OutputStyle};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::path::{Path, PathBuf};

/// Prefixed stylesheet in both output forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedCss {
    /// Readable output
    pub expanded: String,
    /// Minified output
    pub minified: String,
}

/// Whether a style source is a partial (only reachable through imports).
pub fn is_partial(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('_'))
}

/// Resolve browserslist queries into lightningcss targets.
///
/// An empty query list means no prefixing.
pub fn browser_targets(queries: &[String]) -> Result<Targets, TaskError> {
    if queries.is_empty() {
        return Ok(Targets::default());
    }
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str)).map_err(|e| {
        TaskError::Css { file: PathBuf::from("styles.browsers"), message: e.to_string() }
    })?;
    Ok(browsers.map(Targets::from).unwrap_or_default())
}

/// Compile a single entry point.
pub fn compile_entry(entry: &Path, load_paths: &[PathBuf]) -> Result<String, TaskError> {
    let mut paths: Vec<PathBuf> = Vec::with_capacity(load_paths.len() + 1);
    if let Some(parent) = entry.parent() {
        paths.push(parent.to_path_buf());
    }
    paths.extend(load_paths.iter().cloned());

    let options = Options::default().load_paths(&paths).style(OutputStyle::Expanded);

    tracing::trace!(entry = %entry.display(), "compiling style entry");
    grass::from_path(entry, &options)
        .map_err(|e| TaskError::Compile { file: entry.to_path_buf(), message: e.to_string() })
}

/// Prefix and print CSS for the given targets.
///
/// `file` only labels errors.
pub fn prefix_css(css: &str, targets: Targets, file: &Path) -> Result<PrefixedCss, TaskError> {
    let css_error = |message: String| TaskError::Css { file: file.to_path_buf(), message };

    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions { filename: file.to_string_lossy().into_owned(), ..Default::default() },
    )
    .map_err(|e| css_error(e.to_string()))?;

    stylesheet
        .minify(MinifyOptions { targets, ..Default::default() })
        .map_err(|e| css_error(e.to_string()))?;

    let expanded = stylesheet
        .to_css(PrinterOptions { minify: false, targets, ..Default::default() })
        .map_err(|e| css_error(e.to_string()))?
        .code;
    let minified = stylesheet
        .to_css(PrinterOptions { minify: true, targets, ..Default::default() })
        .map_err(|e| css_error(e.to_string()))?
        .code;

    Ok(PrefixedCss { expanded, minified })
}

/// Style entry points: matched sources minus partials.
pub fn entry_points(ctx: &BuildContext) -> Result<Vec<SourceFile>, TaskError> {
    let sources = &ctx.config().styles.sources;
    let mut entries: Vec<SourceFile> = discover_all(&ctx.src_dir(), sources)?
        .into_iter()
        .filter(|f| !is_partial(&f.path))
        .collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Run the `styles` task.
pub fn compile_styles(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let styles = &ctx.config().styles;
    let load_paths: Vec<PathBuf> = styles.load_paths.iter().map(|p| ctx.resolve_path(p)).collect();

    let entries = entry_points(ctx)?;
    tracing::debug!(entries = entries.len(), "compiling styles");

    let mut compiled = Vec::with_capacity(entries.len());
    for entry in &entries {
        compiled.push(compile_entry(&entry.path, &load_paths)?);
    }
    let aggregated = compiled.join("\n");

    let expanded_path = ctx.expanded_stylesheet();
    let minified_path = ctx.minified_stylesheet();

    let targets = browser_targets(&styles.browsers)?;
    let css = prefix_css(&aggregated, targets, &expanded_path)?;

    write_output(&expanded_path, &css.expanded)?;
    write_output(&minified_path, &css.minified)?;

    Ok(TaskOutput::files(vec![expanded_path, minified_path]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::fs;
    use tempfile::TempDir;

    fn ctx(root: &Path) -> BuildContext {
        BuildContext::new(default_config(), root.to_path_buf())
    }

    #[test]
    fn test_is_partial() {
        assert!(is_partial(Path::new("src/sass/_variables.sass")));
        assert!(!is_partial(Path::new("src/sass/main.sass")));
    }

    #[test]
    fn test_compile_entry_scss() {
        let temp = TempDir::new().unwrap();
        let entry = temp.path().join("main.scss");
        fs::write(temp.path().join("_colors.scss"), "$primary: #336699;\n").unwrap();
        fs::write(&entry, "@import 'colors';\n.button { color: $primary; }\n").unwrap();

        let css = compile_entry(&entry, &[]).unwrap();
        assert!(css.contains(".button"));
        assert!(css.contains("#336699"));
    }

    #[test]
    fn test_compile_entry_error() {
        let temp = TempDir::new().unwrap();
        let entry = temp.path().join("broken.scss");
        fs::write(&entry, ".a { color: $undefined; }\n").unwrap();

        let err = compile_entry(&entry, &[]).unwrap_err();
        assert!(err.is_compile_error());
    }

    #[test]
    fn test_prefix_css_adds_ie_flexbox() {
        let targets = browser_targets(&["IE 10".to_string()]).unwrap();
        let css = prefix_css(".row { display: flex; }", targets, Path::new("t.css")).unwrap();
        assert!(css.expanded.contains("-ms-flexbox"));
        assert!(css.minified.contains("-ms-flexbox"));
        assert!(css.minified.len() < css.expanded.len());
    }

    #[test]
    fn test_compile_styles_with_no_sources_writes_empty() {
        let temp = TempDir::new().unwrap();
        let ctx = ctx(temp.path());

        let output = compile_styles(&ctx).unwrap();
        assert_eq!(output.files.len(), 2);
        assert_eq!(fs::read_to_string(ctx.minified_stylesheet()).unwrap(), "");
    }

    #[test]
    fn test_entry_points_follow_source_directory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("web/sass")).unwrap();
        fs::create_dir_all(temp.path().join("src/sass")).unwrap();
        fs::write(temp.path().join("web/sass/site.sass"), ".a\n  color: red\n").unwrap();
        fs::write(temp.path().join("src/sass/old.sass"), ".b\n  color: red\n").unwrap();
        let mut config = default_config();
        config.project.src = "web".into();
        let ctx = BuildContext::new(config, temp.path().to_path_buf());

        let entries = entry_points(&ctx).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.ends_with("web/sass/site.sass"));
    }

    #[test]
    fn test_compile_styles_skips_partials() {
        let temp = TempDir::new().unwrap();
        let sass = temp.path().join("src/sass");
        fs::create_dir_all(&sass).unwrap();
        fs::write(sass.join("_vars.sass"), "$gap: 4px\n").unwrap();
        fs::write(sass.join("main.sass"), "@import 'vars'\n.grid\n  margin: $gap\n").unwrap();
        let ctx = ctx(temp.path());

        compile_styles(&ctx).unwrap();

        let expanded = fs::read_to_string(ctx.expanded_stylesheet()).unwrap();
        assert!(expanded.contains(".grid"));
        assert!(expanded.contains("4px"));
        assert_eq!(expanded.matches(".grid").count(), 1);
    }
}
