//! Bundle concatenation.
//!
//! Vendor stylesheets, vendor scripts and application scripts are all
//! plain ordered concatenations of the files listed in the configuration.
//! Files are joined with the configured separator; nothing follows the
//! last file. Vendor entries are relative to the project root, application
//! scripts to the source directory.

use crate::build::{write_output, BuildContext, TaskError, TaskOutput};
use lightningcss::targets::Targets;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::fs;
use std::path::{Path, PathBuf};

/// Concatenate files in list order.
///
/// Relative entries are resolved against `root`. A missing entry fails
/// with [`TaskError::MissingInput`] before anything is read.
pub fn concat_files(root: &Path, files: &[PathBuf], separator: &str) -> Result<Vec<u8>, TaskError> {
    let resolved: Vec<PathBuf> =
        files.iter().map(|f| crate::config::resolve_path(root, f)).collect();

    if let Some(missing) = resolved.iter().find(|p| !p.is_file()) {
        return Err(TaskError::MissingInput(missing.clone()));
    }

    let mut bundle = Vec::new();
    for (i, path) in resolved.iter().enumerate() {
        if i > 0 {
            bundle.extend_from_slice(separator.as_bytes());
        }
        let contents = fs::read(path).map_err(|e| TaskError::io(path, e))?;
        tracing::trace!(file = %path.display(), bytes = contents.len(), "appending");
        bundle.extend_from_slice(&contents);
    }

    Ok(bundle)
}

/// Minify a script with oxc.
pub fn minify_js(source: &str, file: &Path) -> Result<String, TaskError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(TaskError::Minify { file: file.to_path_buf(), message });
    }

    let mut program = ret.program;
    let minified = Minifier::new(MinifierOptions::default()).minify(&allocator, &mut program);

    Ok(Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program)
        .code)
}

/// Minify a stylesheet with lightningcss.
pub fn minify_css(source: &str, file: &Path) -> Result<String, TaskError> {
    Ok(crate::styles::prefix_css(source, Targets::default(), file)?.minified)
}

fn bundle_text(bundle: Vec<u8>, file: &Path) -> Result<String, TaskError> {
    String::from_utf8(bundle).map_err(|e| TaskError::Minify {
        file: file.to_path_buf(),
        message: format!("bundle is not valid UTF-8: {}", e),
    })
}

/// Run the `css:vendors` task.
pub fn bundle_vendor_css(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let vendor = &ctx.config().vendor;
    let out = ctx.vendor_css_bundle();
    tracing::debug!(files = vendor.css.len(), minify = vendor.minify_css, "bundling vendor css");

    let mut bundle = concat_files(ctx.project_root(), &vendor.css, &vendor.separator)?;
    if vendor.minify_css {
        bundle = minify_css(&bundle_text(bundle, &out)?, &out)?.into_bytes();
    }

    write_output(&out, bundle)?;
    Ok(TaskOutput::files(vec![out]))
}

/// Run the `js:vendors` task.
pub fn bundle_vendor_js(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let vendor = &ctx.config().vendor;
    let out = ctx.vendor_js_bundle();
    tracing::debug!(files = vendor.js.len(), minify = vendor.minify_js, "bundling vendor js");

    let mut bundle = concat_files(ctx.project_root(), &vendor.js, &vendor.separator)?;
    if vendor.minify_js {
        bundle = minify_js(&bundle_text(bundle, &out)?, &out)?.into_bytes();
    }

    write_output(&out, bundle)?;
    Ok(TaskOutput::files(vec![out]))
}

/// Run the `js:app` task.
pub fn bundle_app_js(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let config = ctx.config();
    let scripts = &config.scripts;
    let out = ctx.app_js_bundle();
    tracing::debug!(files = scripts.app.len(), minify = scripts.minify, "bundling app js");

    let mut bundle = concat_files(&ctx.src_dir(), &scripts.app, &config.vendor.separator)?;
    if scripts.minify {
        bundle = minify_js(&bundle_text(bundle, &out)?, &out)?.into_bytes();
    }

    write_output(&out, bundle)?;
    Ok(TaskOutput::files(vec![out]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_concat_preserves_order_and_separator() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.js", "var X=1;");
        write(temp.path(), "b.js", "var Y=2;");

        let bundle = concat_files(
            temp.path(),
            &[PathBuf::from("a.js"), PathBuf::from("b.js")],
            "\n",
        )
        .unwrap();
        assert_eq!(bundle, b"var X=1;\nvar Y=2;");

        let reversed = concat_files(
            temp.path(),
            &[PathBuf::from("b.js"), PathBuf::from("a.js")],
            "\n",
        )
        .unwrap();
        assert_eq!(reversed, b"var Y=2;\nvar X=1;");
    }

    #[test]
    fn test_concat_keeps_duplicates() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.js", "a();");

        let bundle =
            concat_files(temp.path(), &[PathBuf::from("a.js"), PathBuf::from("a.js")], "\n")
                .unwrap();
        assert_eq!(bundle, b"a();\na();");
    }

    #[test]
    fn test_concat_missing_input() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.js", "a();");

        let err = concat_files(temp.path(), &[PathBuf::from("a.js"), PathBuf::from("gone.js")], "\n")
            .unwrap_err();
        match err {
            TaskError::MissingInput(path) => assert!(path.ends_with("gone.js")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_concat_empty_list() {
        let temp = TempDir::new().unwrap();
        assert!(concat_files(temp.path(), &[], "\n").unwrap().is_empty());
    }

    #[test]
    fn test_minify_js() {
        let source = "function add(first, second) {\n  return first + second;\n}\nadd(1, 2);\n";
        let code = minify_js(source, Path::new("app.js")).unwrap();
        assert!(code.len() < source.len());
        assert!(!code.contains("second"));
    }

    #[test]
    fn test_minify_js_syntax_error() {
        let err = minify_js("function (", Path::new("app.js")).unwrap_err();
        assert!(matches!(err, TaskError::Minify { .. }));
    }

    #[test]
    fn test_minify_css() {
        let css = minify_css("html {\n  margin: 0px;\n}\n", Path::new("v.css")).unwrap();
        assert_eq!(css, "html{margin:0}");
    }

    #[test]
    fn test_bundle_vendor_js_writes_bundle() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/a.js", "var X=1;");
        write(temp.path(), "lib/b.js", "var Y=2;");
        let mut config = default_config();
        config.vendor.js = vec![PathBuf::from("lib/a.js"), PathBuf::from("lib/b.js")];
        let ctx = BuildContext::new(config, temp.path().to_path_buf());

        let output = bundle_vendor_js(&ctx).unwrap();
        assert_eq!(output.files, vec![ctx.vendor_js_bundle()]);
        assert_eq!(fs::read_to_string(ctx.vendor_js_bundle()).unwrap(), "var X=1;\nvar Y=2;");
    }

    #[test]
    fn test_bundle_app_js_missing_main() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());

        assert!(matches!(bundle_app_js(&ctx), Err(TaskError::MissingInput(_))));
        assert!(!ctx.app_js_bundle().exists());
    }

    #[test]
    fn test_bundle_app_js_reads_from_source_directory() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "web/js/main.js", "run();");
        let mut config = default_config();
        config.project.src = PathBuf::from("web");
        let ctx = BuildContext::new(config, temp.path().to_path_buf());

        bundle_app_js(&ctx).unwrap();
        assert_eq!(fs::read_to_string(ctx.app_js_bundle()).unwrap(), "run();");
    }

    #[test]
    fn test_bundle_vendor_css_minifies() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.css", "body {\n  color: red;\n}\n");
        write(temp.path(), "b.css", "p {\n  margin: 0;\n}\n");
        let mut config = default_config();
        config.vendor.css = vec![PathBuf::from("a.css"), PathBuf::from("b.css")];
        let ctx = BuildContext::new(config, temp.path().to_path_buf());

        bundle_vendor_css(&ctx).unwrap();
        let css = fs::read_to_string(ctx.vendor_css_bundle()).unwrap();
        assert_eq!(css, "body{color:red}p{margin:0}");
    }
}
