//! Bundle reference injection.
//!
//! HTML entry files carry marker pairs:
//!
//! ```html
//! <!-- inject:css -->
//! <!-- endinject -->
//! ```
//!
//! Everything between a start marker and the next `endinject` marker is
//! replaced with one tag per bundle, so running the injector twice gives
//! the same file. A start marker whose block is not closed before the
//! next start marker is left alone and reported as a warning.

use crate::build::{
    discover_files, relative_url, write_output, BuildContext, TaskError, TaskOutput,
};
use crate::config::InjectOrder;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const END_MARKER: &str = r"<!--\s*endinject\s*-->";
const ANY_START_MARKER: &str = r"<!--\s*inject:\w+\s*-->";

/// Kind of reference block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Stylesheet links
    Css,
    /// Script tags
    Js,
}

impl BlockKind {
    fn marker_name(self) -> &'static str {
        match self {
            BlockKind::Css => "css",
            BlockKind::Js => "js",
        }
    }

    /// Tag referencing a bundle at `url`.
    pub fn tag(self, url: &str) -> String {
        match self {
            BlockKind::Css => format!(r#"<link rel="stylesheet" href="{}">"#, url),
            BlockKind::Js => format!(r#"<script src="{}"></script>"#, url),
        }
    }
}

/// Result of rewriting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injected {
    /// Rewritten markup
    pub html: String,
    /// Unterminated markers and similar problems
    pub warnings: Vec<String>,
}

fn compile(pattern: &str) -> Result<Regex, TaskError> {
    Regex::new(pattern).map_err(|e| TaskError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Leading whitespace of the line containing byte `pos`.
fn line_indent(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..pos];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

fn replace_blocks(
    html: &str,
    kind: BlockKind,
    tags: &[String],
    warnings: &mut Vec<String>,
) -> Result<String, TaskError> {
    let start_re = compile(&format!(r"<!--\s*inject:{}\s*-->", kind.marker_name()))?;
    let any_start_re = compile(ANY_START_MARKER)?;
    let end_re = compile(END_MARKER)?;

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    let mut search = 0;

    while let Some(start) = start_re.find_at(html, search) {
        search = start.end();

        // A block ends at the first endinject, unless another block opens first.
        let end = match (end_re.find_at(html, start.end()), any_start_re.find_at(html, start.end())) {
            (Some(end), Some(next)) if next.start() < end.start() => None,
            (end, _) => end,
        };
        let Some(end) = end else {
            let line = html[..start.start()].matches('\n').count() + 1;
            warnings.push(format!(
                "line {}: '<!-- inject:{} -->' has no matching '<!-- endinject -->'",
                line,
                kind.marker_name()
            ));
            continue;
        };

        let indent = line_indent(html, start.start());
        out.push_str(&html[cursor..start.end()]);
        for tag in tags {
            out.push('\n');
            out.push_str(indent);
            out.push_str(tag);
        }
        out.push('\n');
        out.push_str(indent);
        cursor = end.start();
        search = end.end();
    }

    out.push_str(&html[cursor..]);
    Ok(out)
}

/// Rewrite the marker blocks of one document.
pub fn inject_markup(
    html: &str,
    css_tags: &[String],
    js_tags: &[String],
    order: InjectOrder,
) -> Result<Injected, TaskError> {
    let blocks = match order {
        InjectOrder::CssFirst => [(BlockKind::Css, css_tags), (BlockKind::Js, js_tags)],
        InjectOrder::JsFirst => [(BlockKind::Js, js_tags), (BlockKind::Css, css_tags)],
    };

    let mut warnings = Vec::new();
    let mut html = html.to_string();
    for (kind, tags) in blocks {
        html = replace_blocks(&html, kind, tags, &mut warnings)?;
    }

    Ok(Injected { html, warnings })
}

/// Bundles referenced by the css and js blocks, vendor first.
pub fn bundle_paths(ctx: &BuildContext) -> (Vec<PathBuf>, Vec<PathBuf>) {
    (
        vec![ctx.vendor_css_bundle(), ctx.minified_stylesheet()],
        vec![ctx.vendor_js_bundle(), ctx.app_js_bundle()],
    )
}

fn tags_for(kind: BlockKind, html_dir: &Path, bundles: &[PathBuf]) -> Vec<String> {
    bundles.iter().map(|b| kind.tag(&relative_url(html_dir, b))).collect()
}

/// Run the `inject` task.
///
/// Fails with [`TaskError::MissingBundle`] before touching any file when
/// a referenced bundle does not exist.
pub fn inject_bundles(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let (css_bundles, js_bundles) = bundle_paths(ctx);
    if let Some(missing) = css_bundles.iter().chain(js_bundles.iter()).find(|p| !p.is_file()) {
        return Err(TaskError::MissingBundle(missing.clone()));
    }

    let out_dir = ctx.out_dir();
    let pages = discover_files(&out_dir, "*.html")?;
    tracing::debug!(pages = pages.len(), "injecting bundle references");

    let mut output = TaskOutput::default();
    for page in pages {
        let html_dir = page.path.parent().unwrap_or(out_dir.as_path());
        let html = fs::read_to_string(&page.path).map_err(|e| TaskError::io(&page.path, e))?;

        let injected = inject_markup(
            &html,
            &tags_for(BlockKind::Css, html_dir, &css_bundles),
            &tags_for(BlockKind::Js, html_dir, &js_bundles),
            ctx.config().inject.order,
        )?;

        for warning in injected.warnings {
            output.warn(format!("{}: {}", page.relative.display(), warning));
        }
        if injected.html != html {
            write_output(&page.path, &injected.html)?;
        }
        output.files.push(page.path);
    }

    Ok(output)
}
