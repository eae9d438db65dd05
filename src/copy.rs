//! Static asset copying.

use crate::build::{discover_all, BuildContext, TaskError, TaskOutput};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy every file matching `patterns` (relative to `root`) into `dest`,
/// keeping each file's sub-path below its pattern base.
///
/// `dest` is created even when nothing matches.
pub fn copy_matching(root: &Path, patterns: &[String], dest: &Path) -> Result<Vec<PathBuf>, TaskError> {
    fs::create_dir_all(dest).map_err(|e| TaskError::io(dest, e))?;

    let files = discover_all(root, patterns)?;
    let mut copied = Vec::with_capacity(files.len());

    for file in files {
        let target = dest.join(&file.relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
        }
        fs::copy(&file.path, &target).map_err(|e| TaskError::io(&file.path, e))?;
        tracing::trace!(from = %file.path.display(), to = %target.display(), "copied");
        copied.push(target);
    }

    tracing::debug!(dest = %dest.display(), files = copied.len(), "copy finished");
    Ok(copied)
}

/// Run the `copy:html` task.
pub fn copy_html(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let copied = copy_matching(&ctx.src_dir(), &ctx.config().assets.html, &ctx.out_dir())?;
    Ok(TaskOutput::files(copied))
}

/// Run the `copy:images` task.
pub fn copy_images(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let copied = copy_matching(&ctx.src_dir(), &ctx.config().assets.images, &ctx.img_dir())?;
    Ok(TaskOutput::files(copied))
}

/// Run the `copy:fonts` task.
pub fn copy_fonts(ctx: &BuildContext) -> Result<TaskOutput, TaskError> {
    let copied = copy_matching(&ctx.src_dir(), &ctx.config().assets.fonts, &ctx.fonts_dir())?;
    Ok(TaskOutput::files(copied))
}
