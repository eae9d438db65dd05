//! Source file discovery and output helpers.
//!
//! Expands glob patterns from the Path Set into concrete files, each
//! paired with its sub-path relative to the pattern's base directory.

use crate::build::TaskError;
use glob::glob;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A file matched by a pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Absolute path of the matched file
    pub path: PathBuf,
    /// Path relative to the pattern base
    pub relative: PathBuf,
}

/// Directory part of a pattern before its first glob metacharacter.
///
/// `src/img/**/*` -> `src/img`, `src/*.html` -> `src`, `*.html` -> ``.
/// A pattern without metacharacters is a single file, its base is the
/// parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let mut components = Path::new(pattern).components().peekable();

    while let Some(component) = components.next() {
        let text = component.as_os_str().to_string_lossy();
        let is_magic = text.contains(['*', '?', '[', '{']);
        if is_magic || components.peek().is_none() {
            break;
        }
        base.push(component);
    }

    base
}

/// Discover files matching a glob pattern.
///
/// # Arguments
/// - `base_dir` - Base directory to resolve relative patterns from
/// - `pattern` - Glob pattern to match
///
/// # Returns
/// Matching regular files, sorted by path. Directories are skipped.
pub fn discover_files(base_dir: &Path, pattern: &str) -> Result<Vec<SourceFile>, TaskError> {
    let full_pattern = base_dir.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();
    let root = base_dir.join(glob_base(pattern));

    let paths = glob(&pattern_str).map_err(|e| TaskError::Pattern {
        pattern: pattern.to_string(),
        message: e.msg.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if !path.is_file() {
                    continue;
                }
                let relative = path
                    .strip_prefix(&root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()));
                files.push(SourceFile { path, relative });
            }
            Err(e) => {
                tracing::warn!(error = %e, "error reading path during discovery");
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Discover files for every pattern, in pattern order, without duplicates.
pub fn discover_all(base_dir: &Path, patterns: &[String]) -> Result<Vec<SourceFile>, TaskError> {
    let mut all: Vec<SourceFile> = Vec::new();
    for pattern in patterns {
        for file in discover_files(base_dir, pattern)? {
            if !all.iter().any(|f| f.path == file.path) {
                all.push(file);
            }
        }
    }
    Ok(all)
}

/// Write an output file, creating its parent directory.
pub fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    let contents = contents.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| TaskError::io(path, e))?;
    tracing::trace!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

/// Path of `target` relative to directory `from`, with `/` separators.
///
/// Both paths must be absolute (or share the same relative root).
pub fn relative_url(from: &Path, target: &Path) -> String {
    let from: Vec<Component> = from.components().collect();
    let target: Vec<Component> = target.components().collect();

    let common = from.iter().zip(target.iter()).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &target[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("src/img/**/*"), PathBuf::from("src/img"));
        assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("*.html"), PathBuf::from(""));
        assert_eq!(glob_base("src/js/main.js"), PathBuf::from("src/js"));
        assert_eq!(glob_base("src/fonts/[ab]*.woff"), PathBuf::from("src/fonts"));
    }

    #[test]
    fn test_discover_files_preserves_subpaths() {
        let temp = TempDir::new().unwrap();
        let img = temp.path().join("src/img");
        fs::create_dir_all(img.join("icons")).unwrap();
        fs::write(img.join("logo.png"), b"png").unwrap();
        fs::write(img.join("icons/arrow.svg"), b"<svg/>").unwrap();

        let files = discover_files(temp.path(), "src/img/**/*").unwrap();
        let relative: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();
        assert_eq!(relative, vec![PathBuf::from("icons/arrow.svg"), PathBuf::from("logo.png")]);
    }

    #[test]
    fn test_discover_files_no_matches() {
        let temp = TempDir::new().unwrap();
        let files = discover_files(temp.path(), "src/img/**/*").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_discover_files_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let result = discover_files(temp.path(), "src/[img");
        assert!(matches!(result, Err(TaskError::Pattern { .. })));
    }

    #[test]
    fn test_discover_all_deduplicates() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/index.html"), "x").unwrap();

        let files = discover_all(
            temp.path(),
            &["src/*.html".to_string(), "src/index.html".to_string()],
        )
        .unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_write_output_creates_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dist/js/app.js");
        write_output(&path, "var a;").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "var a;");
    }

    #[test]
    fn test_relative_url() {
        let dist = Path::new("/p/dist");
        assert_eq!(relative_url(dist, Path::new("/p/dist/css/vendors.css")), "css/vendors.css");
        assert_eq!(
            relative_url(Path::new("/p/dist/blog"), Path::new("/p/dist/js/app.js")),
            "../js/app.js"
        );
        assert_eq!(relative_url(dist, Path::new("/p/dist")), "");
    }
}
