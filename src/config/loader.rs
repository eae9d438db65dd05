//! Locating and reading `assetpipe.toml`
//!
//! A project is identified by the directory holding its configuration
//! file. Every relative path in the configuration is resolved against
//! that directory, whatever the current directory of the process.

use super::schema::{PipelineConfig, ProjectConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up by discovery.
pub const CONFIG_FILE_NAME: &str = "assetpipe.toml";

/// Problem reading a configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file (or the current directory) could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for the schema
    #[error("{} is not a valid configuration: {source}", path.display())]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Deserializer error
        #[source]
        source: toml::de::Error,
    },
    /// One or more fields hold unusable values
    #[error("invalid configuration:\n{}", .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// Values given on the command line, applied after the file is read.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Replaces `project.out`
    pub out: Option<PathBuf>,
    /// Replaces `project.src`
    pub src: Option<PathBuf>,
    /// Replaces `watch.debounce_ms`
    pub debounce_ms: Option<u32>,
}

impl CliOverrides {
    /// Whether no override was given.
    pub fn is_empty(&self) -> bool {
        self.out.is_none() && self.src.is_none() && self.debounce_ms.is_none()
    }
}

/// A configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Parsed and validated configuration
    pub config: PipelineConfig,
    /// File it was read from, `None` when the defaults were used
    pub path: Option<PathBuf>,
    /// Directory relative paths are resolved against
    pub root: PathBuf,
}

/// Nearest `assetpipe.toml` in `start` or one of its ancestors.
pub fn find_config_from(start: &Path) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE_NAME)).find(|candidate| candidate.is_file())
}

/// Parse configuration text. `origin` only labels errors.
pub fn parse_config(contents: &str, origin: &Path) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = toml::from_str(contents)
        .map_err(|source| ConfigError::Parse { path: origin.to_path_buf(), source })?;

    let problems: Vec<String> = config.validate().iter().map(ToString::to_string).collect();
    if problems.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(problems))
    }
}

/// Read and validate one configuration file.
pub fn load_config_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let config = parse_config(&contents, path)?;
    tracing::debug!(path = %path.display(), project = %config.project.name, "configuration loaded");
    Ok(config)
}

/// Load the configuration for a project.
///
/// An explicit path must exist; its directory becomes the root.
/// Otherwise the nearest file above `cwd` is used, and when there is
/// none the defaults apply with `cwd` as the root.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<LoadedConfig, ConfigError> {
    let path = match explicit {
        Some(path) => Some(resolve_path(cwd, path)),
        None => find_config_from(cwd),
    };

    let Some(path) = path else {
        tracing::debug!(root = %cwd.display(), "no {} found, using defaults", CONFIG_FILE_NAME);
        return Ok(LoadedConfig { config: default_config_for(cwd), path: None, root: cwd.to_path_buf() });
    };

    let config = load_config_file(&path)?;
    let root = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
    Ok(LoadedConfig { config, path: Some(path), root })
}

/// Defaults for a project rooted at `root`, named after the directory.
pub fn default_config_for(root: &Path) -> PipelineConfig {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "site".to_string());
    PipelineConfig::with_project(ProjectConfig::named(name))
}

/// Defaults for a project rooted at the current directory.
pub fn default_config() -> PipelineConfig {
    match std::env::current_dir() {
        Ok(cwd) => default_config_for(&cwd),
        Err(_) => default_config_for(Path::new("")),
    }
}

/// Apply command-line values on top of a loaded configuration.
pub fn merge_cli_overrides(config: &mut PipelineConfig, overrides: &CliOverrides) {
    if let Some(out) = &overrides.out {
        config.project.out.clone_from(out);
    }
    if let Some(src) = &overrides.src {
        config.project.src.clone_from(src);
    }
    if let Some(ms) = overrides.debounce_ms {
        config.watch.debounce_ms = ms;
    }
}

/// `path` itself when absolute, otherwise `path` under `root`.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
