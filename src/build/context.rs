//! Build context containing configuration and paths for a build.

use crate::config::PipelineConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Output subdirectory for stylesheets.
pub const CSS_DIR: &str = "css";
/// Output subdirectory for scripts.
pub const JS_DIR: &str = "js";
/// Output subdirectory for images.
pub const IMG_DIR: &str = "img";
/// Output subdirectory for fonts.
pub const FONTS_DIR: &str = "fonts";

/// Build context containing configuration and paths for a build operation.
///
/// The context is immutable once a build starts and is shared by every
/// task. All destination paths are derived here so tasks never compute
/// layout on their own.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: Arc<PipelineConfig>,
    /// Project root directory (where assetpipe.toml is located)
    project_root: PathBuf,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// # Arguments
    /// - `config` - The loaded configuration
    /// - `project_root` - The project root directory
    pub fn new(config: PipelineConfig, project_root: PathBuf) -> Self {
        Self { config: Arc::new(config), project_root }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Get the source directory (resolved to absolute path).
    pub fn src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.src)
    }

    /// Get the output directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Resolve a path relative to the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::resolve_path(&self.project_root, path)
    }

    /// Resolve a path relative to the source directory.
    pub fn source_path(&self, path: &Path) -> PathBuf {
        crate::config::resolve_path(&self.src_dir(), path)
    }

    /// `<out>/css`
    pub fn css_dir(&self) -> PathBuf {
        self.out_dir().join(CSS_DIR)
    }

    /// `<out>/js`
    pub fn js_dir(&self) -> PathBuf {
        self.out_dir().join(JS_DIR)
    }

    /// `<out>/img`
    pub fn img_dir(&self) -> PathBuf {
        self.out_dir().join(IMG_DIR)
    }

    /// `<out>/fonts`
    pub fn fonts_dir(&self) -> PathBuf {
        self.out_dir().join(FONTS_DIR)
    }

    /// Expanded, prefixed stylesheet.
    pub fn expanded_stylesheet(&self) -> PathBuf {
        self.source_path(&self.config.styles.expanded_dir).join(&self.config.styles.bundle)
    }

    /// Minified stylesheet referenced by the injector.
    pub fn minified_stylesheet(&self) -> PathBuf {
        self.css_dir().join(self.config.styles.minified_name())
    }

    /// Vendor stylesheet bundle.
    pub fn vendor_css_bundle(&self) -> PathBuf {
        self.css_dir().join(&self.config.vendor.css_bundle)
    }

    /// Vendor script bundle.
    pub fn vendor_js_bundle(&self) -> PathBuf {
        self.js_dir().join(&self.config.vendor.js_bundle)
    }

    /// Application script bundle.
    pub fn app_js_bundle(&self) -> PathBuf {
        self.js_dir().join(&self.config.scripts.bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    fn ctx() -> BuildContext {
        BuildContext::new(default_config(), PathBuf::from("/project"))
    }

    #[test]
    fn test_build_context_new() {
        let ctx = ctx();
        assert_eq!(ctx.project_root(), Path::new("/project"));
    }

    #[test]
    fn test_build_context_resolve_path() {
        let ctx = ctx();
        assert_eq!(ctx.resolve_path(Path::new("/other/path")), PathBuf::from("/other/path"));
        assert_eq!(ctx.resolve_path(Path::new("src/js")), PathBuf::from("/project/src/js"));
    }

    #[test]
    fn test_build_context_source_path_follows_src() {
        let mut config = default_config();
        config.project.src = PathBuf::from("web");
        let ctx = BuildContext::new(config, PathBuf::from("/project"));

        assert_eq!(ctx.source_path(Path::new("js/main.js")), PathBuf::from("/project/web/js/main.js"));
        assert_eq!(ctx.source_path(Path::new("/abs/a.js")), PathBuf::from("/abs/a.js"));
        assert_eq!(ctx.expanded_stylesheet(), PathBuf::from("/project/web/css/style.css"));
    }

    #[test]
    fn test_build_context_layout() {
        let ctx = ctx();
        assert_eq!(ctx.src_dir(), PathBuf::from("/project/src"));
        assert_eq!(ctx.out_dir(), PathBuf::from("/project/dist"));
        assert_eq!(ctx.css_dir(), PathBuf::from("/project/dist/css"));
        assert_eq!(ctx.img_dir(), PathBuf::from("/project/dist/img"));
        assert_eq!(ctx.fonts_dir(), PathBuf::from("/project/dist/fonts"));
        assert_eq!(ctx.expanded_stylesheet(), PathBuf::from("/project/src/css/style.css"));
        assert_eq!(ctx.minified_stylesheet(), PathBuf::from("/project/dist/css/style.min.css"));
        assert_eq!(ctx.vendor_css_bundle(), PathBuf::from("/project/dist/css/vendors.css"));
        assert_eq!(ctx.vendor_js_bundle(), PathBuf::from("/project/dist/js/vendors.js"));
        assert_eq!(ctx.app_js_bundle(), PathBuf::from("/project/dist/js/app.js"));
    }
}
