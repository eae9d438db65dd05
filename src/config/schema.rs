//! Configuration schema types for `assetpipe.toml`
//!
//! Defines the Path Set, vendor manifests and per-stage options, with
//! defaults that reproduce the conventional `src/` -> `dist/` layout.
//!
//! Source patterns (styles, app scripts, assets, watch rules) and the
//! expanded stylesheet directory are relative to `project.src`. Vendor
//! files and style load paths are relative to the project root.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Order in which the injector processes marker kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InjectOrder {
    /// Stylesheet markers first, then script markers
    #[default]
    CssFirst,
    /// Script markers first, then stylesheet markers
    JsFirst,
}

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required)
    pub name: String,
    /// Source tree root
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Destination tree root
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

impl ProjectConfig {
    /// Project with the default `src` and `dist` directories.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), src: default_src(), out: default_out() }
    }
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_out() -> PathBuf {
    PathBuf::from("dist")
}

/// Style compiler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Glob patterns for style sources
    #[serde(default = "default_style_sources")]
    pub sources: Vec<String>,
    /// Extra directories searched by `@import` / `@use`, relative to the project root
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
    /// File name of the aggregated stylesheet
    #[serde(default = "default_style_bundle")]
    pub bundle: String,
    /// Directory receiving the expanded (non-minified) stylesheet
    #[serde(default = "default_expanded_dir")]
    pub expanded_dir: PathBuf,
    /// Suffix inserted before the extension of the minified stylesheet
    #[serde(default = "default_min_suffix")]
    pub min_suffix: String,
    /// Browserslist queries used for vendor prefixing
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

fn default_style_sources() -> Vec<String> {
    vec!["**/*.sass".to_string()]
}

fn default_style_bundle() -> String {
    "style.css".to_string()
}

fn default_expanded_dir() -> PathBuf {
    PathBuf::from("css")
}

fn default_min_suffix() -> String {
    ".min".to_string()
}

fn default_browsers() -> Vec<String> {
    vec!["last 2 versions".to_string(), "IE 10".to_string()]
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            sources: default_style_sources(),
            load_paths: vec![],
            bundle: default_style_bundle(),
            expanded_dir: default_expanded_dir(),
            min_suffix: default_min_suffix(),
            browsers: default_browsers(),
        }
    }
}

impl StylesConfig {
    /// File name of the minified stylesheet (`style.css` -> `style.min.css`).
    pub fn minified_name(&self) -> String {
        match self.bundle.rsplit_once('.') {
            Some((stem, ext)) => format!("{}{}.{}", stem, self.min_suffix, ext),
            None => format!("{}{}", self.bundle, self.min_suffix),
        }
    }
}

/// Vendor manifests: ordered third-party files, concatenated as declared
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Stylesheets, in load order
    #[serde(default = "default_vendor_css")]
    pub css: Vec<PathBuf>,
    /// Scripts, in load order
    #[serde(default = "default_vendor_js")]
    pub js: Vec<PathBuf>,
    /// Output file name under `css/`
    #[serde(default = "default_vendor_css_bundle")]
    pub css_bundle: String,
    /// Output file name under `js/`
    #[serde(default = "default_vendor_js_bundle")]
    pub js_bundle: String,
    /// Minify the vendor stylesheet
    #[serde(default = "default_true")]
    pub minify_css: bool,
    /// Minify the vendor script bundle
    #[serde(default)]
    pub minify_js: bool,
    /// Separator written between concatenated files
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_vendor_css() -> Vec<PathBuf> {
    vec![
        PathBuf::from("node_modules/normalize.css/normalize.css"),
        PathBuf::from("node_modules/bootstrap/dist/css/bootstrap-reboot.min.css"),
        PathBuf::from("node_modules/bootstrap/dist/css/bootstrap-grid.min.css"),
    ]
}

fn default_vendor_js() -> Vec<PathBuf> {
    vec![PathBuf::from("node_modules/jquery/dist/jquery.min.js")]
}

fn default_vendor_css_bundle() -> String {
    "vendors.css".to_string()
}

fn default_vendor_js_bundle() -> String {
    "vendors.js".to_string()
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    "\n".to_string()
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            css: default_vendor_css(),
            js: default_vendor_js(),
            css_bundle: default_vendor_css_bundle(),
            js_bundle: default_vendor_js_bundle(),
            minify_css: true,
            minify_js: false,
            separator: default_separator(),
        }
    }
}

/// First-party script bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Application scripts, in dependency order
    #[serde(default = "default_app_scripts")]
    pub app: Vec<PathBuf>,
    /// Output file name under `js/`
    #[serde(default = "default_app_bundle")]
    pub bundle: String,
    /// Minify the application bundle
    #[serde(default)]
    pub minify: bool,
}

fn default_app_scripts() -> Vec<PathBuf> {
    vec![PathBuf::from("js/main.js")]
}

fn default_app_bundle() -> String {
    "app.js".to_string()
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self { app: default_app_scripts(), bundle: default_app_bundle(), minify: false }
    }
}

/// Verbatim-copied asset categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// HTML entry files, copied to the output root
    #[serde(default = "default_html")]
    pub html: Vec<String>,
    /// Images, copied to `img/`
    #[serde(default = "default_images")]
    pub images: Vec<String>,
    /// Fonts, copied to `fonts/`
    #[serde(default = "default_fonts")]
    pub fonts: Vec<String>,
}

fn default_html() -> Vec<String> {
    vec!["*.html".to_string()]
}

fn default_images() -> Vec<String> {
    vec!["img/**/*".to_string()]
}

fn default_fonts() -> Vec<String> {
    vec!["fonts/**/*".to_string()]
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self { html: default_html(), images: default_images(), fonts: default_fonts() }
    }
}

/// Injector settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InjectConfig {
    /// Which marker kind is processed first
    #[serde(default)]
    pub order: InjectOrder,
}

/// A watch rule: changes under `pattern` re-run `task`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRule {
    /// Glob pattern relative to the source directory
    pub pattern: String,
    /// Task (usually an aggregate) to re-run
    pub task: String,
}

impl WatchRule {
    /// Create a rule mapping a pattern to a task.
    pub fn new(pattern: impl Into<String>, task: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), task: task.into() }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
    /// Change rules, evaluated in order
    #[serde(default = "default_watch_rules")]
    pub rules: Vec<WatchRule>,
}

fn default_debounce_ms() -> u32 {
    100
}

fn default_watch_rules() -> Vec<WatchRule> {
    vec![
        WatchRule::new("**/*.sass", "build:styles"),
        WatchRule::new("*.html", "build:html"),
        WatchRule::new("**/*.js", "build:js"),
    ]
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100, clear_screen: false, rules: default_watch_rules() }
    }
}

/// Failure notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Notification title
    #[serde(default = "default_notify_title")]
    pub title: String,
    /// Notification subtitle
    #[serde(default = "default_notify_subtitle")]
    pub subtitle: String,
    /// Ring the terminal bell with the notification
    #[serde(default = "default_true")]
    pub bell: bool,
}

fn default_notify_title() -> String {
    "assetpipe".to_string()
}

fn default_notify_subtitle() -> String {
    "Failure!".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { title: default_notify_title(), subtitle: default_notify_subtitle(), bell: true }
    }
}

/// Complete assetpipe.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Project metadata (required)
    pub project: ProjectConfig,
    /// Style compiler settings
    #[serde(default)]
    pub styles: StylesConfig,
    /// Vendor manifests
    #[serde(default)]
    pub vendor: VendorConfig,
    /// Application scripts
    #[serde(default)]
    pub scripts: ScriptsConfig,
    /// Copied assets
    #[serde(default)]
    pub assets: AssetsConfig,
    /// Injector settings
    #[serde(default)]
    pub inject: InjectConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
    /// Failure notifications
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "vendor.css_bundle")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "assetpipe.toml: '{}' {}", self.field, self.message)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

impl PipelineConfig {
    /// Default settings for every section except `[project]`.
    pub fn with_project(project: ProjectConfig) -> Self {
        Self {
            project,
            styles: StylesConfig::default(),
            vendor: VendorConfig::default(),
            scripts: ScriptsConfig::default(),
            assets: AssetsConfig::default(),
            inject: InjectConfig::default(),
            watch: WatchConfig::default(),
            notify: NotifyConfig::default(),
        }
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.name.is_empty() {
            errors.push(ConfigValidationError {
                field: "project.name".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        let bundles = [
            ("styles.bundle", &self.styles.bundle),
            ("vendor.css_bundle", &self.vendor.css_bundle),
            ("vendor.js_bundle", &self.vendor.js_bundle),
            ("scripts.bundle", &self.scripts.bundle),
        ];
        for (field, name) in bundles {
            if !is_plain_file_name(name) {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must be a plain file name".to_string(),
                });
            }
        }

        if self.styles.minified_name() == self.styles.bundle {
            errors.push(ConfigValidationError {
                field: "styles.min_suffix".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let patterns = self
            .styles
            .sources
            .iter()
            .map(|p| ("styles.sources", p))
            .chain(self.assets.html.iter().map(|p| ("assets.html", p)))
            .chain(self.assets.images.iter().map(|p| ("assets.images", p)))
            .chain(self.assets.fonts.iter().map(|p| ("assets.fonts", p)))
            .chain(self.watch.rules.iter().map(|r| ("watch.rules", &r.pattern)));
        for (field, pattern) in patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: format!("invalid glob '{}': {}", pattern, e.msg),
                });
            }
        }

        for (i, rule) in self.watch.rules.iter().enumerate() {
            if rule.task.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("watch.rules[{}].task", i),
                    message: "must name a task".to_string(),
                });
            }
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> PipelineConfig {
        toml::from_str("[project]\nname = \"site\"").unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = minimal();
        assert_eq!(config.project.src, PathBuf::from("src"));
        assert_eq!(config.project.out, PathBuf::from("dist"));
        assert_eq!(config.styles.sources, vec!["**/*.sass"]);
        assert_eq!(config.vendor.css.len(), 3);
        assert_eq!(config.vendor.js_bundle, "vendors.js");
        assert!(config.vendor.minify_css);
        assert!(!config.vendor.minify_js);
        assert_eq!(config.scripts.app, vec![PathBuf::from("js/main.js")]);
        assert_eq!(config.watch.rules.len(), 3);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_minified_name() {
        let styles = StylesConfig::default();
        assert_eq!(styles.minified_name(), "style.min.css");

        let styles = StylesConfig { bundle: "theme".to_string(), ..Default::default() };
        assert_eq!(styles.minified_name(), "theme.min");
    }

    #[test]
    fn test_inject_order_parse() {
        let config: PipelineConfig =
            toml::from_str("[project]\nname = \"a\"\n[inject]\norder = \"js-first\"").unwrap();
        assert_eq!(config.inject.order, InjectOrder::JsFirst);
    }

    #[test]
    fn test_vendor_manifest_order_preserved() {
        let config: PipelineConfig = toml::from_str(
            r#"
[project]
name = "a"

[vendor]
js = ["z.js", "a.js", "m.js"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.vendor.js,
            vec![PathBuf::from("z.js"), PathBuf::from("a.js"), PathBuf::from("m.js")]
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = minimal();
        config.project.name = String::new();
        config.vendor.css_bundle = "css/vendors.css".to_string();
        config.assets.images = vec!["[img".to_string()];
        config.watch.debounce_ms = 0;

        let errors = config.validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"project.name"));
        assert!(fields.contains(&"vendor.css_bundle"));
        assert!(fields.contains(&"assets.images"));
        assert!(fields.contains(&"watch.debounce_ms"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigValidationError {
            field: "styles.bundle".to_string(),
            message: "must be a plain file name".to_string(),
        };
        assert_eq!(err.to_string(), "assetpipe.toml: 'styles.bundle' must be a plain file name");
    }
}
