//! Runtime configuration and the optional `themekit.json` project file.
//!
//! ## Project file
//!
//! ```json
//! {
//!   "server": { "proxy": "dev.local", "port": 3000, "host": "localhost", "open": false },
//!   "styles": { "browsers": ["last 2 versions"] },
//!   "scripts": { "target": "es5" },
//!   "images": { "jpeg_quality": 80, "png_quality": [80, 80], "png_speed": 1 }
//! }
//! ```
//!
//! Every key is optional. CLI flags override file values, file values
//! override the built-in defaults.

use crate::error::Error;
use crate::images::{ImageOptions, PngQuality};
use crate::scripts::{EsTarget, ScriptError, ScriptOptions};
use crate::styles::StyleOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime configuration for the themekit CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory (project root).
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Project file to load instead of searching the root. Relative paths
    /// resolve against `cwd`.
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
            config_file: None,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Load `path` instead of discovering the project file.
    #[must_use]
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }
}

/// Project config file name.
pub const CONFIG_FILE: &str = "themekit.json";

/// Upstream host proxied by the dev server when nothing else is configured.
pub const DEFAULT_PROXY: &str = "dev.local";

/// Settings loaded from `themekit.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub server: ServerSection,
    pub styles: StylesSection,
    pub scripts: ScriptsSection,
    pub images: ImagesSection,
}

/// `server` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Upstream host to proxy (e.g. `dev.local`). An empty string disables proxying.
    pub proxy: Option<String>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Host to bind to.
    pub host: Option<String>,
    /// Open browser automatically.
    pub open: Option<bool>,
}

/// `styles` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesSection {
    /// Browserslist queries for vendor prefixing.
    pub browsers: Option<Vec<String>>,
}

/// `scripts` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsSection {
    /// Output syntax level (`es5`, `es2015` ... `es2022`, `esnext`).
    pub target: Option<String>,
}

/// `images` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesSection {
    pub jpeg_quality: Option<u8>,
    /// `[min, max]` PNG quantisation quality, 0-100.
    pub png_quality: Option<[u8; 2]>,
    /// Quantiser speed, 1 (slowest, best) to 10.
    pub png_speed: Option<u8>,
}

impl ProjectConfig {
    /// Stylesheet options with file values over the defaults.
    #[must_use]
    pub fn style_options(&self) -> StyleOptions {
        let mut options = StyleOptions::default();
        if let Some(browsers) = self.styles.browsers.as_ref().filter(|b| !b.is_empty()) {
            options.browsers.clone_from(browsers);
        }
        options
    }

    /// Script options with file values over the defaults.
    pub fn script_options(&self) -> Result<ScriptOptions, ScriptError> {
        let mut options = ScriptOptions::default();
        if let Some(target) = &self.scripts.target {
            options.target = target.parse::<EsTarget>()?;
        }
        Ok(options)
    }

    /// Image options with file values over the defaults.
    #[must_use]
    pub fn image_options(&self) -> ImageOptions {
        let defaults = ImageOptions::default();
        let [min, max] = self
            .images
            .png_quality
            .unwrap_or([defaults.png.min, defaults.png.max]);
        ImageOptions {
            jpeg_quality: self.images.jpeg_quality.unwrap_or(defaults.jpeg_quality),
            png: PngQuality {
                min,
                max,
                speed: self.images.png_speed.unwrap_or(defaults.png.speed),
            },
        }
    }
}

/// Find the project config file in the given root directory.
#[must_use]
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    let path = root.join(CONFIG_FILE);
    path.is_file().then_some(path)
}

/// Load the project config.
///
/// If `config_path` is `Some`, that file must exist. Otherwise the root is
/// searched and a missing file yields `Ok(None)`.
pub fn load_config(
    root: &Path,
    config_path: Option<&Path>,
) -> Result<Option<(PathBuf, ProjectConfig)>, Error> {
    let path = match config_path {
        Some(p) => {
            let abs = if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            };
            if !abs.exists() {
                return Err(Error::ConfigNotFound { path: abs });
            }
            abs
        }
        None => match find_config_file(root) {
            Some(p) => p,
            None => return Ok(None),
        },
    };

    let source = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
        path: path.clone(),
        source,
    })?;

    let config = parse_config(&source).map_err(|source| Error::ConfigParse {
        path: path.clone(),
        source,
    })?;

    Ok(Some((path, config)))
}

/// Parse config file contents.
pub fn parse_config(source: &str) -> Result<ProjectConfig, serde_json::Error> {
    if source.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }
    serde_json::from_str(source)
}
