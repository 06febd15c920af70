//! Script bundling.
//!
//! Every `*.js` file directly inside `src/js/` is concatenated in file-name
//! order into `js/scripts.js`, minified, with a source map in `js/maps/`.
//! There is no module graph: each file is a classic script and the bundle
//! is their statements back to back.

mod swc;

use crate::notice::{self, messages};
use crate::paths::{ProjectLayout, MAPS_DIR};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use themekit_util::fs::{atomic_write, list_files};

/// Script bundling error.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {file} at line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    #[error("minify error: {0}")]
    Minify(String),

    #[error("emit error: {0}")]
    Emit(String),

    #[error("source map error: {0}")]
    SourceMap(String),

    #[error("unknown script target {0:?} (expected es5, es2015 ... es2022 or esnext)")]
    InvalidTarget(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Syntax level of the emitted bundle. Ordered oldest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum EsTarget {
    /// ECMAScript 5.
    #[default]
    #[serde(rename = "es5")]
    ES5,
    /// ECMAScript 2015 (ES6).
    #[serde(rename = "es2015")]
    ES2015,
    #[serde(rename = "es2016")]
    ES2016,
    #[serde(rename = "es2017")]
    ES2017,
    #[serde(rename = "es2018")]
    ES2018,
    #[serde(rename = "es2019")]
    ES2019,
    #[serde(rename = "es2020")]
    ES2020,
    #[serde(rename = "es2021")]
    ES2021,
    #[serde(rename = "es2022")]
    ES2022,
    /// Latest ECMAScript features.
    #[serde(rename = "esnext")]
    ESNext,
}

impl EsTarget {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ES5 => "es5",
            Self::ES2015 => "es2015",
            Self::ES2016 => "es2016",
            Self::ES2017 => "es2017",
            Self::ES2018 => "es2018",
            Self::ES2019 => "es2019",
            Self::ES2020 => "es2020",
            Self::ES2021 => "es2021",
            Self::ES2022 => "es2022",
            Self::ESNext => "esnext",
        }
    }
}

impl std::fmt::Display for EsTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EsTarget {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let target = match s.to_ascii_lowercase().as_str() {
            "es5" => Self::ES5,
            "es2015" | "es6" => Self::ES2015,
            "es2016" => Self::ES2016,
            "es2017" => Self::ES2017,
            "es2018" => Self::ES2018,
            "es2019" => Self::ES2019,
            "es2020" => Self::ES2020,
            "es2021" => Self::ES2021,
            "es2022" => Self::ES2022,
            "esnext" => Self::ESNext,
            _ => return Err(ScriptError::InvalidTarget(s.to_string())),
        };
        Ok(target)
    }
}

/// One input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    /// Name recorded in the source map.
    pub name: String,
    pub path: PathBuf,
    pub code: String,
}

/// Bundled code and its source map, not yet written.
#[derive(Debug, Clone)]
pub struct BundleOutput {
    pub code: String,
    pub map: String,
}

/// Result of a bundling run.
#[derive(Debug, Clone)]
pub struct BundleReport {
    pub output: PathBuf,
    pub map: PathBuf,
    pub sources: usize,
    pub bytes: usize,
}

/// Bundler options.
#[derive(Debug, Clone, Copy)]
pub struct ScriptOptions {
    pub target: EsTarget,
    pub minify: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            target: EsTarget::default(),
            minify: true,
        }
    }
}

/// Bundles `src/js/*.js` into `js/scripts.js`.
#[derive(Debug, Clone)]
pub struct ScriptBundler {
    layout: ProjectLayout,
    options: ScriptOptions,
}

impl ScriptBundler {
    #[must_use]
    pub fn new(layout: ProjectLayout, options: ScriptOptions) -> Self {
        Self { layout, options }
    }

    /// Read every script source in listing order.
    pub fn collect_sources(&self) -> Result<Vec<ScriptSource>, ScriptError> {
        let dir = self.layout.js_src_dir();
        let files = list_files(&dir, &["js"]).map_err(|source| ScriptError::Io {
            path: dir.clone(),
            source,
        })?;

        files
            .into_iter()
            .map(|path| {
                let code = std::fs::read_to_string(&path).map_err(|source| ScriptError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(ScriptSource {
                    name: self.layout.map_source_name(&path),
                    path,
                    code,
                })
            })
            .collect()
    }

    /// Bundle `sources` in memory. The code ends with the map reference.
    pub fn bundle(&self, sources: &[ScriptSource]) -> Result<BundleOutput, ScriptError> {
        let mut output = swc::bundle_sources(sources, self.options.target, self.options.minify)?;

        let map_name = ProjectLayout::map_path_for(&self.layout.script_output())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !output.code.is_empty() && !output.code.ends_with('\n') {
            output.code.push('\n');
        }
        output
            .code
            .push_str(&format!("//# sourceMappingURL={MAPS_DIR}/{map_name}\n"));

        Ok(output)
    }

    /// Collect, bundle and write the bundle and its map.
    ///
    /// On failure the previous bundle is left in place.
    pub fn run(&self) -> Result<BundleReport, ScriptError> {
        let sources = self.collect_sources()?;
        if sources.is_empty() {
            tracing::warn!(
                dir = %self.layout.relative(&self.layout.js_src_dir()),
                "no script sources, writing an empty bundle"
            );
        }

        let output = self.bundle(&sources)?;

        let out_path = self.layout.script_output();
        let map_path = ProjectLayout::map_path_for(&out_path);

        atomic_write(&out_path, output.code.as_bytes()).map_err(|source| {
            ScriptError::Write {
                path: out_path.clone(),
                source,
            }
        })?;
        atomic_write(&map_path, output.map.as_bytes()).map_err(|source| ScriptError::Write {
            path: map_path.clone(),
            source,
        })?;

        tracing::debug!(
            path = %self.layout.relative(&out_path),
            count = sources.len(),
            bytes = output.code.len(),
            "wrote script bundle"
        );
        notice::completed(messages::SCRIPTS);

        Ok(BundleReport {
            output: out_path,
            map: map_path,
            sources: sources.len(),
            bytes: output.code.len(),
        })
    }
}
