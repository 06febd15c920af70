//! Stylesheet compilation.
//!
//! Each entry point is compiled with grass, then run through lightningcss
//! for vendor prefixing and minification. The printed CSS carries a
//! `sourceMappingURL` comment pointing at `maps/<name>.css.map`.

pub mod sass;

use crate::notice::{self, messages};
use crate::paths::{ProjectLayout, EDITOR_ENTRY, MAPS_DIR, THEME_ENTRY};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use sass::{compile_sass_file, SassOptions};
use std::path::{Path, PathBuf};
use themekit_util::fs::atomic_write;

/// Browserslist query used when the project file does not set one.
pub const DEFAULT_BROWSERS: &str = "last 2 versions";

/// Stylesheet error.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sass error in {path}: {message}")]
    Sass { path: String, message: String },

    #[error("CSS parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("CSS transform error in {path}: {message}")]
    Transform { path: String, message: String },

    #[error("CSS print error in {path}: {message}")]
    Print { path: String, message: String },

    #[error("invalid browserslist query {query:?}: {message}")]
    Browsers { query: String, message: String },

    #[error("source map error in {path}: {message}")]
    SourceMap { path: String, message: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// CSS processing options.
#[derive(Debug, Clone, Default)]
pub struct CssOptions {
    /// Enable minification.
    pub minify: bool,
    /// Emit a source map alongside the code.
    pub source_map: bool,
    /// Source file name recorded in errors and in the map's `sources`.
    pub filename: Option<String>,
    /// Browser targets for prefixing. `None` leaves the CSS unprefixed.
    pub targets: Option<Browsers>,
}

/// Result of CSS processing.
#[derive(Debug, Clone)]
pub struct CssResult {
    /// The transformed CSS code.
    pub code: String,
    /// Source map JSON, when requested.
    pub map: Option<String>,
}

/// Resolve browserslist queries into lightningcss targets.
pub fn resolve_browsers<S: AsRef<str>>(queries: &[S]) -> Result<Option<Browsers>, StyleError> {
    Browsers::from_browserslist(queries.iter().map(AsRef::as_ref)).map_err(|e| {
        StyleError::Browsers {
            query: queries
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(", "),
            message: e.to_string(),
        }
    })
}

/// Process CSS with lightningcss.
///
/// Prefixes for `targets`, flattens nesting the targets do not support and
/// optionally minifies. With `source_map` set the result includes the map
/// JSON for the printed code.
pub fn process_css(source: &str, options: &CssOptions) -> Result<CssResult, StyleError> {
    let filename = options
        .filename
        .clone()
        .unwrap_or_else(|| "input.css".to_string());

    let parser_options = ParserOptions {
        filename: filename.clone(),
        ..ParserOptions::default()
    };

    let mut stylesheet =
        StyleSheet::parse(source, parser_options).map_err(|e| StyleError::Parse {
            path: filename.clone(),
            message: e.to_string(),
        })?;

    let targets = Targets {
        browsers: options.targets,
        ..Targets::default()
    };

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..Default::default()
        })
        .map_err(|e| StyleError::Transform {
            path: filename.clone(),
            message: e.to_string(),
        })?;

    // `source` is compiled Sass, so the map names the entry without embedding
    // text that would not match it.
    let mut source_map = options.source_map.then(|| {
        let mut map = SourceMap::new("/");
        map.add_source(&filename);
        map
    });

    let printer_options = PrinterOptions {
        minify: options.minify,
        targets,
        source_map: source_map.as_mut(),
        ..Default::default()
    };

    let output = stylesheet
        .to_css(printer_options)
        .map_err(|e| StyleError::Print {
            path: filename.clone(),
            message: e.to_string(),
        })?;

    let map = match source_map.as_mut() {
        Some(map) => Some(map.to_json(None).map_err(|e| StyleError::SourceMap {
            path: filename.clone(),
            message: format!("{e:?}"),
        })?),
        None => None,
    };

    Ok(CssResult {
        code: output.code,
        map,
    })
}

/// One stylesheet entry point and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleEntry {
    /// Entry source, e.g. `src/scss/styles.scss`.
    pub source: PathBuf,
    /// CSS artifact, e.g. `css/styles.css`.
    pub output: PathBuf,
    /// Completion notice for this entry.
    pub notice: &'static str,
}

impl StyleEntry {
    /// Source map artifact for this entry.
    #[must_use]
    pub fn map_path(&self) -> PathBuf {
        ProjectLayout::map_path_for(&self.output)
    }
}

/// Written artifacts for one entry.
#[derive(Debug, Clone)]
pub struct CompiledStyle {
    pub entry: StyleEntry,
    pub css_path: PathBuf,
    pub map_path: PathBuf,
    pub bytes: usize,
}

/// Outcome of compiling every entry.
#[derive(Debug, Default)]
pub struct StyleReport {
    pub compiled: Vec<CompiledStyle>,
    pub failed: Vec<(StyleEntry, StyleError)>,
}

impl StyleReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// CSS files written in this run.
    #[must_use]
    pub fn written_css(&self) -> Vec<PathBuf> {
        self.compiled.iter().map(|c| c.css_path.clone()).collect()
    }
}

/// Stylesheet compiler options.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    /// Browserslist queries.
    pub browsers: Vec<String>,
    pub minify: bool,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            browsers: vec![DEFAULT_BROWSERS.to_string()],
            minify: true,
        }
    }
}

/// Compiles the theme and editor stylesheets.
#[derive(Debug, Clone)]
pub struct StyleCompiler {
    layout: ProjectLayout,
    minify: bool,
    targets: Option<Browsers>,
}

impl StyleCompiler {
    /// Create a compiler. Browserslist queries are resolved once here.
    pub fn new(layout: ProjectLayout, options: &StyleOptions) -> Result<Self, StyleError> {
        let targets = resolve_browsers(&options.browsers)?;
        Ok(Self {
            layout,
            minify: options.minify,
            targets,
        })
    }

    /// The theme and editor entries, in that order.
    #[must_use]
    pub fn entries(&self) -> Vec<StyleEntry> {
        let scss = self.layout.scss_dir();
        let css = self.layout.css_out_dir();
        vec![
            StyleEntry {
                source: scss.join(THEME_ENTRY),
                output: css.join(css_name(THEME_ENTRY)),
                notice: messages::THEME_STYLES,
            },
            StyleEntry {
                source: scss.join(EDITOR_ENTRY),
                output: css.join(css_name(EDITOR_ENTRY)),
                notice: messages::EDITOR_STYLES,
            },
        ]
    }

    /// Compile one entry to CSS text and map JSON without writing anything.
    pub fn render_entry(&self, entry: &StyleEntry) -> Result<(String, String), StyleError> {
        let css = compile_sass_file(&entry.source, &SassOptions::default())?;

        let result = process_css(
            &css,
            &CssOptions {
                minify: self.minify,
                source_map: true,
                filename: Some(self.layout.map_source_name(&entry.source)),
                targets: self.targets,
            },
        )?;

        let map_name = entry
            .map_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let code = format!(
            "{}\n/*# sourceMappingURL={MAPS_DIR}/{map_name} */\n",
            result.code.trim_end()
        );

        Ok((code, result.map.unwrap_or_default()))
    }

    /// Compile one entry and write its CSS and map.
    ///
    /// Nothing is written when compilation fails.
    pub fn compile_entry(&self, entry: &StyleEntry) -> Result<CompiledStyle, StyleError> {
        let (code, map) = self.render_entry(entry)?;
        let map_path = entry.map_path();

        atomic_write(&entry.output, code.as_bytes()).map_err(|source| StyleError::Write {
            path: entry.output.clone(),
            source,
        })?;
        atomic_write(&map_path, map.as_bytes()).map_err(|source| StyleError::Write {
            path: map_path.clone(),
            source,
        })?;

        tracing::debug!(
            entry = %self.layout.relative(&entry.source),
            path = %self.layout.relative(&entry.output),
            bytes = code.len(),
            "wrote stylesheet"
        );
        notice::completed(entry.notice);

        Ok(CompiledStyle {
            entry: entry.clone(),
            css_path: entry.output.clone(),
            map_path,
            bytes: code.len(),
        })
    }

    /// Compile every entry. A failing entry is logged and does not stop the others.
    pub fn compile_all(&self) -> StyleReport {
        let mut report = StyleReport::default();
        for entry in self.entries() {
            match self.compile_entry(&entry) {
                Ok(compiled) => report.compiled.push(compiled),
                Err(e) => {
                    tracing::error!(path = %self.layout.relative(&entry.source), "{e}");
                    report.failed.push((entry, e));
                }
            }
        }
        report
    }
}

fn css_name(entry: &str) -> String {
    let stem = Path::new(entry)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.to_string());
    format!("{stem}.css")
}
