//! Sass/SCSS preprocessing using grass.
//!
//! Compiles `.scss` and `.sass` entry points to plain CSS. Partials are
//! resolved relative to the entry file and through the configured load paths.

use super::StyleError;
use std::path::{Path, PathBuf};

/// Sass compilation options.
#[derive(Debug, Clone, Default)]
pub struct SassOptions {
    /// Include paths for @import/@use resolution.
    pub load_paths: Vec<PathBuf>,
    /// Output style (expanded or compressed).
    pub minify: bool,
    /// Source file path (for error messages and imports).
    pub filename: Option<String>,
}

impl SassOptions {
    fn to_grass(&self) -> grass::Options<'_> {
        let style = if self.minify {
            grass::OutputStyle::Compressed
        } else {
            grass::OutputStyle::Expanded
        };
        let mut options = grass::Options::default().style(style);

        for path in &self.load_paths {
            options = options.load_path(path);
        }

        // The entry's own directory resolves sibling partials
        if let Some(parent) = self.filename.as_deref().and_then(|f| Path::new(f).parent()) {
            options = options.load_path(parent);
        }

        options
    }
}

/// Compile Sass/SCSS source text to CSS.
pub fn compile_sass(source: &str, options: &SassOptions) -> Result<String, StyleError> {
    let path = options
        .filename
        .clone()
        .unwrap_or_else(|| "input.scss".to_string());

    grass::from_string(source.to_string(), &options.to_grass()).map_err(|e| StyleError::Sass {
        path,
        message: e.to_string(),
    })
}

/// Compile a Sass/SCSS file to CSS.
pub fn compile_sass_file(path: &Path, options: &SassOptions) -> Result<String, StyleError> {
    if !path.is_file() {
        return Err(StyleError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "entry not found"),
        });
    }

    let options = SassOptions {
        filename: Some(path.display().to_string()),
        ..options.clone()
    };

    grass::from_path(path, &options.to_grass()).map_err(|e| StyleError::Sass {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
