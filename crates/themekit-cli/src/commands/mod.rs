//! Command implementations.

pub mod dev;
pub mod images;
pub mod scripts;
pub mod serve;
pub mod sprite;
pub mod styles;
pub mod version;

use miette::{IntoDiagnostic, Result};
use std::path::Path;
use themekit_core::config::load_config;
use themekit_core::{Error, ProjectConfig, ProjectLayout};

/// Project root plus its optional `themekit.json`.
#[derive(Debug, Clone)]
pub struct Project {
    pub layout: ProjectLayout,
    pub config: ProjectConfig,
}

impl Project {
    /// Load the project at `root`. `config_file` replaces discovery of
    /// `themekit.json` and must exist.
    pub fn load(root: &Path, config_file: Option<&Path>) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::ProjectNotFound {
                path: root.to_path_buf(),
            })
            .into_diagnostic();
        }

        let config = match load_config(root, config_file).into_diagnostic()? {
            Some((path, config)) => {
                tracing::debug!(path = %path.display(), "loaded project config");
                config
            }
            None => ProjectConfig::default(),
        };
        Ok(Self {
            layout: ProjectLayout::new(root),
            config,
        })
    }
}
