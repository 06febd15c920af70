//! Fixed project layout.
//!
//! ```text
//! <root>/
//!   header.php            template with the sprite marker
//!   src/scss/             stylesheet sources (styles.scss, editor-styles.scss, partials)
//!   src/js/               script sources, concatenated in listing order
//!   src/images/           standalone SVGs and raster sources
//!   src/images/svg-sprite icons merged into the sprite
//!   css/  js/  images/    generated artifacts
//! ```
//!
//! Only the root is chosen at runtime; everything below it is fixed.

use std::path::{Path, PathBuf};

/// Name of the maps directory written next to CSS and JS output.
pub const MAPS_DIR: &str = "maps";

/// Theme stylesheet entry point, relative to the stylesheet source tree.
pub const THEME_ENTRY: &str = "styles.scss";

/// Editor stylesheet entry point, relative to the stylesheet source tree.
pub const EDITOR_ENTRY: &str = "editor-styles.scss";

/// Concatenated script output name.
pub const SCRIPT_OUTPUT: &str = "scripts.js";

/// Sprite output name.
pub const SPRITE_OUTPUT: &str = "sprite.svg";

/// Template receiving the inline sprite.
pub const TEMPLATE: &str = "header.php";

/// Resolved paths for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Create a layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn scss_dir(&self) -> PathBuf {
        self.root.join("src").join("scss")
    }

    #[must_use]
    pub fn js_src_dir(&self) -> PathBuf {
        self.root.join("src").join("js")
    }

    #[must_use]
    pub fn images_src_dir(&self) -> PathBuf {
        self.root.join("src").join("images")
    }

    #[must_use]
    pub fn sprite_src_dir(&self) -> PathBuf {
        self.images_src_dir().join("svg-sprite")
    }

    #[must_use]
    pub fn css_out_dir(&self) -> PathBuf {
        self.root.join("css")
    }

    #[must_use]
    pub fn js_out_dir(&self) -> PathBuf {
        self.root.join("js")
    }

    #[must_use]
    pub fn images_out_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Path of the generated sprite document.
    #[must_use]
    pub fn sprite_path(&self) -> PathBuf {
        self.images_out_dir().join(SPRITE_OUTPUT)
    }

    /// Path of the template that receives the sprite.
    #[must_use]
    pub fn template_path(&self) -> PathBuf {
        self.root.join(TEMPLATE)
    }

    /// Path of the concatenated script bundle.
    #[must_use]
    pub fn script_output(&self) -> PathBuf {
        self.js_out_dir().join(SCRIPT_OUTPUT)
    }

    /// Source map path for a generated artifact: `<dir>/maps/<name>.map`.
    #[must_use]
    pub fn map_path_for(artifact: &Path) -> PathBuf {
        let name = artifact
            .file_name()
            .map(|n| format!("{}.map", n.to_string_lossy()))
            .unwrap_or_else(|| "output.map".to_string());
        artifact
            .parent()
            .unwrap_or(Path::new("."))
            .join(MAPS_DIR)
            .join(name)
    }

    /// Forward-slash path relative to the root, for logs and glob matching.
    #[must_use]
    pub fn relative(&self, path: &Path) -> String {
        themekit_util::fs::to_slash_relative(&self.root, path)
    }

    /// Name under which a source map refers to `source`.
    ///
    /// Maps live in `<out>/maps/`, two levels below the root.
    #[must_use]
    pub fn map_source_name(&self, source: &Path) -> String {
        format!("../../{}", self.relative(source))
    }

    /// URL path under which the dev server exposes `path`.
    #[must_use]
    pub fn url_path(&self, path: &Path) -> String {
        format!("/{}", self.relative(path))
    }
}
