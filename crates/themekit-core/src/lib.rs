#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::return_self_not_must_use)]

//! Asset pipeline for server-rendered themes.
//!
//! Each pipeline step reads a fixed source set below the project root and
//! rewrites its artifacts in full:
//!
//! - [`styles`]: SCSS entry points to prefixed, minified CSS with maps
//! - [`scripts`]: `src/js/*.js` to one minified bundle with a map
//! - [`sprite`]: icon SVGs to an inline `<defs>` sprite in the template
//! - [`images`]: PNG/JPEG recompression

pub mod config;
pub mod error;
pub mod images;
pub mod notice;
pub mod paths;
pub mod scripts;
pub mod sprite;
pub mod styles;
pub mod version;

pub use config::{Config, ProjectConfig};
pub use error::Error;
pub use images::{ImageOptimizer, ImageOptions, ImageReport};
pub use paths::ProjectLayout;
pub use scripts::{ScriptBundler, ScriptOptions};
pub use sprite::{SpriteBuilder, SpriteReport};
pub use styles::{StyleCompiler, StyleOptions, StyleReport};
pub use version::VERSION;
