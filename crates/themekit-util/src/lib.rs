#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for themekit.
//!
//! This crate provides pure helper functions with no logging/tracing dependencies.
//! Logging is handled by the calling crates to keep this library lightweight.

pub mod fs;
