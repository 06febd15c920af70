//! Completion notices for finished pipeline steps.
//!
//! Every step announces itself once when it finishes, the way a task runner
//! pops a desktop notification. Notices are plain `tracing` events on the
//! `themekit::notice` target so they can be filtered or routed separately.

/// Tracing target used for completion notices.
pub const NOTICE_TARGET: &str = "themekit::notice";

/// Emit a completion notice.
pub fn completed(message: &str) {
    tracing::info!(target: NOTICE_TARGET, "{message}");
}

/// Standard notice messages.
pub mod messages {
    pub const THEME_STYLES: &str = "SASS Status: Theme Styles Compiled";
    pub const EDITOR_STYLES: &str = "SASS Status: Editor Styles Compiled";
    pub const SCRIPTS: &str = "JS Status: Compiled";
    pub const SPRITE_BUILT: &str = "Sprite SVG Status: Built";
    pub const SPRITE_INJECTED: &str = "Sprite SVG Status: Injected";
    pub const SVG_COPIED: &str = "Non-Sprite SVG Status: Copied";
    pub const IMAGES: &str = "IMG Status: Optimized";
}
