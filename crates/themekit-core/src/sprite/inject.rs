//! Inline the sprite into the page template.
//!
//! The template carries `<!-- inject:svg -->`. When that tag is followed by
//! `<!-- endinject -->` the region between them is replaced and both tags
//! stay, so injecting again replaces the previous sprite. A lone start tag
//! is replaced outright.

use super::SpriteError;
use std::path::Path;
use themekit_util::fs::atomic_write;

/// Closing tag of an injection region.
pub const END_MARKER: &str = "<!-- endinject -->";

/// Start tag for sprites with extension `ext`.
#[must_use]
pub fn start_marker(ext: &str) -> String {
    format!("<!-- inject:{ext} -->")
}

/// Result of an injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectOutcome {
    /// The first marker was replaced.
    Injected {
        /// Full template after injection.
        output: String,
        /// Start markers after the first one that were left alone.
        extra_markers: usize,
    },
    /// The template has no marker.
    MarkerMissing,
}

/// Inject `sprite` at the first marker in `template`.
///
/// Everything outside the replaced region is kept byte for byte.
#[must_use]
pub fn inject(template: &str, sprite: &str, ext: &str) -> InjectOutcome {
    let marker = start_marker(ext);
    let Some(start) = template.find(&marker) else {
        return InjectOutcome::MarkerMissing;
    };
    let after_marker = start + marker.len();
    let rest = &template[after_marker..];

    let next_marker = rest.find(&marker);
    let region_end = rest
        .find(END_MARKER)
        .filter(|end| next_marker.map_or(true, |next| *end < next));

    let (output, suffix) = match region_end {
        Some(end) => {
            let suffix = &rest[end..];
            (
                format!("{}{marker}{sprite}{suffix}", &template[..start]),
                suffix,
            )
        }
        None => (format!("{}{sprite}{rest}", &template[..start]), rest),
    };

    InjectOutcome::Injected {
        extra_markers: suffix.matches(marker.as_str()).count(),
        output,
    }
}

/// Inject the sprite file at `sprite_path` into the template at `template_path`.
///
/// The template is rewritten only when the marker is present and the
/// content actually changes.
pub fn inject_file(template_path: &Path, sprite_path: &Path) -> Result<InjectOutcome, SpriteError> {
    let template = std::fs::read_to_string(template_path).map_err(|source| SpriteError::Io {
        path: template_path.to_path_buf(),
        source,
    })?;
    let sprite = std::fs::read_to_string(sprite_path).map_err(|source| SpriteError::Io {
        path: sprite_path.to_path_buf(),
        source,
    })?;

    let ext = sprite_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("svg");

    let outcome = inject(&template, sprite.trim_end(), ext);
    match &outcome {
        InjectOutcome::Injected {
            output,
            extra_markers,
        } => {
            if *extra_markers > 0 {
                tracing::warn!(
                    path = %template_path.display(),
                    count = extra_markers,
                    "only the first {} marker is injected",
                    start_marker(ext)
                );
            }
            if *output != template {
                atomic_write(template_path, output.as_bytes()).map_err(|source| {
                    SpriteError::Write {
                        path: template_path.to_path_buf(),
                        source,
                    }
                })?;
            }
        }
        InjectOutcome::MarkerMissing => {
            tracing::warn!(
                path = %template_path.display(),
                "no {} marker, template left unchanged",
                start_marker(ext)
            );
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SPRITE: &str = "<svg><defs></defs></svg>";

    fn injected(outcome: InjectOutcome) -> (String, usize) {
        match outcome {
            InjectOutcome::Injected {
                output,
                extra_markers,
            } => (output, extra_markers),
            InjectOutcome::MarkerMissing => panic!("marker not found"),
        }
    }

    #[test]
    fn test_single_marker_is_replaced() {
        let template = "<body>\n<!-- inject:svg -->\n<main>";
        let (output, extra) = injected(inject(template, SPRITE, "svg"));
        assert_eq!(output, format!("<body>\n{SPRITE}\n<main>"));
        assert_eq!(extra, 0);
    }

    #[test]
    fn test_region_is_replaced_and_tags_kept() {
        let template = "<body><!-- inject:svg --><svg>old</svg><!-- endinject --></body>";
        let (output, _) = injected(inject(template, SPRITE, "svg"));
        assert_eq!(
            output,
            format!("<body><!-- inject:svg -->{SPRITE}<!-- endinject --></body>")
        );

        let (again, _) = injected(inject(&output, SPRITE, "svg"));
        assert_eq!(again, output);
    }

    #[test]
    fn test_only_first_marker_processed() {
        let template = "a<!-- inject:svg -->b<!-- inject:svg -->c";
        let (output, extra) = injected(inject(template, SPRITE, "svg"));
        assert_eq!(output, format!("a{SPRITE}b<!-- inject:svg -->c"));
        assert_eq!(extra, 1);
    }

    #[test]
    fn test_end_tag_after_second_marker_does_not_form_region() {
        let template = "<!-- inject:svg -->x<!-- inject:svg -->y<!-- endinject -->";
        let (output, extra) = injected(inject(template, SPRITE, "svg"));
        assert_eq!(
            output,
            format!("{SPRITE}x<!-- inject:svg -->y<!-- endinject -->")
        );
        assert_eq!(extra, 1);
    }

    #[test]
    fn test_marker_missing() {
        assert_eq!(
            inject("<body></body>", SPRITE, "svg"),
            InjectOutcome::MarkerMissing
        );
        assert_eq!(
            inject("<!-- inject:png -->", SPRITE, "svg"),
            InjectOutcome::MarkerMissing
        );
    }

    #[test]
    fn test_inject_file_rewrites_template() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("header.php");
        let sprite = dir.path().join("sprite.svg");
        fs::write(&template, "<?php ?>\n<!-- inject:svg -->\n").unwrap();
        fs::write(&sprite, format!("{SPRITE}\n")).unwrap();

        let outcome = inject_file(&template, &sprite).unwrap();
        assert!(matches!(outcome, InjectOutcome::Injected { .. }));
        assert_eq!(
            fs::read_to_string(&template).unwrap(),
            format!("<?php ?>\n{SPRITE}\n")
        );
    }

    #[test]
    fn test_inject_file_missing_marker_leaves_template() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("header.php");
        let sprite = dir.path().join("sprite.svg");
        fs::write(&template, "<?php get_header(); ?>").unwrap();
        fs::write(&sprite, SPRITE).unwrap();

        let outcome = inject_file(&template, &sprite).unwrap();
        assert_eq!(outcome, InjectOutcome::MarkerMissing);
        assert_eq!(
            fs::read_to_string(&template).unwrap(),
            "<?php get_header(); ?>"
        );
    }

    #[test]
    fn test_inject_file_missing_template() {
        let dir = tempdir().unwrap();
        let sprite = dir.path().join("sprite.svg");
        fs::write(&sprite, SPRITE).unwrap();

        let err = inject_file(&dir.path().join("header.php"), &sprite).unwrap_err();
        assert!(matches!(err, SpriteError::Io { .. }));
    }
}
