//! SVG sprite generation.
//!
//! Icons in `src/images/svg-sprite/` become `<symbol>` elements inside a
//! hidden `<svg><defs>` document at `images/sprite.svg`, which is then
//! inlined into `header.php`. Standalone SVGs in `src/images/` are copied
//! to `images/` unchanged.

pub mod inject;

use crate::notice::{self, messages};
use crate::paths::ProjectLayout;
use inject::{inject_file, InjectOutcome};
use roxmltree::{Document, Node, ParsingOptions};
use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};
use themekit_util::fs::{atomic_write, copy_atomic, list_files, remove_if_present};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Sprite error.
#[derive(Debug, thiserror::Error)]
pub enum SpriteError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid SVG in {id}: {message}")]
    Parse { id: String, message: String },

    #[error("root element of {id} is <{found}>, expected <svg>")]
    NotSvg { id: String, found: String },

    #[error("duplicate icon id {0:?}")]
    DuplicateId(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One icon, ready to become a `<symbol>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteIcon {
    pub id: String,
    pub view_box: Option<String>,
    pub preserve_aspect_ratio: Option<String>,
    /// Prefixed namespaces declared on the icon root, other than SVG and xlink.
    pub namespaces: Vec<(String, String)>,
    /// Markup between the icon's `<svg>` tags, verbatim apart from internal
    /// ids and their references, which are prefixed with the icon id.
    pub inner: String,
}

impl SpriteIcon {
    /// Parse an icon document. The root element must be `<svg>`.
    pub fn parse(id: impl Into<String>, text: &str) -> Result<Self, SpriteError> {
        let id = id.into();
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options).map_err(|e| SpriteError::Parse {
            id: id.clone(),
            message: e.to_string(),
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(SpriteError::NotSvg {
                id,
                found: root.tag_name().name().to_string(),
            });
        }

        let inner = scoped_inner(root, text, &id);
        let namespaces = root
            .namespaces()
            .filter_map(|ns| {
                let prefix = ns.name()?;
                let foreign = prefix != "xml" && ns.uri() != SVG_NS && ns.uri() != XLINK_NS;
                foreign.then(|| (prefix.to_string(), ns.uri().to_string()))
            })
            .collect();

        Ok(Self {
            view_box: root.attribute("viewBox").map(str::to_string),
            preserve_aspect_ratio: root.attribute("preserveAspectRatio").map(str::to_string),
            namespaces,
            inner,
            id,
        })
    }

    fn write_symbol(&self, out: &mut String) {
        out.push_str("<symbol id=\"");
        out.push_str(&escape_attr(&self.id));
        out.push('"');
        if let Some(view_box) = &self.view_box {
            out.push_str(" viewBox=\"");
            out.push_str(&escape_attr(view_box));
            out.push('"');
        }
        if let Some(ratio) = &self.preserve_aspect_ratio {
            out.push_str(" preserveAspectRatio=\"");
            out.push_str(&escape_attr(ratio));
            out.push('"');
        }
        for (prefix, uri) in &self.namespaces {
            out.push_str(" xmlns:");
            out.push_str(prefix);
            out.push_str("=\"");
            out.push_str(&escape_attr(uri));
            out.push('"');
        }
        out.push('>');
        out.push_str(&self.inner);
        out.push_str("</symbol>");
    }
}

/// Source text between the root tags with every internal id, and each
/// `href="#id"` or `url(#id)` pointing at one, prefixed with `{icon_id}-`.
fn scoped_inner(root: Node, text: &str, icon_id: &str) -> String {
    let (Some(first), Some(last)) = (root.first_child(), root.last_child()) else {
        return String::new();
    };

    let elements: Vec<Node> = root
        .descendants()
        .filter(|n| n.is_element() && *n != root)
        .collect();
    let internal: HashSet<&str> = elements.iter().filter_map(|n| n.attribute("id")).collect();

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    for node in &elements {
        for attr in node.attributes() {
            let range = attr.range_value();
            let replacement = if attr.namespace().is_none() && attr.name() == "id" {
                Some(escape_attr(&format!("{icon_id}-{}", attr.value())))
            } else if attr.name() == "href" {
                attr.value()
                    .strip_prefix('#')
                    .filter(|target| internal.contains(target))
                    .map(|target| escape_attr(&format!("#{icon_id}-{target}")))
            } else {
                scope_url_refs(&text[range.clone()], &internal, icon_id)
            };
            if let Some(replacement) = replacement {
                edits.push((range, replacement));
            }
        }
    }
    edits.sort_by_key(|(range, _)| range.start);

    let mut out = String::new();
    let mut pos = first.range().start;
    for (range, replacement) in edits {
        out.push_str(&text[pos..range.start]);
        out.push_str(&replacement);
        pos = range.end;
    }
    out.push_str(&text[pos..last.range().end]);
    out.trim().to_string()
}

/// Prefix `url(#id)` references to internal ids. `None` when nothing changed.
fn scope_url_refs(raw: &str, internal: &HashSet<&str>, icon_id: &str) -> Option<String> {
    const OPEN: &str = "url(#";

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut changed = false;
    while let Some(pos) = rest.find(OPEN) {
        let (before, after) = rest.split_at(pos + OPEN.len());
        out.push_str(before);
        let end = after.find(')').unwrap_or(after.len());
        if internal.contains(&after[..end]) {
            out.push_str(icon_id);
            out.push('-');
            changed = true;
        }
        rest = after;
    }
    out.push_str(rest);
    changed.then_some(out)
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Render the sprite document. Symbols are ordered by id.
pub fn build_sprite(icons: &[SpriteIcon]) -> Result<String, SpriteError> {
    let mut by_id = BTreeMap::new();
    for icon in icons {
        if by_id.insert(icon.id.as_str(), icon).is_some() {
            return Err(SpriteError::DuplicateId(icon.id.clone()));
        }
    }

    let mut out = format!(
        "<svg xmlns=\"{SVG_NS}\" xmlns:xlink=\"{XLINK_NS}\" style=\"position:absolute;width:0;height:0\"><defs>"
    );
    for icon in by_id.values() {
        icon.write_symbol(&mut out);
    }
    out.push_str("</defs></svg>");
    Ok(out)
}

/// Result of a sprite run.
#[derive(Debug, Clone)]
pub struct SpriteReport {
    pub sprite_path: PathBuf,
    pub icons: usize,
    pub injected: InjectOutcome,
    /// Standalone SVGs copied to the output directory.
    pub copied: Vec<PathBuf>,
}

/// Builds the sprite, inlines it and copies standalone SVGs.
#[derive(Debug, Clone)]
pub struct SpriteBuilder {
    layout: ProjectLayout,
}

impl SpriteBuilder {
    #[must_use]
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    /// Read and parse every icon in the sprite source directory.
    pub fn collect_icons(&self) -> Result<Vec<SpriteIcon>, SpriteError> {
        let dir = self.layout.sprite_src_dir();
        let files = list_files(&dir, &["svg"]).map_err(|source| SpriteError::Io {
            path: dir.clone(),
            source,
        })?;

        files
            .iter()
            .map(|path| {
                let text = std::fs::read_to_string(path).map_err(|source| SpriteError::Io {
                    path: path.clone(),
                    source,
                })?;
                SpriteIcon::parse(icon_id(path), &text)
            })
            .collect()
    }

    /// Build and write `images/sprite.svg`. Returns the icon count.
    pub fn build(&self) -> Result<usize, SpriteError> {
        let sprite_path = self.layout.sprite_path();
        if remove_if_present(&sprite_path).map_err(|source| SpriteError::Write {
            path: sprite_path.clone(),
            source,
        })? {
            tracing::debug!(path = %self.layout.relative(&sprite_path), "removed stale sprite");
        }

        let icons = self.collect_icons()?;
        if icons.is_empty() {
            tracing::warn!(
                dir = %self.layout.relative(&self.layout.sprite_src_dir()),
                "no sprite icons found"
            );
        }

        let document = build_sprite(&icons)?;
        atomic_write(&sprite_path, document.as_bytes()).map_err(|source| SpriteError::Write {
            path: sprite_path.clone(),
            source,
        })?;

        tracing::debug!(
            path = %self.layout.relative(&sprite_path),
            count = icons.len(),
            bytes = document.len(),
            "wrote sprite"
        );
        notice::completed(messages::SPRITE_BUILT);
        Ok(icons.len())
    }

    /// Copy `src/images/*.svg` to `images/` byte for byte.
    pub fn copy_standalone(&self) -> Result<Vec<PathBuf>, SpriteError> {
        let src = self.layout.images_src_dir();
        let out = self.layout.images_out_dir();
        let files = list_files(&src, &["svg"]).map_err(|source| SpriteError::Io {
            path: src.clone(),
            source,
        })?;

        let mut copied = Vec::with_capacity(files.len());
        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let target = out.join(name);
            copy_atomic(&file, &target).map_err(|source| SpriteError::Write {
                path: target.clone(),
                source,
            })?;
            copied.push(target);
        }

        notice::completed(messages::SVG_COPIED);
        Ok(copied)
    }

    /// Build the sprite, inject it into the template, copy standalone SVGs.
    pub fn run(&self) -> Result<SpriteReport, SpriteError> {
        let icons = self.build()?;
        let sprite_path = self.layout.sprite_path();

        let injected = inject_file(&self.layout.template_path(), &sprite_path)?;
        if matches!(injected, InjectOutcome::Injected { .. }) {
            notice::completed(messages::SPRITE_INJECTED);
        }

        let copied = self.copy_standalone()?;

        Ok(SpriteReport {
            sprite_path,
            icons,
            injected,
            copied,
        })
    }
}

fn icon_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const ARROW: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="24" height="24">
  <path d="M12 4l8 8-8 8"/>
</svg>
"#;

    const CLOSE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 16 16" preserveAspectRatio="xMidYMid meet"><title>Close</title><path d="M2 2l12 12M14 2L2 14"/></svg>"#;

    fn theme() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let sprite_src = dir.path().join("src/images/svg-sprite");
        fs::create_dir_all(&sprite_src).unwrap();
        fs::write(sprite_src.join("close.svg"), CLOSE).unwrap();
        fs::write(sprite_src.join("arrow.svg"), ARROW).unwrap();
        fs::write(dir.path().join("src/images/logo.svg"), "<svg id=\"logo\"/>\n").unwrap();
        fs::write(
            dir.path().join("header.php"),
            "<body <?php body_class(); ?>>\n<!-- inject:svg -->\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_parse_icon() {
        let icon = SpriteIcon::parse("arrow", ARROW).unwrap();
        assert_eq!(icon.view_box.as_deref(), Some("0 0 24 24"));
        assert_eq!(icon.preserve_aspect_ratio, None);
        assert_eq!(icon.inner, r#"<path d="M12 4l8 8-8 8"/>"#);
    }

    #[test]
    fn test_parse_rejects_non_svg_root() {
        let err = SpriteIcon::parse("bad", "<html></html>").unwrap_err();
        assert!(matches!(err, SpriteError::NotSvg { .. }));

        let err = SpriteIcon::parse("bad", "<svg><path></svg>").unwrap_err();
        assert!(matches!(err, SpriteError::Parse { .. }));
    }

    #[test]
    fn test_parse_allows_doctype() {
        let text = r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><rect width="1" height="1"/></svg>"#;
        let icon = SpriteIcon::parse("dot", text).unwrap();
        assert_eq!(icon.inner, r#"<rect width="1" height="1"/>"#);
    }

    #[test]
    fn test_build_sprite_orders_symbols() {
        let icons = vec![
            SpriteIcon::parse("close", CLOSE).unwrap(),
            SpriteIcon::parse("arrow", ARROW).unwrap(),
        ];
        let sprite = build_sprite(&icons).unwrap();

        assert!(sprite.starts_with(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" style=\"position:absolute;width:0;height:0\"><defs>"
        ));
        assert_eq!(sprite.matches("<symbol ").count(), 2);
        assert!(sprite.find("id=\"arrow\"").unwrap() < sprite.find("id=\"close\"").unwrap());
        assert!(sprite.contains(
            "<symbol id=\"close\" viewBox=\"0 0 16 16\" preserveAspectRatio=\"xMidYMid meet\"><title>Close</title>"
        ));
        assert!(sprite.ends_with("</symbol></defs></svg>"));

        let doc = Document::parse(&sprite).unwrap();
        assert_eq!(doc.root_element().tag_name().name(), "svg");
    }

    const INKSCAPE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape" viewBox="0 0 1 1"><sodipodi:namedview id="nv" inkscape:zoom="1"/><defs><linearGradient id="a"><stop offset="0"/></linearGradient></defs><path fill="url(#a)" d="M0 0h1v1z"/><use xlink:href="#a"/></svg>"##;

    const BADGE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"><clipPath id="a"><rect width="1" height="1"/></clipPath><circle clip-path="url(#a)" r="1"/></svg>"#;

    #[test]
    fn test_foreign_namespaces_survive_in_sprite() {
        let icon = SpriteIcon::parse("logo", INKSCAPE).unwrap();
        let mut namespaces = icon.namespaces.clone();
        namespaces.sort();
        assert_eq!(
            namespaces,
            vec![
                (
                    "inkscape".to_string(),
                    "http://www.inkscape.org/namespaces/inkscape".to_string()
                ),
                (
                    "sodipodi".to_string(),
                    "http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd".to_string()
                ),
            ]
        );

        let sprite = build_sprite(&[icon]).unwrap();
        let doc = Document::parse(&sprite).unwrap();
        let namedview = doc
            .descendants()
            .find(|n| n.tag_name().name() == "namedview")
            .unwrap();
        assert_eq!(
            namedview.tag_name().namespace(),
            Some("http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd")
        );
    }

    #[test]
    fn test_internal_ids_are_scoped_per_icon() {
        let icons = vec![
            SpriteIcon::parse("logo", INKSCAPE).unwrap(),
            SpriteIcon::parse("badge", BADGE).unwrap(),
        ];
        let sprite = build_sprite(&icons).unwrap();

        assert!(sprite.contains(r#"<linearGradient id="logo-a">"#));
        assert!(sprite.contains(r##"fill="url(#logo-a)""##));
        assert!(sprite.contains(r##"xlink:href="#logo-a""##));
        assert!(sprite.contains(r#"<clipPath id="badge-a">"#));
        assert!(sprite.contains(r##"clip-path="url(#badge-a)""##));

        let doc = Document::parse(&sprite).unwrap();
        let ids: Vec<&str> = doc
            .descendants()
            .filter_map(|n| n.attribute("id"))
            .collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_external_references_are_left_alone() {
        let text = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#shared"/><path fill="url(#other)"/></svg>"##;
        let icon = SpriteIcon::parse("i", text).unwrap();
        assert_eq!(
            icon.inner,
            r##"<use xlink:href="#shared"/><path fill="url(#other)"/>"##
        );
        assert!(icon.namespaces.is_empty());
    }

    #[test]
    fn test_build_sprite_rejects_duplicates() {
        let icons = vec![
            SpriteIcon::parse("arrow", ARROW).unwrap(),
            SpriteIcon::parse("arrow", CLOSE).unwrap(),
        ];
        assert!(matches!(
            build_sprite(&icons),
            Err(SpriteError::DuplicateId(id)) if id == "arrow"
        ));
    }

    #[test]
    fn test_build_empty_sprite() {
        assert_eq!(
            build_sprite(&[]).unwrap(),
            format!("<svg xmlns=\"{SVG_NS}\" xmlns:xlink=\"{XLINK_NS}\" style=\"position:absolute;width:0;height:0\"><defs></defs></svg>")
        );
    }

    #[test]
    fn test_run_builds_injects_and_copies() {
        let dir = theme();
        let builder = SpriteBuilder::new(ProjectLayout::new(dir.path()));

        let report = builder.run().unwrap();
        assert_eq!(report.icons, 2);
        assert_eq!(report.copied, vec![dir.path().join("images/logo.svg")]);

        let sprite = fs::read_to_string(dir.path().join("images/sprite.svg")).unwrap();
        let header = fs::read_to_string(dir.path().join("header.php")).unwrap();
        assert_eq!(
            header,
            format!("<body <?php body_class(); ?>>\n{sprite}\n")
        );
        assert_eq!(
            fs::read(dir.path().join("images/logo.svg")).unwrap(),
            b"<svg id=\"logo\"/>\n"
        );
    }

    #[test]
    fn test_build_replaces_stale_sprite() {
        let dir = theme();
        fs::create_dir_all(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images/sprite.svg"), "stale").unwrap();
        fs::remove_file(dir.path().join("src/images/svg-sprite/close.svg")).unwrap();

        let count = SpriteBuilder::new(ProjectLayout::new(dir.path()))
            .build()
            .unwrap();
        assert_eq!(count, 1);

        let sprite = fs::read_to_string(dir.path().join("images/sprite.svg")).unwrap();
        assert!(!sprite.contains("stale"));
        assert!(!sprite.contains("close"));
    }

    #[test]
    fn test_run_with_invalid_icon_fails() {
        let dir = theme();
        fs::write(dir.path().join("src/images/svg-sprite/broken.svg"), "<svg>").unwrap();

        let err = SpriteBuilder::new(ProjectLayout::new(dir.path()))
            .run()
            .unwrap_err();
        assert!(matches!(err, SpriteError::Parse { id, .. } if id == "broken"));
    }
}
