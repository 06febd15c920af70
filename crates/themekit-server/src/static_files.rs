//! Static serving from the project root, used when no upstream is proxied.

use crate::client::inject_client_script;
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};

/// Content type for a file extension.
#[must_use]
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Map a request path onto a file under `root`.
///
/// The path is percent-decoded first. Returns `None` for paths that are not
/// UTF-8 once decoded or that try to leave the root.
#[must_use]
pub fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let raw = url_path.split(['?', '#']).next().unwrap_or_default();
    let path = percent_decode_str(raw).decode_utf8().ok()?;
    let rel = Path::new(path.trim_start_matches('/'));

    let mut resolved = root.to_path_buf();
    for component in rel.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if resolved.is_dir() {
        resolved.push("index.html");
    }
    Some(resolved)
}

/// Serve `url_path` from `root`. HTML pages get the live-reload client.
pub async fn serve(root: &Path, url_path: &str) -> Response {
    let Some(path) = resolve(root, url_path) else {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (StatusCode::NOT_FOUND, format!("Not found: {url_path}")).into_response();
        }
    };

    let content_type = content_type(&path);
    let body = if content_type.starts_with("text/html") {
        Body::from(inject_client_script(&String::from_utf8_lossy(&bytes)))
    } else {
        Body::from(bytes)
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}
