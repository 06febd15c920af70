//! Reverse proxy to the local PHP host.
//!
//! Requests are forwarded unchanged apart from `Host`. Text responses have
//! absolute links to the upstream rewritten to the dev server's origin so
//! navigation stays on the proxy, and HTML pages get the live-reload client.

use crate::client::inject_client_script;
use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Upper bound on buffered request bodies.
const MAX_REQUEST_BODY: usize = 64 * 1024 * 1024;

/// Forwards requests to one upstream origin.
#[derive(Debug, Clone)]
pub struct Proxy {
    client: reqwest::Client,
    origin: String,
    host: String,
}

impl Proxy {
    /// Create a proxy for `upstream`, either `host[:port]` or a full origin.
    pub fn new(upstream: &str) -> Result<Self, reqwest::Error> {
        let origin = if upstream.starts_with("http://") || upstream.starts_with("https://") {
            upstream.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", upstream.trim_end_matches('/'))
        };
        let host = origin
            .split_once("://")
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_else(|| origin.clone());

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            origin,
            host,
        })
    }

    /// Upstream origin, e.g. `http://dev.local`.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Replace absolute references to the upstream with `public_origin`.
    #[must_use]
    pub fn rewrite_links(&self, text: &str, public_origin: &str) -> String {
        let public_host = public_origin
            .split_once("://")
            .map_or(public_origin, |(_, rest)| rest);
        let needle = format!("//{}", self.host);

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find(&needle) {
            let (before, after) = (&rest[..pos], &rest[pos + needle.len()..]);

            if continues_host(after) {
                out.push_str(&rest[..pos + needle.len()]);
                rest = after;
                continue;
            }

            if let Some(prefix) = before
                .strip_suffix("https:")
                .or_else(|| before.strip_suffix("http:"))
            {
                out.push_str(prefix);
                out.push_str(public_origin);
            } else {
                out.push_str(before);
                out.push_str("//");
                out.push_str(public_host);
            }
            rest = after;
        }
        out.push_str(rest);
        out
    }

    /// Forward `req` upstream and adapt the response for the browser.
    pub async fn forward(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();

        let public_origin = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(|h| format!("http://{h}"));

        let path = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        let url = format!("{}{path}", self.origin);

        let body = match to_bytes(body, MAX_REQUEST_BODY).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%url, "failed to read request body: {e}");
                return (StatusCode::BAD_REQUEST, "Bad request body").into_response();
            }
        };

        let mut headers = parts.headers.clone();
        headers.remove(header::HOST);
        // Ask for identity encoding so bodies can be rewritten
        headers.remove(header::ACCEPT_ENCODING);
        headers.remove(header::CONTENT_LENGTH);
        if let Some(origin) = &public_origin {
            if let Ok(value) = HeaderValue::from_str(origin.trim_start_matches("http://")) {
                headers.insert("x-forwarded-host", value);
            }
        }

        let upstream = match self
            .client
            .request(parts.method.clone(), &url)
            .headers(headers)
            .body(body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(%url, "upstream request failed: {e}");
                return (
                    StatusCode::BAD_GATEWAY,
                    format!("Upstream {} unreachable: {e}", self.origin),
                )
                    .into_response();
            }
        };

        let status = upstream.status();
        let mut response_headers = copy_headers(upstream.headers());

        if let (Some(origin), Some(location)) = (
            &public_origin,
            response_headers
                .get(header::LOCATION)
                .and_then(|l| l.to_str().ok())
                .map(str::to_string),
        ) {
            if let Ok(value) = HeaderValue::from_str(&self.rewrite_links(&location, origin)) {
                response_headers.insert(header::LOCATION, value);
            }
        }

        let content_type = response_headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let bytes = match upstream.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(%url, "failed to read upstream body: {e}");
                return (StatusCode::BAD_GATEWAY, "Upstream body error").into_response();
            }
        };

        let body = if is_rewritable(&content_type) {
            let mut text = String::from_utf8_lossy(&bytes).into_owned();
            if let Some(origin) = &public_origin {
                text = self.rewrite_links(&text, origin);
            }
            if content_type.starts_with("text/html") {
                text = inject_client_script(&text);
            }
            Body::from(text)
        } else {
            Body::from(bytes)
        };

        (status, response_headers, body).into_response()
    }
}

/// Whether `after` extends the matched host, as in `//dev.localhost`.
fn continues_host(after: &str) -> bool {
    let mut chars = after.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '-' => true,
        Some('.') => chars.next().is_some_and(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// Copy upstream headers minus the ones describing upstream framing.
fn copy_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in [
        header::CONNECTION,
        header::CONTENT_LENGTH,
        header::TRANSFER_ENCODING,
        header::CONTENT_ENCODING,
    ] {
        headers.remove(name);
    }
    headers
}

fn is_rewritable(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || content_type.contains("javascript")
        || content_type.contains("json")
        || content_type.contains("xml")
}
