//! In-process tests for the dev server router.

use axum::extract::Request;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{Stream, StreamExt};
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::tempdir;
use themekit_server::proxy::Proxy;
use themekit_server::{app, AppState, ServerHandle};
use tokio_tungstenite::tungstenite::{self, Message};

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn state(root: &std::path::Path, proxy: Option<Proxy>) -> AppState {
    AppState {
        handle: ServerHandle::new(),
        root: root.to_path_buf(),
        proxy,
    }
}

#[tokio::test]
async fn test_client_runtime_route() {
    let dir = tempdir().unwrap();
    let addr = spawn(app(state(dir.path(), None))).await;

    let res = reqwest::get(format!("http://{addr}/__themekit/client.js"))
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/javascript"));
    let body = res.text().await.unwrap();
    assert!(body.contains("/__themekit/ws"));
}

#[tokio::test]
async fn test_static_html_gets_client() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("index.html"),
        "<html><body><h1>Theme</h1></body></html>",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("css/styles.css"), "a{color:red}").unwrap();
    let addr = spawn(app(state(dir.path(), None))).await;

    let page = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(
        page,
        r#"<html><body><h1>Theme</h1><script src="/__themekit/client.js"></script></body></html>"#
    );

    let css = reqwest::get(format!("http://{addr}/css/styles.css"))
        .await
        .unwrap();
    assert_eq!(css.status(), 200);
    assert_eq!(css.text().await.unwrap(), "a{color:red}");

    let missing = reqwest::get(format!("http://{addr}/js/scripts.js"))
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

async fn next_json<S>(socket: &mut S) -> serde_json::Value
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("no frame from the server")
        .unwrap()
        .unwrap();
    match frame {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn test_websocket_receives_reload_events() {
    let dir = tempdir().unwrap();
    let app_state = state(dir.path(), None);
    let handle = app_state.handle.clone();
    let addr = spawn(app(app_state)).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/__themekit/ws"))
        .await
        .unwrap();

    assert_eq!(next_json(&mut socket).await, serde_json::json!({"type": "connected"}));
    assert_eq!(handle.client_count(), 1);

    handle.reload();
    assert_eq!(next_json(&mut socket).await, serde_json::json!({"type": "reload"}));

    handle.refresh_styles(vec!["/css/styles.css".to_string()]);
    assert_eq!(
        next_json(&mut socket).await,
        serde_json::json!({"type": "css", "paths": ["/css/styles.css"]})
    );

    socket.close(None).await.unwrap();
}

async fn upstream_page(req: Request) -> axum::response::Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        format!(
            r#"<html><body><a href="http://{host}/about">About</a><p>{}</p></body></html>"#,
            req.uri().path()
        ),
    )
        .into_response()
}

async fn upstream_redirect(req: Request) -> axum::response::Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (
        axum::http::StatusCode::FOUND,
        [(header::LOCATION, format!("http://{host}/login"))],
    )
        .into_response()
}

#[tokio::test]
async fn test_proxy_rewrites_links_and_injects_client() {
    let upstream = spawn(
        Router::new()
            .route("/old", get(upstream_redirect))
            .fallback(upstream_page),
    )
    .await;
    let dir = tempdir().unwrap();
    let proxy = Proxy::new(&upstream.to_string()).unwrap();
    let addr = spawn(app(state(dir.path(), Some(proxy)))).await;

    let page = reqwest::get(format!("http://{addr}/shop"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains(&format!(r#"href="http://{addr}/about""#)));
    assert!(page.contains("<p>/shop</p>"));
    assert!(!page.contains(&format!("{upstream}/")));
    assert!(page.contains(r#"<script src="/__themekit/client.js"></script></body>"#));

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let redirect = client
        .get(format!("http://{addr}/old"))
        .send()
        .await
        .unwrap();
    assert_eq!(redirect.status(), 302);
    assert_eq!(
        redirect.headers()[header::LOCATION].to_str().unwrap(),
        format!("http://{addr}/login")
    );
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    // Bind and drop to get a port nothing listens on
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let dir = tempdir().unwrap();
    let proxy = Proxy::new(&closed.to_string()).unwrap();
    let addr = spawn(app(state(dir.path(), Some(proxy)))).await;

    let res = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(res.status(), 502);
}
