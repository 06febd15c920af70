//! HTTP server: live-reload websocket, client runtime, proxy or static files.

use crate::client::{client_runtime, CLIENT_PATH, WS_PATH};
use crate::handle::{ReloadEvent, ServerHandle};
use crate::proxy::Proxy;
use crate::static_files;
use crate::watch::{start_watcher, ActionRunner, Dispatcher};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use themekit_core::config::{ServerSection, DEFAULT_PROXY};
use themekit_core::ProjectLayout;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tower_http::trace::TraceLayer;

/// Errors that stop the dev server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("file watcher failed: {0}")]
    Watch(String),

    #[error("cannot proxy {upstream}: {source}")]
    Proxy {
        upstream: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Dev server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Upstream to proxy. `None` serves the project directory.
    pub proxy: Option<String>,
    /// Open the browser once listening.
    pub open: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            proxy: Some(DEFAULT_PROXY.to_string()),
            open: false,
        }
    }
}

impl ServerOptions {
    /// Defaults overridden by the project file's `server` section.
    #[must_use]
    pub fn from_section(section: &ServerSection) -> Self {
        let defaults = Self::default();
        Self {
            host: section.host.clone().unwrap_or(defaults.host),
            port: section.port.unwrap_or(defaults.port),
            proxy: match &section.proxy {
                Some(p) if p.trim().is_empty() => None,
                Some(p) => Some(p.trim().to_string()),
                None => defaults.proxy,
            },
            open: section.open.unwrap_or(defaults.open),
        }
    }

    fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        let host = if self.host == "localhost" {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };
        let addr = format!("{host}:{}", self.port);
        addr.parse()
            .map_err(|_| ServerError::InvalidAddress(addr.clone()))
    }
}

/// Shared request state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub handle: ServerHandle,
    /// Directory served when there is no proxy.
    pub root: PathBuf,
    pub proxy: Option<Proxy>,
}

/// Build the router for `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route(WS_PATH, get(live_reload_ws))
        .route(CLIENT_PATH, get(client_js))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

async fn client_js() -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        client_runtime(),
    )
        .into_response()
}

async fn fallback(State(state): State<Arc<AppState>>, req: Request) -> Response {
    match &state.proxy {
        Some(proxy) => proxy.forward(req).await,
        None => static_files::serve(&state.root, req.uri().path()).await,
    }
}

async fn live_reload_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| live_reload_socket(socket, state))
}

async fn live_reload_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.handle.subscribe();

    if socket
        .send(Message::Text(ReloadEvent::Connected.to_json()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            event = rx.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "client fell behind, forcing reload");
                        ReloadEvent::Reload
                    }
                    Err(RecvError::Closed) => break,
                };
                if socket.send(Message::Text(event.to_json())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!("live-reload client disconnected");
}

/// Proxy or static server plus the watch loop.
pub struct DevServer {
    layout: ProjectLayout,
    options: ServerOptions,
    runner: Arc<dyn ActionRunner>,
}

impl DevServer {
    #[must_use]
    pub fn new(layout: ProjectLayout, options: ServerOptions, runner: Arc<dyn ActionRunner>) -> Self {
        Self {
            layout,
            options,
            runner,
        }
    }

    /// Bind, start watching and serve until the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let handle = ServerHandle::new();

        let proxy = match self.options.proxy.as_deref() {
            Some(upstream) if !upstream.is_empty() => {
                Some(Proxy::new(upstream).map_err(|source| ServerError::Proxy {
                    upstream: upstream.to_string(),
                    source,
                })?)
            }
            _ => None,
        };

        let addr = self.options.bind_addr()?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let port = listener.local_addr().map_or(self.options.port, |a| a.port());

        let (tx, rx) = mpsc::unbounded_channel();
        let _watcher = start_watcher(self.layout.root(), tx)?;
        let dispatcher = Dispatcher::new(self.layout.clone(), handle.clone(), self.runner);
        tokio::spawn(dispatcher.run(rx));

        let url = format!("http://{}:{port}", self.options.host);
        match &proxy {
            Some(proxy) => tracing::info!(%url, upstream = proxy.origin(), "dev server running"),
            None => tracing::info!(
                %url,
                root = %self.layout.root().display(),
                "dev server running, serving files"
            ),
        }

        if self.options.open {
            if let Err(e) = open_browser(&url) {
                tracing::warn!(%url, "failed to open browser: {e}");
            }
        }

        let state = AppState {
            handle,
            root: self.layout.root().to_path_buf(),
            proxy,
        };
        axum::serve(listener, app(state))
            .await
            .map_err(ServerError::Serve)
    }
}

fn open_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()?;
    }
    Ok(())
}
