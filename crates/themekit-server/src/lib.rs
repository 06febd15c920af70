#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! Development server for themekit.
//!
//! Proxies the local PHP host (or serves the project directory), injects a
//! live-reload client into HTML pages and recompiles assets when sources
//! change. Browsers are told to hot-swap stylesheets or reload over a
//! websocket fed by a [`ServerHandle`].

pub mod client;
pub mod handle;
pub mod proxy;
pub mod server;
pub mod static_files;
pub mod watch;

pub use client::inject_client_script;
pub use handle::{ReloadEvent, ServerHandle};
pub use server::{app, AppState, DevServer, ServerError, ServerOptions};
pub use watch::{
    bindings, start_watcher, Action, ActionOutcome, ActionRunner, BuildRunner, Dispatcher,
    PostAction, WatchBinding,
};
