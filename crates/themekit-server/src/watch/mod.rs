//! Watch bindings and the change dispatcher.
//!
//! A static table maps source globs to a compile action and a live-reload
//! follow-up. One dispatcher consumes change events in arrival order and
//! runs every matching binding to completion before looking at the next
//! event, so compiles never overlap.

use crate::handle::{ReloadEvent, ServerHandle};
use crate::server::ServerError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use themekit_core::{ProjectLayout, ScriptBundler, StyleCompiler};
use themekit_util::fs::{glob_matches, has_extension};
use tokio::sync::mpsc;

/// Build step run for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CompileStyles,
    CompileScripts,
    /// Nothing to build; only the follow-up runs.
    None,
}

/// What browsers are told after the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostAction {
    /// Hot-swap written stylesheets, reload for anything else written.
    LiveReload,
    /// Always reload the page.
    FullReload,
}

/// One row of the binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchBinding {
    /// Glob relative to the project root; `*` does not cross `/`.
    pub pattern: &'static str,
    pub action: Action,
    pub post: PostAction,
}

impl WatchBinding {
    /// Check a forward-slash path relative to the project root.
    #[must_use]
    pub fn matches(&self, rel_path: &str) -> bool {
        glob::Pattern::new(self.pattern).is_ok_and(|p| glob_matches(&p, rel_path))
    }
}

static BINDINGS: &[WatchBinding] = &[
    WatchBinding {
        pattern: "src/scss/*.scss",
        action: Action::CompileStyles,
        post: PostAction::LiveReload,
    },
    WatchBinding {
        pattern: "src/js/*.js",
        action: Action::CompileScripts,
        post: PostAction::LiveReload,
    },
    WatchBinding {
        pattern: "*.php",
        action: Action::None,
        post: PostAction::FullReload,
    },
];

/// The binding table.
#[must_use]
pub fn bindings() -> &'static [WatchBinding] {
    BINDINGS
}

/// Result of running an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Artifacts written by the action.
    pub written: Vec<PathBuf>,
    /// False when any part of the action failed.
    pub ok: bool,
}

impl ActionOutcome {
    #[must_use]
    pub fn success(written: Vec<PathBuf>) -> Self {
        Self { written, ok: true }
    }

    #[must_use]
    pub fn failed() -> Self {
        Self {
            written: Vec::new(),
            ok: false,
        }
    }
}

/// Runs build actions. Called on the blocking pool.
pub trait ActionRunner: Send + Sync {
    fn run(&self, action: Action) -> ActionOutcome;
}

/// Runs actions through the core pipeline.
#[derive(Debug, Clone)]
pub struct BuildRunner {
    styles: StyleCompiler,
    scripts: ScriptBundler,
}

impl BuildRunner {
    #[must_use]
    pub fn new(styles: StyleCompiler, scripts: ScriptBundler) -> Self {
        Self { styles, scripts }
    }
}

impl ActionRunner for BuildRunner {
    fn run(&self, action: Action) -> ActionOutcome {
        match action {
            Action::CompileStyles => {
                let report = self.styles.compile_all();
                ActionOutcome {
                    written: report.written_css(),
                    ok: report.is_success(),
                }
            }
            Action::CompileScripts => match self.scripts.run() {
                Ok(report) => ActionOutcome::success(vec![report.output]),
                Err(e) => {
                    tracing::error!("{e}");
                    ActionOutcome::failed()
                }
            },
            Action::None => ActionOutcome::success(Vec::new()),
        }
    }
}

/// Applies bindings to change events.
#[derive(Clone)]
pub struct Dispatcher {
    layout: ProjectLayout,
    handle: ServerHandle,
    runner: Arc<dyn ActionRunner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("layout", &self.layout)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(layout: ProjectLayout, handle: ServerHandle, runner: Arc<dyn ActionRunner>) -> Self {
        Self {
            layout,
            handle,
            runner,
        }
    }

    /// Bindings matched by any path of `event`, in table order.
    #[must_use]
    pub fn matching(&self, event: &Event) -> Vec<WatchBinding> {
        if matches!(event.kind, EventKind::Access(_)) {
            return Vec::new();
        }

        let rel_paths: Vec<String> = event
            .paths
            .iter()
            .map(|p| self.layout.relative(p))
            .collect();

        bindings()
            .iter()
            .filter(|b| rel_paths.iter().any(|rel| b.matches(rel)))
            .copied()
            .collect()
    }

    /// Handle one change event. Returns the live-reload events sent.
    pub async fn handle(&self, event: &Event) -> Vec<ReloadEvent> {
        let mut sent = Vec::new();

        for binding in self.matching(event) {
            tracing::info!(
                pattern = binding.pattern,
                paths = ?event.paths.iter().map(|p| self.layout.relative(p)).collect::<Vec<_>>(),
                "change detected"
            );

            let outcome = if binding.action == Action::None {
                ActionOutcome::success(Vec::new())
            } else {
                let runner = Arc::clone(&self.runner);
                let action = binding.action;
                match tokio::task::spawn_blocking(move || runner.run(action)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(?action, "action panicked: {e}");
                        ActionOutcome::failed()
                    }
                }
            };

            sent.extend(self.follow_up(binding.post, &outcome));
        }

        sent
    }

    fn follow_up(&self, post: PostAction, outcome: &ActionOutcome) -> Vec<ReloadEvent> {
        match post {
            PostAction::FullReload => {
                self.handle.reload();
                vec![ReloadEvent::Reload]
            }
            PostAction::LiveReload => {
                let (css, other): (Vec<&PathBuf>, Vec<&PathBuf>) = outcome
                    .written
                    .iter()
                    .partition(|p| has_extension(p, &["css"]));

                let mut sent = Vec::new();
                if !other.is_empty() {
                    self.handle.reload();
                    sent.push(ReloadEvent::Reload);
                } else if !css.is_empty() {
                    let paths: Vec<String> =
                        css.iter().map(|p| self.layout.url_path(p)).collect();
                    self.handle.refresh_styles(paths.clone());
                    sent.push(ReloadEvent::Css { paths });
                }
                sent
            }
        }
    }

    /// Consume events until the channel closes.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = rx.recv().await {
            self.handle(&event).await;
        }
        tracing::debug!("watch channel closed");
    }
}

/// Start a recursive watcher on `root` feeding `tx`.
///
/// The returned watcher must be kept alive for events to flow.
pub fn start_watcher(
    root: &Path,
    tx: mpsc::UnboundedSender<Event>,
) -> Result<RecommendedWatcher, ServerError> {
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if tx.send(event).is_err() {
                    tracing::debug!("dispatcher gone, dropping watch event");
                }
            }
            Err(e) => tracing::error!(error = %e, "watch error"),
        },
        notify::Config::default(),
    )
    .map_err(|e| ServerError::Watch(e.to_string()))?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| ServerError::Watch(e.to_string()))?;
    tracing::info!(root = %root.display(), "watching for changes");

    Ok(watcher)
}
