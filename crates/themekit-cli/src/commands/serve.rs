use super::Project;
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;
use themekit_core::{ScriptBundler, StyleCompiler};
use themekit_server::{BuildRunner, DevServer, ServerOptions};

/// Flags shared by `serve` and `dev`.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Upstream host to proxy (default: dev.local)
    #[arg(long, value_name = "HOST")]
    pub proxy: Option<String>,

    /// Serve the project directory instead of proxying
    #[arg(long, conflicts_with = "proxy")]
    pub no_proxy: bool,

    /// Open the browser once listening
    #[arg(long)]
    pub open: bool,
}

impl ServeArgs {
    /// Server options: flags over the project file over the defaults.
    #[must_use]
    pub fn options(&self, project: &Project) -> ServerOptions {
        let mut options = ServerOptions::from_section(&project.config.server);
        if let Some(port) = self.port {
            options.port = port;
        }
        if let Some(host) = &self.host {
            options.host.clone_from(host);
        }
        if self.no_proxy {
            options.proxy = None;
        } else if let Some(proxy) = &self.proxy {
            options.proxy = Some(proxy.clone()).filter(|p| !p.is_empty());
        }
        options.open |= self.open;
        options
    }
}

/// Serve until the server fails. Never returns `Ok` in practice.
pub fn run(project: &Project, args: &ServeArgs) -> Result<bool> {
    let styles = StyleCompiler::new(project.layout.clone(), &project.config.style_options())
        .into_diagnostic()?;
    let scripts = ScriptBundler::new(
        project.layout.clone(),
        project.config.script_options().into_diagnostic()?,
    );
    let runner = Arc::new(BuildRunner::new(styles, scripts));

    let server = DevServer::new(project.layout.clone(), args.options(project), runner);
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime.block_on(server.run()).into_diagnostic()?;
    Ok(true)
}
