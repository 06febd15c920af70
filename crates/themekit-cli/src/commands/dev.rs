//! Default command: initial build, then serve and watch.
//!
//! Failed initial compiles are logged and do not stop the server; the next
//! source change retries them.

use super::serve::{self, ServeArgs};
use super::{scripts, styles, Project};
use miette::Result;

pub fn run(project: &Project, args: &ServeArgs) -> Result<bool> {
    if !styles::run(project)? {
        tracing::warn!("initial style build failed, serving anyway");
    }
    if !scripts::run(project)? {
        tracing::warn!("initial script build failed, serving anyway");
    }
    serve::run(project, args)
}
