use super::Project;
use miette::{IntoDiagnostic, Result};
use themekit_core::ScriptBundler;

pub fn run(project: &Project) -> Result<bool> {
    let options = project.config.script_options().into_diagnostic()?;
    match ScriptBundler::new(project.layout.clone(), options).run() {
        Ok(_) => Ok(true),
        Err(e) => {
            tracing::error!("{e}");
            Ok(false)
        }
    }
}
