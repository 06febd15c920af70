use super::Project;
use miette::{IntoDiagnostic, Result};
use themekit_core::StyleCompiler;

/// Compile both stylesheet entries. Returns false if either failed.
pub fn run(project: &Project) -> Result<bool> {
    let compiler = StyleCompiler::new(project.layout.clone(), &project.config.style_options())
        .into_diagnostic()?;
    Ok(compiler.compile_all().is_success())
}
