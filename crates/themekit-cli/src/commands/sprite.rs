use super::Project;
use themekit_core::SpriteBuilder;

/// Build, inject and copy. A missing template marker only warns.
pub fn run(project: &Project) -> bool {
    match SpriteBuilder::new(project.layout.clone()).run() {
        Ok(report) => {
            tracing::debug!(
                icons = report.icons,
                copied = report.copied.len(),
                "sprite done"
            );
            true
        }
        Err(e) => {
            tracing::error!("{e}");
            false
        }
    }
}
