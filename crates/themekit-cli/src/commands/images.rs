use super::Project;
use themekit_core::ImageOptimizer;

pub fn run(project: &Project) -> bool {
    let report =
        ImageOptimizer::new(project.layout.clone(), project.config.image_options()).run();

    let original: usize = report.optimized.iter().map(|i| i.original_bytes).sum();
    let optimized: usize = report.optimized.iter().map(|i| i.new_bytes).sum();
    tracing::info!(
        count = report.optimized.len(),
        failed = report.failed.len(),
        removed = report.removed,
        original,
        optimized,
        "images done"
    );

    report.is_success()
}
