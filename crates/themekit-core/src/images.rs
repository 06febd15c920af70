//! Raster image recompression.
//!
//! JPEGs are re-encoded at a fixed quality. PNGs are quantised to a
//! palette and written as indexed PNGs; when the quantiser cannot reach
//! the quality floor the original bytes are kept. Both paths strip
//! metadata and preserve dimensions.

use crate::notice::{self, messages};
use crate::paths::ProjectLayout;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use themekit_util::fs::{atomic_write, has_extension, remove_matching, walk_files};

/// Extensions picked up from the image source tree.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg"];

/// Image optimisation error.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("quantise error: {0}")]
    Quantize(String),

    #[error("unsupported image {0}")]
    Unsupported(PathBuf),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// PNG quantisation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngQuality {
    /// Minimum acceptable quality, 0-100.
    pub min: u8,
    /// Target quality, 0-100.
    pub max: u8,
    /// 1 (slowest, best) to 10 (fastest).
    pub speed: u8,
}

impl Default for PngQuality {
    fn default() -> Self {
        Self {
            min: 80,
            max: 80,
            speed: 1,
        }
    }
}

/// Re-encode a JPEG as baseline JPEG at `quality`.
pub fn optimize_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Quantise a PNG to an indexed palette.
///
/// Returns the original bytes when the quality floor cannot be met.
pub fn optimize_png(bytes: &[u8], quality: &PngQuality) -> Result<Vec<u8>, ImageError> {
    let rgba = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| ImageError::Decode(e.to_string()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixels: Vec<imagequant::RGBA> = rgba
        .as_raw()
        .chunks_exact(4)
        .map(|p| imagequant::RGBA::new(p[0], p[1], p[2], p[3]))
        .collect();

    let quantize_err = |e: imagequant::Error| ImageError::Quantize(e.to_string());

    let mut attr = imagequant::new();
    attr.set_speed(i32::from(quality.speed)).map_err(quantize_err)?;
    attr.set_quality(quality.min, quality.max)
        .map_err(quantize_err)?;

    let mut img = attr
        .new_image(pixels, width as usize, height as usize, 0.0)
        .map_err(quantize_err)?;

    let mut result = match attr.quantize(&mut img) {
        Ok(result) => result,
        Err(imagequant::Error::QualityTooLow) => {
            tracing::debug!("quality floor not reached, keeping original");
            return Ok(bytes.to_vec());
        }
        Err(e) => return Err(quantize_err(e)),
    };
    result.set_dithering_level(1.0).map_err(quantize_err)?;
    let (palette, indexed) = result.remapped(&mut img).map_err(quantize_err)?;

    let rgb: Vec<u8> = palette.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
    let alpha: Vec<u8> = palette.iter().map(|c| c.a).collect();

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(rgb);
        if alpha.iter().any(|a| *a != 255) {
            encoder.set_trns(alpha);
        }
        encoder.set_compression(png::Compression::Best);

        let encode_err = |e: png::EncodingError| ImageError::Encode(e.to_string());
        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer.write_image_data(&indexed).map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;
    }
    Ok(buf)
}

/// Optimiser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    pub jpeg_quality: u8,
    pub png: PngQuality,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 80,
            png: PngQuality::default(),
        }
    }
}

/// One optimised file.
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub source: PathBuf,
    pub output: PathBuf,
    pub original_bytes: usize,
    pub new_bytes: usize,
}

impl OptimizedImage {
    /// Percentage saved relative to the original (negative if it grew).
    #[must_use]
    pub fn saved_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.new_bytes as f64 / self.original_bytes as f64) * 100.0
    }
}

/// Outcome of an optimiser run.
#[derive(Debug, Default)]
pub struct ImageReport {
    /// Stale artifacts removed before the run.
    pub removed: usize,
    pub optimized: Vec<OptimizedImage>,
    pub failed: Vec<(PathBuf, ImageError)>,
}

impl ImageReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Recompresses `src/images/**/*.{png,jpg}` into `images/`.
#[derive(Debug, Clone)]
pub struct ImageOptimizer {
    layout: ProjectLayout,
    options: ImageOptions,
}

impl ImageOptimizer {
    #[must_use]
    pub fn new(layout: ProjectLayout, options: ImageOptions) -> Self {
        Self { layout, options }
    }

    /// Optimise one source file and write it to its output path.
    pub fn optimize_file(&self, source: &Path) -> Result<OptimizedImage, ImageError> {
        let bytes = std::fs::read(source).map_err(|e| ImageError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;

        let optimized = if has_extension(source, &["jpg"]) {
            optimize_jpeg(&bytes, self.options.jpeg_quality)?
        } else if has_extension(source, &["png"]) {
            optimize_png(&bytes, &self.options.png)?
        } else {
            return Err(ImageError::Unsupported(source.to_path_buf()));
        };

        let rel = source
            .strip_prefix(self.layout.images_src_dir())
            .unwrap_or(source);
        let output = self.layout.images_out_dir().join(rel);
        atomic_write(&output, &optimized).map_err(|e| ImageError::Write {
            path: output.clone(),
            source: e,
        })?;

        Ok(OptimizedImage {
            source: source.to_path_buf(),
            output,
            original_bytes: bytes.len(),
            new_bytes: optimized.len(),
        })
    }

    /// Clean stale outputs, then optimise every source in parallel.
    pub fn run(&self) -> ImageReport {
        let mut report = ImageReport::default();
        let out_dir = self.layout.images_out_dir();

        match remove_matching(&out_dir, IMAGE_EXTENSIONS) {
            Ok(removed) => report.removed = removed,
            Err(e) => tracing::warn!(dir = %self.layout.relative(&out_dir), "cleanup failed: {e}"),
        }

        let src_dir = self.layout.images_src_dir();
        let files = match walk_files(&src_dir, IMAGE_EXTENSIONS) {
            Ok(files) => files,
            Err(e) => {
                report.failed.push((
                    src_dir.clone(),
                    ImageError::Io {
                        path: src_dir,
                        source: e,
                    },
                ));
                return report;
            }
        };

        let results: Vec<_> = files
            .par_iter()
            .map(|file| (file, self.optimize_file(file)))
            .collect();

        for (file, result) in results {
            match result {
                Ok(image) => {
                    tracing::info!(
                        path = %self.layout.relative(file),
                        original = image.original_bytes,
                        bytes = image.new_bytes,
                        "saved {:.1}%",
                        image.saved_percent()
                    );
                    report.optimized.push(image);
                }
                Err(e) => {
                    tracing::error!(path = %self.layout.relative(file), "{e}");
                    report.failed.push((file.clone(), e));
                }
            }
        }

        tracing::debug!(
            count = report.optimized.len(),
            failed = report.failed.len(),
            "image optimisation finished"
        );
        notice::completed(messages::IMAGES);
        report
    }
}
