//! The quality gate: pass/fail verdict with itemized reasons and metrics.

use tracing::debug;

use vintry_core::defaults;
use vintry_core::models::{QualityMetrics, QualityReport};

use crate::buffer::ImageBuffer;

/// Quality gate thresholds, explicit and overridable per call.
///
/// Defaults live in `vintry_core::defaults` and favor leniency: false
/// negatives are cheaper than blocking legitimate photos.
#[derive(Debug, Clone)]
pub struct QcConfig {
    /// Minimum width and height in pixels.
    pub min_dimension: u32,
    /// Minimum encoded upload size in bytes.
    pub min_file_size: u64,
    /// Minimum Laplacian-response variance (below = blurred).
    pub min_laplacian_var: f64,
    /// Minimum acceptable greyscale mean.
    pub min_brightness: f64,
    /// Maximum acceptable greyscale mean.
    pub max_brightness: f64,
    /// Minimum mean gradient magnitude.
    pub min_sharpness: f64,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            min_dimension: defaults::QC_MIN_DIMENSION,
            min_file_size: defaults::QC_MIN_FILE_SIZE_BYTES,
            min_laplacian_var: defaults::QC_MIN_LAPLACIAN_VARIANCE,
            min_brightness: defaults::QC_MIN_BRIGHTNESS,
            max_brightness: defaults::QC_MAX_BRIGHTNESS,
            min_sharpness: defaults::QC_MIN_SHARPNESS,
        }
    }
}

impl QcConfig {
    /// Set the minimum dimension.
    pub fn with_min_dimension(mut self, px: u32) -> Self {
        self.min_dimension = px;
        self
    }

    /// Set the minimum encoded file size.
    pub fn with_min_file_size(mut self, bytes: u64) -> Self {
        self.min_file_size = bytes;
        self
    }

    /// Set the blur threshold.
    pub fn with_min_laplacian_var(mut self, variance: f64) -> Self {
        self.min_laplacian_var = variance;
        self
    }

    /// Set the acceptable brightness band.
    pub fn with_brightness_band(mut self, min: f64, max: f64) -> Self {
        self.min_brightness = min;
        self.max_brightness = max;
        self
    }

    /// Set the sharpness threshold.
    pub fn with_min_sharpness(mut self, sharpness: f64) -> Self {
        self.min_sharpness = sharpness;
        self
    }
}

/// Evaluate a decoded image against the gate.
///
/// Pure and deterministic: the same buffer and config always produce an
/// identical report. Every check runs unconditionally so the caller gets
/// the complete diagnostic set for retake guidance.
pub fn evaluate(buffer: &ImageBuffer, config: &QcConfig) -> QualityReport {
    let (brightness_mean, brightness_std) = brightness_stats(buffer);
    let blur_variance = laplacian_variance(buffer);
    let sharpness = gradient_sharpness(buffer);

    let metrics = QualityMetrics {
        blur_variance,
        brightness_mean,
        brightness_std,
        sharpness,
        width: buffer.width(),
        height: buffer.height(),
        byte_size: buffer.byte_size(),
    };

    let mut reasons = Vec::new();

    if buffer.width() < config.min_dimension || buffer.height() < config.min_dimension {
        reasons.push(format!(
            "Resolution {}x{} is below the minimum of {}px per side",
            buffer.width(),
            buffer.height(),
            config.min_dimension
        ));
    }

    if buffer.byte_size() < config.min_file_size {
        reasons.push(format!(
            "File size {} bytes is below the minimum of {} bytes",
            buffer.byte_size(),
            config.min_file_size
        ));
    }

    if blur_variance < config.min_laplacian_var {
        reasons.push(format!(
            "Image appears blurred (Laplacian variance {:.1} < {:.1})",
            blur_variance, config.min_laplacian_var
        ));
    }

    if brightness_mean < config.min_brightness {
        reasons.push(format!(
            "Image is too dark (mean brightness {:.1} < {:.1})",
            brightness_mean, config.min_brightness
        ));
    } else if brightness_mean > config.max_brightness {
        reasons.push(format!(
            "Image is overexposed (mean brightness {:.1} > {:.1})",
            brightness_mean, config.max_brightness
        ));
    }

    if sharpness < config.min_sharpness {
        reasons.push(format!(
            "Image lacks sharp detail (mean gradient {:.1} < {:.1})",
            sharpness, config.min_sharpness
        ));
    }

    debug!(
        subsystem = "vision",
        component = "quality_gate",
        width = buffer.width(),
        height = buffer.height(),
        blur_variance,
        brightness_mean,
        sharpness,
        reason_count = reasons.len(),
        "Quality gate evaluated"
    );

    QualityReport::from_checks(reasons, metrics)
}

/// Mean and standard deviation of greyscale intensity.
fn brightness_stats(buffer: &ImageBuffer) -> (f64, f64) {
    let luma = buffer.luma();
    if luma.is_empty() {
        return (0.0, 0.0);
    }
    let n = luma.len() as f64;
    let sum: f64 = luma.iter().map(|&p| p as f64).sum();
    let mean = sum / n;
    let sq_sum: f64 = luma.iter().map(|&p| (p as f64 - mean).powi(2)).sum();
    (mean, (sq_sum / n).sqrt())
}

/// Variance of the 4-neighbour Laplacian response over interior pixels.
///
/// Response per pixel is `4c - n - s - e - w`; sharp edges produce large
/// responses, so higher variance means less blur.
fn laplacian_variance(buffer: &ImageBuffer) -> f64 {
    let (w, h) = (buffer.width(), buffer.height());
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sq_sum = 0.0f64;
    let n = ((w - 2) as u64 * (h - 2) as u64) as f64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let c = buffer.at(x, y) as f64;
            let response = 4.0 * c
                - buffer.at(x, y - 1) as f64
                - buffer.at(x, y + 1) as f64
                - buffer.at(x - 1, y) as f64
                - buffer.at(x + 1, y) as f64;
            sum += response;
            sq_sum += response * response;
        }
    }

    let mean = sum / n;
    sq_sum / n - mean * mean
}

/// Mean gradient magnitude `sqrt(gx² + gy²)` over interior pixels, from
/// forward neighbour differences.
fn gradient_sharpness(buffer: &ImageBuffer) -> f64 {
    let (w, h) = (buffer.width(), buffer.height());
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let n = ((w - 2) as u64 * (h - 2) as u64) as f64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = buffer.at(x + 1, y) as f64 - buffer.at(x, y) as f64;
            let gy = buffer.at(x, y + 1) as f64 - buffer.at(x, y) as f64;
            sum += (gx * gx + gy * gy).sqrt();
        }
    }

    sum / n
}
