//! # vintry-vision
//!
//! Objective image-quality gate for label photos.
//!
//! Rejects unusable photographs before expensive extraction runs: resolution
//! and file-size floors, Laplacian-variance blur detection, brightness
//! bounds, and gradient-magnitude sharpness. `evaluate` is a pure function
//! of a pixel buffer and an explicit config; every check runs so the caller
//! gets the complete diagnostic set for retake guidance, not just the first
//! failure.
//!
//! ## Example
//!
//! ```ignore
//! use vintry_vision::{evaluate, ImageBuffer, QcConfig};
//!
//! let buffer = ImageBuffer::decode(&upload_bytes)?;
//! let report = evaluate(&buffer, &QcConfig::default());
//! if !report.pass {
//!     for reason in &report.reasons {
//!         println!("retake: {}", reason);
//!     }
//! }
//! ```

pub mod buffer;
pub mod gate;

pub use buffer::ImageBuffer;
pub use gate::{evaluate, QcConfig};

// Re-export the report types the gate produces
pub use vintry_core::models::{QualityMetrics, QualityReport};
