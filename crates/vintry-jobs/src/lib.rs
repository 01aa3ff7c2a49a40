//! # vintry-jobs
//!
//! The resolution pipeline for the vintry resolver.
//!
//! This crate provides:
//! - An explicit resolution state machine with a checked transition table
//! - The stage-sequenced pipeline: quality check → extraction (external) →
//!   matching → confidence routing → terminal decision
//! - A bounded-concurrency worker with broadcast progress events and
//!   graceful shutdown
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vintry_jobs::{ResolutionPipeline, ResolutionWorker, WorkerConfig};
//! use vintry_jobs::{ResolutionInput, ResolutionRequest, WorkerEvent};
//!
//! let pipeline = Arc::new(ResolutionPipeline::new(extractor, catalog, writer));
//! let worker = ResolutionWorker::new(pipeline, WorkerConfig::from_env());
//! let handle = worker.start();
//!
//! handle.submit(ResolutionRequest::new(ResolutionInput::LabelScan {
//!     bytes: upload,
//!     mime_type: "image/jpeg".into(),
//! })).await?;
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//!
//! handle.shutdown().await?;
//! ```

pub mod pipeline;
pub mod state;
pub mod worker;

// Re-export core types
pub use vintry_core::*;

pub use pipeline::{route, ResolutionPipeline, RouteDecision, RoutingPolicy};
pub use state::{JobSource, ResolutionJob, ResolutionOutcome, ResolutionStage};
pub use worker::{
    ResolutionInput, ResolutionRequest, ResolutionWorker, WorkerConfig, WorkerEvent, WorkerHandle,
};
