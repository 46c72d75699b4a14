//! Run orchestration for docsynth.
//!
//! Resolves a document spec, drives generation and background assignment,
//! and persists the entity artifact atomically. Also hosts configuration
//! loading and artifact maintenance helpers.

pub mod apply;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod persist;

pub use apply::{ApplyReport, apply_values};
pub use config::{BackgroundConfig, OutputConfig, PipelineConfig};
pub use coordinator::{
    PipelineCoordinator, PipelineState, RunSummary, SpecSource, analyze_reference,
};
pub use error::{PipelineError, PipelineResult};
pub use persist::{
    load_analysis_artifact, load_entity_artifact, save_analysis_artifact, save_entity_artifact,
    write_bytes_atomic, write_json_atomic,
};
