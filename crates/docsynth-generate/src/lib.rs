//! Entity generation for docsynth.
//!
//! Drives a generative capability in bounded batches to produce validated,
//! de-duplicated entity records, analyzes reference images, and assigns
//! background textures to the resulting batch.

pub mod analyzer;
pub mod background;
pub mod cancel;
pub mod capability;
pub mod errors;
pub mod generator;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod providers;
pub mod retry;

pub use analyzer::ReferenceAnalyzer;
pub use background::{BackgroundMode, BackgroundPool, assign};
pub use cancel::CancellationToken;
pub use capability::{
    BatchRequest, GenerativeCapability, ModelInfo, ReferenceImage, ScriptedCapability,
};
pub use errors::{CapabilityError, ErrorKind, GenerationError};
pub use generator::BatchEntityGenerator;
pub use model::{GenerateOptions, GenerationReport, RetryOptions};
pub use providers::{ProviderConfig, ProviderKind, build_capability};
pub use retry::{RetryFailure, RetryPolicy, Retryable};
