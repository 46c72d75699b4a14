//! Core contracts and helpers for docsynth.
//!
//! This crate defines the document spec and entity record types, the JSON
//! artifact contracts handed to renderers, and the locale rule registry
//! shared by the generator and the CLI.

pub mod artifact;
pub mod error;
pub mod locale;
pub mod model;
pub mod redaction;
pub mod schema;
pub mod validation;

pub use artifact::{ARTIFACT_VERSION, EntityArtifact, Provenance};
pub use error::{Error, Result};
pub use locale::{
    DEFAULT_LOCALE, DateStyle, LocaleFallback, LocaleResolution, LocaleRules, NameStyle,
};
pub use model::{
    AnalysisResult, Confidence, DocumentSpec, EntityBatch, EntityRecord, SpecOverrides,
    parse_field_list,
};
pub use redaction::{redact_secret, redact_url};
pub use schema::{analysis_artifact_json_schema, entity_artifact_json_schema};
pub use validation::{ValidationIssue, ValidationReport, validate_artifact_json, validate_batch};
