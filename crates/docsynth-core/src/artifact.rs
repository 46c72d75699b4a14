use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{AnalysisResult, EntityBatch, EntityRecord};

/// Current contract version for entity artifacts.
pub const ARTIFACT_VERSION: &str = "0.1";

/// Entity artifact: the sole handoff contract to the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityArtifact {
    #[serde(rename = "_document_type")]
    pub document_type: String,
    #[serde(rename = "_language")]
    pub language: String,
    pub entities: Vec<EntityRecord>,
    /// Run metadata; renderers may ignore it.
    #[serde(
        rename = "_provenance",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provenance: Option<Provenance>,
}

impl EntityArtifact {
    pub fn new(
        document_type: impl Into<String>,
        language: impl Into<String>,
        batch: EntityBatch,
    ) -> Self {
        Self {
            document_type: document_type.into(),
            language: language.into(),
            entities: batch.into_records(),
            provenance: None,
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn batch(&self) -> EntityBatch {
        EntityBatch::from_records(self.entities.clone())
    }
}

/// How a persisted artifact was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Provenance {
    pub artifact_version: String,
    pub run_id: String,
    pub generated_at: String,
    pub provider: String,
    pub model: Option<String>,
    /// Seed used for background selection.
    pub seed: u64,
    pub background_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
}
