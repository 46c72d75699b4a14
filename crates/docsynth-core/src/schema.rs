use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::artifact::EntityArtifact;
use crate::model::AnalysisResult;

/// Emit the JSON Schema for the entity artifact.
pub fn entity_artifact_json_schema() -> RootSchema {
    schema_for!(EntityArtifact)
}

/// Emit the JSON Schema for the analysis artifact.
pub fn analysis_artifact_json_schema() -> RootSchema {
    schema_for!(AnalysisResult)
}
