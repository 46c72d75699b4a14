use tracing::{info, warn};

use docsynth_core::AnalysisResult;

use crate::capability::{GenerativeCapability, ReferenceImage};
use crate::errors::{CapabilityError, GenerationError};
use crate::parser::parse_analysis_payload;

/// Turns a reference image into an [`AnalysisResult`] with one capability call.
pub struct ReferenceAnalyzer<'a> {
    capability: &'a dyn GenerativeCapability,
}

impl<'a> ReferenceAnalyzer<'a> {
    pub fn new(capability: &'a dyn GenerativeCapability) -> Self {
        Self { capability }
    }

    /// Validate the image, invoke the capability once and parse its answer.
    ///
    /// Confidence is reported exactly as the capability stated it.
    pub fn analyze(&self, image: &ReferenceImage) -> Result<AnalysisResult, GenerationError> {
        let format = image.validate()?;

        if !self.capability.supports_vision() {
            return Err(GenerationError::CapabilityRejected(format!(
                "provider '{}' has no vision model configured",
                self.capability.name()
            )));
        }

        info!(
            event = "analysis_started",
            provider = self.capability.name(),
            format = ?format,
            bytes = image.bytes().len(),
        );

        let payload = self.capability.analyze_image(image).map_err(|err| {
            warn!(event = "analysis_call_failed", error = %err);
            match err {
                CapabilityError::Timeout { .. } => {
                    GenerationError::ExternalServiceTimeout { attempts: 1 }
                }
                CapabilityError::Unavailable(message) => {
                    GenerationError::AnalysisServiceUnavailable(message)
                }
                CapabilityError::MalformedResponse(message) => {
                    GenerationError::AnalysisParseError(message)
                }
                other => GenerationError::CapabilityRejected(other.to_string()),
            }
        })?;

        let analysis = parse_analysis_payload(&payload).map_err(|message| {
            warn!(event = "analysis_unparseable", error = %message);
            GenerationError::AnalysisParseError(message)
        })?;

        info!(
            event = "analysis_finished",
            document_type = %analysis.document_type,
            detected_language = %analysis.detected_locale,
            confidence = %analysis.confidence,
            fields = analysis.extracted_entities.len(),
        );
        Ok(analysis)
    }
}
