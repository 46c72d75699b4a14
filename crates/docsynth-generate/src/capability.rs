use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use serde::Serialize;

use docsynth_core::LocaleRules;

use crate::errors::{CapabilityError, GenerationError};

/// External generative service used for entity generation and image analysis.
///
/// Implementations return raw response text; parsing and repair stay with the
/// generator and analyzer so every provider shares one policy.
pub trait GenerativeCapability: Send + Sync {
    fn name(&self) -> &str;

    fn model_info(&self) -> ModelInfo;

    fn supports_vision(&self) -> bool;

    fn generate_batch(&self, request: &BatchRequest) -> Result<String, CapabilityError>;

    fn analyze_image(&self, image: &ReferenceImage) -> Result<String, CapabilityError>;
}

/// Provider and model identifiers, recorded in artifact provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
    pub vision_model: Option<String>,
}

/// One bounded batch call's worth of work.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub document_type: String,
    pub entity_fields: Vec<String>,
    pub rules: LocaleRules,
    pub count: usize,
    /// Example values used for style guidance only.
    pub seed_examples: Option<BTreeMap<String, String>>,
}

/// Raster image handed to the analysis capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    bytes: Vec<u8>,
    source: Option<PathBuf>,
}

impl ReferenceImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            source: None,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            bytes: std::fs::read(path)?,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.bytes).ok()
    }

    pub fn mime_type(&self) -> &'static str {
        match self.format() {
            Some(ImageFormat::Png) => "image/png",
            Some(ImageFormat::Jpeg) => "image/jpeg",
            Some(ImageFormat::Gif) => "image/gif",
            Some(ImageFormat::WebP) => "image/webp",
            Some(ImageFormat::Tiff) => "image/tiff",
            Some(ImageFormat::Bmp) => "image/bmp",
            _ => "application/octet-stream",
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Check the bytes are a supported raster format that actually decodes.
    pub fn validate(&self) -> Result<ImageFormat, GenerationError> {
        let label = self
            .source
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string());

        let format = image::guess_format(&self.bytes).map_err(|err| {
            GenerationError::UnsupportedImageFormat(format!("{label}: {err}"))
        })?;
        if !matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Gif
                | ImageFormat::WebP
                | ImageFormat::Tiff
                | ImageFormat::Bmp
        ) {
            return Err(GenerationError::UnsupportedImageFormat(format!(
                "{label}: {format:?} is not a supported raster format"
            )));
        }
        image::load_from_memory_with_format(&self.bytes, format).map_err(|err| {
            GenerationError::UnsupportedImageFormat(format!("{label}: {err}"))
        })?;
        Ok(format)
    }
}

/// Deterministic capability that replays queued responses and records calls.
///
/// When the batch script runs dry it answers with an empty array; when the
/// analysis script runs dry it reports the service as unavailable.
#[derive(Debug, Default)]
pub struct ScriptedCapability {
    batch_script: Mutex<VecDeque<Result<String, CapabilityError>>>,
    analysis_script: Mutex<VecDeque<Result<String, CapabilityError>>>,
    batch_calls: Mutex<Vec<BatchRequest>>,
    analysis_calls: Mutex<u32>,
    vision: bool,
}

impl ScriptedCapability {
    pub fn new() -> Self {
        Self {
            vision: true,
            ..Self::default()
        }
    }

    pub fn without_vision(mut self) -> Self {
        self.vision = false;
        self
    }

    pub fn with_batch_response(self, payload: impl Into<String>) -> Self {
        push(&self.batch_script, Ok(payload.into()));
        self
    }

    pub fn with_batch_error(self, error: CapabilityError) -> Self {
        push(&self.batch_script, Err(error));
        self
    }

    pub fn with_analysis_response(self, payload: impl Into<String>) -> Self {
        push(&self.analysis_script, Ok(payload.into()));
        self
    }

    pub fn with_analysis_error(self, error: CapabilityError) -> Self {
        push(&self.analysis_script, Err(error));
        self
    }

    /// Every batch request received, in call order.
    pub fn batch_calls(&self) -> Vec<BatchRequest> {
        self.batch_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn analysis_calls(&self) -> u32 {
        *self
            .analysis_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn push(
    script: &Mutex<VecDeque<Result<String, CapabilityError>>>,
    entry: Result<String, CapabilityError>,
) {
    script
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push_back(entry);
}

fn pop(
    script: &Mutex<VecDeque<Result<String, CapabilityError>>>,
) -> Option<Result<String, CapabilityError>> {
    script
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

impl GenerativeCapability for ScriptedCapability {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "scripted".to_string(),
            model: "scripted".to_string(),
            vision_model: self.vision.then(|| "scripted".to_string()),
        }
    }

    fn supports_vision(&self) -> bool {
        self.vision
    }

    fn generate_batch(&self, request: &BatchRequest) -> Result<String, CapabilityError> {
        self.batch_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        pop(&self.batch_script).unwrap_or_else(|| Ok("[]".to_string()))
    }

    fn analyze_image(&self, _image: &ReferenceImage) -> Result<String, CapabilityError> {
        *self
            .analysis_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        pop(&self.analysis_script).unwrap_or_else(|| {
            Err(CapabilityError::Unavailable(
                "no scripted analysis response left".to_string(),
            ))
        })
    }
}
