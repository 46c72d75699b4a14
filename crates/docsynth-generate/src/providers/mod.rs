//! HTTP-backed generative capabilities.

mod gemini;
mod http;
mod openai_compat;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use docsynth_core::redact_secret;

use crate::capability::GenerativeCapability;
use crate::errors::CapabilityError;

pub use gemini::GeminiCapability;
pub use openai_compat::OpenAiCompatibleCapability;

/// Supported backing services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Novita,
    Huggingface,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::Gemini, Self::Novita, Self::Huggingface];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Novita => "novita",
            Self::Huggingface => "huggingface",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Novita => "NOVITA_API_KEY",
            Self::Huggingface => "HUGGINGFACE_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::Novita => "deepseek/deepseek-v3-0324",
            Self::Huggingface => "meta-llama/Llama-3.2-11B-Vision-Instruct",
        }
    }

    /// Model used for image analysis when none is configured.
    pub fn default_vision_model(self) -> Option<&'static str> {
        match self {
            Self::Gemini => None,
            Self::Novita => Some("qwen/qwen3-vl-235b-a22b-instruct"),
            Self::Huggingface => None,
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Novita => "https://api.novita.ai/openai",
            Self::Huggingface => "https://router.huggingface.co/v1",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = CapabilityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "novita" => Ok(Self::Novita),
            "huggingface" | "hf" => Ok(Self::Huggingface),
            other => Err(CapabilityError::InvalidConfig(format!(
                "unknown provider '{other}' (expected gemini, novita or huggingface)"
            ))),
        }
    }
}

/// Provider settings for one run. The API key is never serialized.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub vision_model: Option<String>,
    pub endpoint: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            api_key: None,
            model: None,
            vision_model: None,
            endpoint: None,
            temperature: 0.7,
            max_tokens: 8192,
            timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_deref().map(redact_secret))
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.kind.default_model().to_string())
    }

    /// Vision model after defaults; Hugging Face reuses its text model.
    pub fn resolved_vision_model(&self) -> Option<String> {
        match self.kind {
            ProviderKind::Gemini => Some(self.resolved_model()),
            ProviderKind::Novita => self
                .vision_model
                .clone()
                .or_else(|| self.kind.default_vision_model().map(str::to_string)),
            ProviderKind::Huggingface => self
                .vision_model
                .clone()
                .or_else(|| Some(self.resolved_model())),
        }
    }

    pub fn resolved_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.kind.default_endpoint().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Build the capability selected by `config`.
pub fn build_capability(
    config: &ProviderConfig,
) -> Result<Box<dyn GenerativeCapability>, CapabilityError> {
    let api_key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            CapabilityError::InvalidConfig(format!(
                "{} is not set for provider '{}'",
                config.kind.api_key_env(),
                config.kind
            ))
        })?
        .to_string();

    tracing::info!(
        event = "provider_selected",
        provider = %config.kind,
        model = %config.resolved_model(),
        endpoint = %docsynth_core::redact_url(&config.resolved_endpoint()),
        api_key = %redact_secret(&api_key),
    );

    match config.kind {
        ProviderKind::Gemini => Ok(Box::new(GeminiCapability::new(config, api_key)?)),
        ProviderKind::Novita | ProviderKind::Huggingface => {
            Ok(Box::new(OpenAiCompatibleCapability::new(config, api_key)?))
        }
    }
}
