use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::capability::{BatchRequest, GenerativeCapability, ModelInfo, ReferenceImage};
use crate::errors::CapabilityError;
use crate::prompt::{analysis_prompt, entity_prompt};

use super::ProviderConfig;
use super::http::{build_client, send_json};

const SYSTEM_PROMPT: &str =
    "You generate realistic synthetic business data and answer with JSON only.";

/// Chat-completions API shared by Novita and the Hugging Face router.
pub struct OpenAiCompatibleCapability {
    client: Client,
    provider: &'static str,
    api_key: String,
    model: String,
    vision_model: Option<String>,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl OpenAiCompatibleCapability {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            provider: config.kind.as_str(),
            api_key,
            model: config.resolved_model(),
            vision_model: config.resolved_vision_model(),
            endpoint: config.resolved_endpoint(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    fn complete(&self, model: &str, user_content: Value) -> Result<String, CapabilityError> {
        let body = ChatRequest {
            model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Value::String(SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
        };

        let request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatResponse = send_json(request, self.timeout_secs)?;
        extract_content(response)
    }
}

impl GenerativeCapability for OpenAiCompatibleCapability {
    fn name(&self) -> &str {
        self.provider
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: self.provider.to_string(),
            model: self.model.clone(),
            vision_model: self.vision_model.clone(),
        }
    }

    fn supports_vision(&self) -> bool {
        self.vision_model.is_some()
    }

    fn generate_batch(&self, request: &BatchRequest) -> Result<String, CapabilityError> {
        self.complete(&self.model, Value::String(entity_prompt(request)))
    }

    fn analyze_image(&self, image: &ReferenceImage) -> Result<String, CapabilityError> {
        let model = self.vision_model.as_deref().ok_or_else(|| {
            CapabilityError::Unsupported(format!("image analysis on '{}'", self.provider))
        })?;
        let data_url = format!("data:{};base64,{}", image.mime_type(), image.to_base64());
        self.complete(
            model,
            json!([
                {"type": "text", "text": analysis_prompt()},
                {"type": "image_url", "image_url": {"url": data_url}}
            ]),
        )
    }
}

fn extract_content(response: ChatResponse) -> Result<String, CapabilityError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CapabilityError::MalformedResponse("no choices returned".to_string()))?;

    match choice.message.content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ if choice.finish_reason.as_deref() == Some("content_filter") => Err(
            CapabilityError::Blocked("content_filter".to_string()),
        ),
        _ => Err(CapabilityError::MalformedResponse(
            "empty completion".to_string(),
        )),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
