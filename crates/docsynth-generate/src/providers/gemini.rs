use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::capability::{BatchRequest, GenerativeCapability, ModelInfo, ReferenceImage};
use crate::errors::CapabilityError;
use crate::prompt::{analysis_prompt, entity_prompt};

use super::ProviderConfig;
use super::http::{build_client, send_json};

const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Google Gemini through the Generative Language REST API.
pub struct GeminiCapability {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl GeminiCapability {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            model: config.resolved_model(),
            endpoint: config.resolved_endpoint(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    fn generate_content(&self, parts: Vec<Part>) -> Result<String, CapabilityError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_ONLY_HIGH",
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response: GenerateContentResponse = send_json(request, self.timeout_secs)?;
        extract_text(response)
    }
}

impl GenerativeCapability for GeminiCapability {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "gemini".to_string(),
            model: self.model.clone(),
            vision_model: Some(self.model.clone()),
        }
    }

    fn supports_vision(&self) -> bool {
        true
    }

    fn generate_batch(&self, request: &BatchRequest) -> Result<String, CapabilityError> {
        self.generate_content(vec![Part::Text(entity_prompt(request))])
    }

    fn analyze_image(&self, image: &ReferenceImage) -> Result<String, CapabilityError> {
        self.generate_content(vec![
            Part::Text(analysis_prompt().to_string()),
            Part::InlineData(InlineData {
                mime_type: image.mime_type(),
                data: image.to_base64(),
            }),
        ])
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, CapabilityError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(CapabilityError::Blocked(reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| CapabilityError::MalformedResponse("no candidates returned".to_string()))?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "unknown".to_string());
        if matches!(reason.as_str(), "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST") {
            return Err(CapabilityError::Blocked(reason));
        }
        return Err(CapabilityError::MalformedResponse(format!(
            "empty response (finish reason: {reason})"
        )));
    }
    Ok(text)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    safety_settings: Vec<SafetySetting<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(InlineData),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
struct SafetySetting<'a> {
    category: &'a str,
    threshold: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).expect("response json")
    }

    #[test]
    fn joins_text_parts() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"[{\"a\":"},{"text":"\"b\"}]"}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(extract_text(response).expect("text"), r#"[{"a":"b"}]"#);
    }

    #[test]
    fn safety_stop_is_blocked() {
        let response = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#);
        assert!(matches!(
            extract_text(response),
            Err(CapabilityError::Blocked(reason)) if reason == "SAFETY"
        ));
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"OTHER"}}"#);
        assert!(matches!(
            extract_text(response),
            Err(CapabilityError::Blocked(_))
        ));
    }

    #[test]
    fn request_uses_camel_case_parts() {
        let part = Part::InlineData(InlineData {
            mime_type: "image/png",
            data: "AAAA".to_string(),
        });
        let json = serde_json::to_string(&part).expect("serialize part");
        assert_eq!(json, r#"{"inlineData":{"mimeType":"image/png","data":"AAAA"}}"#);
    }
}
