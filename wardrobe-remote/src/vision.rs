//! Vision-model classifier: sends the photo inline and asks for a JSON tag map.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use wardrobe_core::config::ClassifierConfig;
use wardrobe_core::Attributes;

use crate::client::Classifier;
use crate::error::RemoteError;
use crate::rest::blocking;

const TAGGING_PROMPT: &str = r#"Describe this single clothing item as one JSON object with these keys:
  "category": one of "Top", "Bottom", "Shoe", "Outerwear", "Accessory"
  "sub_category": string
  "color": string
  "formality": one of "Casual", "Smart Casual", "Business", "Formal"
  "pattern", "fabric", "fit", "style_notes": string (optional)
  "seasons", "occasions", "style_tags": array of strings (optional)
  "versatility_score": number from 1 to 10 (optional)
Return only the JSON object."#;

/// `generateContent` client for a hosted multimodal model.
#[derive(Debug, Clone)]
pub struct VisionClassifier {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
}

impl VisionClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            agent: ureq::Agent::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// `<endpoint>/models/<model>:generateContent`
    pub fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn classify_blocking(&self, bytes: &[u8], content_type: &str) -> Result<Attributes, RemoteError> {
        let body = request_body(bytes, content_type);
        let response: Value = self
            .agent
            .post(&self.generate_url())
            .query("key", &self.api_key)
            .send_json(body)?
            .into_json()
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        attributes_from_response(&response)
    }
}

#[async_trait]
impl Classifier for VisionClassifier {
    async fn classify(&self, bytes: &[u8], content_type: &str) -> Result<Attributes, RemoteError> {
        let client = self.clone();
        let bytes = bytes.to_vec();
        let content_type = content_type.to_string();
        blocking(move || client.classify_blocking(&bytes, &content_type)).await
    }
}

fn request_body(bytes: &[u8], content_type: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": TAGGING_PROMPT },
                { "inlineData": { "mimeType": content_type, "data": STANDARD.encode(bytes) } }
            ]
        }],
        "generationConfig": { "responseMimeType": "application/json" }
    })
}

/// Pull the tag map out of a `generateContent` response.
///
/// The model's text may be wrapped in a fenced code block; only a JSON object
/// is accepted.
pub fn attributes_from_response(response: &Value) -> Result<Attributes, RemoteError> {
    let text = response_text(response)?;
    let cleaned = strip_code_fence(text);
    let value: Value = serde_json::from_str(cleaned)?;
    if !value.is_object() {
        return Err(RemoteError::Rejected(
            "classifier output is not a JSON object".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

/// First text part of a `generateContent` response.
pub(crate) fn response_text(response: &Value) -> Result<&str, RemoteError> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::Rejected("model returned no text part".to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
