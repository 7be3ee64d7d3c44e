//! Outfit stylist: sends the intent and the tagged clean inventory to the
//! same `generateContent` model the classifier uses and reads back a pick.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use wardrobe_core::config::ClassifierConfig;
use wardrobe_core::{ItemRecord, OutfitSuggestion};

use crate::client::Stylist;
use crate::error::RemoteError;
use crate::rest::blocking;
use crate::vision::response_text;

#[derive(Debug, Clone)]
pub struct VisionStylist {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
}

impl VisionStylist {
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

    fn suggest_blocking(
        &self,
        intent: &str,
        inventory: &[ItemRecord],
    ) -> Result<OutfitSuggestion, RemoteError> {
        tracing::debug!(items = inventory.len(), "asking stylist for an outfit");
        let body = request_body(intent, inventory)?;
        let response: Value = self
            .agent
            .post(&self.generate_url())
            .query("key", &self.api_key)
            .send_json(body)?
            .into_json()
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        suggestion_from_response(&response)
    }
}

#[async_trait]
impl Stylist for VisionStylist {
    async fn suggest(
        &self,
        intent: &str,
        inventory: &[ItemRecord],
    ) -> Result<OutfitSuggestion, RemoteError> {
        let client = self.clone();
        let intent = intent.to_string();
        let inventory = inventory.to_vec();
        blocking(move || client.suggest_blocking(&intent, &inventory)).await
    }
}

/// Each item flattened to `{"id": ..., <tags>}`.
fn inventory_json(inventory: &[ItemRecord]) -> Result<Value, RemoteError> {
    let mut rows = Vec::with_capacity(inventory.len());
    for item in inventory {
        let mut row = match serde_json::to_value(&item.attributes)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        row.insert("id".to_string(), Value::String(item.id.0.clone()));
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}

fn request_body(intent: &str, inventory: &[ItemRecord]) -> Result<Value, RemoteError> {
    let prompt = format!(
        "User intent: {}\n\
         Available inventory: {}\n\n\
         Select the best outfit from the available inventory only. Return one JSON object:\n\
         {{\"selected_item_ids\": [\"id\"], \"outfit_type\": \"string\", \"reasoning\": \"string\"}}",
        serde_json::to_string(intent)?,
        serde_json::to_string(&inventory_json(inventory)?)?,
    );
    Ok(json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": { "responseMimeType": "application/json" }
    }))
}

/// Pull the outfit out of a `generateContent` response: the span from the
/// first `{` to the last `}` of the text part.
pub fn suggestion_from_response(response: &Value) -> Result<OutfitSuggestion, RemoteError> {
    let text = response_text(response)?;
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(RemoteError::Rejected(
            "stylist output has no JSON object".to_string(),
        ));
    };
    if end < start {
        return Err(RemoteError::Rejected(
            "stylist output has no JSON object".to_string(),
        ));
    }
    Ok(serde_json::from_str(&text[start..=end])?)
}
