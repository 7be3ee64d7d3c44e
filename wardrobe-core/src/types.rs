//! Domain types for the wardrobe catalog.
//!
//! Field names on the wire (remote rows and the on-device replica) follow the
//! remote table: `id`, `created_at`, `image_url`, `tags`, `is_clean`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Remote-assigned identifier of a catalog item. Never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Locator of an item's photo in the blob store (usually a public URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    /// Object name inside the blob bucket: the last `/`-separated segment of
    /// the locator, without any query string.
    pub fn blob_name(&self) -> Option<&str> {
        let path = self.0.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// A single classifier-produced tag value.
///
/// Variant order matters for untagged deserialization: booleans and numbers
/// are tried before strings so `true` and `3` keep their JSON type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<String>),
    /// Anything a newer classifier emits that does not fit the shapes above.
    /// Kept verbatim so it survives a round trip through the replica.
    Other(serde_json::Value),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(n.into())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> Self {
        AttributeValue::List(v)
    }
}

/// Open-ended tag map. The key set depends on the classifier version, so
/// unknown keys are carried as-is.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Parse a `key=value` pair as typed on a command line or form field.
///
/// `true`/`false` become booleans, numeric text becomes a number, a value
/// containing commas becomes a list, anything else stays text.
pub fn parse_attribute(pair: &str) -> Option<(String, AttributeValue)> {
    let (key, raw) = pair.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let raw = raw.trim();
    let value = match raw {
        "true" => AttributeValue::Bool(true),
        "false" => AttributeValue::Bool(false),
        _ => {
            if has_leading_zero(raw) {
                AttributeValue::Text(raw.to_owned())
            } else if let Ok(n) = raw.parse::<i64>() {
                AttributeValue::Number(n.into())
            } else if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                AttributeValue::Number(n)
            } else if raw.contains(',') {
                AttributeValue::List(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect(),
                )
            } else {
                AttributeValue::Text(raw.to_owned())
            }
        }
    };
    Some((key.to_owned(), value))
}

/// `0123` or `-007`: an identifier-like code, not a quantity. `0` and `0.5`
/// are still numbers.
fn has_leading_zero(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    digits.len() > 1 && digits.starts_with('0') && !digits[1..].starts_with('.')
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One physical wardrobe item as stored remotely and mirrored locally.
///
/// `id` and `created_at` are assigned by the remote store; only `attributes`
/// and `is_clean` change afterwards, and only through [`ItemPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "image_url")]
    pub image_ref: ImageRef,
    #[serde(rename = "tags", default, deserialize_with = "null_as_empty")]
    pub attributes: Attributes,
    pub is_clean: bool,
}

/// Rows written without tags carry `"tags": null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Attributes, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Attributes>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl ItemRecord {
    /// The `category` attribute, if the classifier produced one as text.
    pub fn category(&self) -> Option<&str> {
        self.attributes.get("category").and_then(AttributeValue::as_text)
    }

    /// Apply a partial update in place. Immutable fields are untouched by
    /// construction.
    pub fn apply(&mut self, patch: &ItemPatch) {
        if let Some(attributes) = &patch.attributes {
            self.attributes = attributes.clone();
        }
        if let Some(is_clean) = patch.is_clean {
            self.is_clean = is_clean;
        }
    }
}

/// Sort newest first, the order every replica read returns.
pub fn sort_newest_first(items: &mut [ItemRecord]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// What the caller supplies when adding an item. Attributes given here win
/// over classifier output for the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default = "default_clean")]
    pub is_clean: bool,
    /// MIME type of the photo bytes, e.g. `image/jpeg`.
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl Default for ItemDraft {
    fn default() -> Self {
        Self {
            attributes: Attributes::new(),
            is_clean: default_clean(),
            content_type: default_content_type(),
        }
    }
}

fn default_clean() -> bool {
    true
}

fn default_content_type() -> String {
    "image/jpeg".to_string()
}

/// Insert payload: an item without the remote-assigned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    #[serde(rename = "image_url")]
    pub image_ref: ImageRef,
    #[serde(rename = "tags")]
    pub attributes: Attributes,
    pub is_clean: bool,
}

/// Partial update of the mutable fields of an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(rename = "tags", skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_clean: Option<bool>,
}

impl ItemPatch {
    pub fn cleanliness(is_clean: bool) -> Self {
        Self {
            attributes: None,
            is_clean: Some(is_clean),
        }
    }

    pub fn attributes(attributes: Attributes) -> Self {
        Self {
            attributes: Some(attributes),
            is_clean: None,
        }
    }
}

/// Singleton sync metadata row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Classification of one reconcile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    /// Remote snapshot fetched and committed.
    Synced,
    /// Another reconcile was already running.
    InFlight,
    /// Too soon after the previous attempt.
    RateLimited,
    /// The remote fetch failed.
    Failed,
}

/// The last reconcile that reached the remote store, kept across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAttempt {
    pub at: DateTime<Utc>,
    pub outcome: ReconcileStatus,
}

// ---------------------------------------------------------------------------
// Outfit suggestions
// ---------------------------------------------------------------------------

/// A stylist's pick from the clean inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitSuggestion {
    #[serde(default)]
    pub selected_item_ids: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfit_type: Option<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl OutfitSuggestion {
    /// Nothing selected, with `reasoning` explaining why.
    pub fn empty(reasoning: impl Into<String>) -> Self {
        Self {
            reasoning: reasoning.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
