use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved article, as persisted by the document store and served to clients.
///
/// Field names serialize in camelCase so the wire shape matches the persisted
/// document shape (`imageUrl`, `dateAdded`, ...). `date_added` round-trips as
/// an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    /// Opaque id assigned by the store at insert.
    pub id: String,
    /// Owner. Immutable after creation; all reads and writes are scoped to it.
    pub user_id: String,
    pub title: String,
    pub summary: String,
    pub url: String,
    /// Absolute URL or `None`. An empty string is never stored.
    pub image_url: Option<String>,
    /// Non-empty descriptive tag for placeholder imagery, at most 50 chars.
    pub data_ai_hint: String,
    #[serde(default)]
    pub source_name: Option<String>,
    /// Full body for the reader view, markdown or HTML.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Server-assigned at creation, immutable after.
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_relevance: Option<RelevanceAssessment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// A model-produced relevance judgment for one article. Overwritten whole on
/// each new prediction, never merged. The UI-only "prediction in progress"
/// flag lives on the web-layer DTO and is stripped before this type is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceAssessment {
    /// In [0, 1]; validated by the relevance normalizer before construction.
    pub score: f64,
    pub reasoning: String,
}

/// Input for creating an article: everything the store does not assign itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    pub summary: String,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub data_ai_hint: String,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A stored feed subscription. Feeds are kept as name+URL pairs only; nothing
/// polls them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSubscription {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetched: Option<DateTime<Utc>>,
}

/// Per-user profile. `reading_history` is the free-text summary fed to the
/// relevance model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub reading_history: String,
}
