use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use stash_core::{ExtractionModel, RawExtraction, RawRelevance, Result};

use crate::Config;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

const EXTRACT_PROMPT: &str = "You are an expert at extracting information from web pages.\n\
Given the following URL, extract the main title of the article, a concise 2-3 sentence summary, \
a representative image URL if one exists, and a two-word hint describing the imagery.\n\n\
Article URL: {url}\n\n\
Respond with a single JSON object with keys \"title\", \"summary\", \"imageUrl\" and \"dataAiHint\".\n\
If you cannot access the URL or extract the information, you MUST still provide a title and summary: \
use a title like \"Extraction Failed: URL Inaccessible\" or \"Extraction Failed: Content Unsuitable\" \
and a summary explaining the issue.";

const RELEVANCE_PROMPT: &str = "You predict how relevant an article is to a reader based on their reading history.\n\n\
Article Content: {content}\n\
User Reading History: {history}\n\n\
Respond with a single JSON object with keys \"relevanceScore\" (a number between 0 and 1, where 0 means \
not relevant and 1 means highly relevant) and \"reasoning\" (why you chose that score).";

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: String,
}

/// Chat-completions client for any OpenAI-compatible endpoint. Transport
/// failures surface as `Err`; a response whose content is not the requested
/// JSON object comes back as `Ok(None)` so the normalizer can take over.
pub struct OpenAiModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    chat_model: String,
}

impl OpenAiModel {
    pub async fn new(config: Option<Config>) -> Result<Self> {
        let config = config.unwrap_or_default();
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key: config.api_key.unwrap_or_default(),
            base_url: config
                .model_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        })
    }

    async fn chat(&self, prompt: String) -> Result<Option<String>> {
        let request = ChatRequest {
            model: self.chat_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            response_format: ResponseFormat {
                format: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .json::<ChatResponse>()
            .await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty()))
    }

    /// JSON parse failures are not errors here: a model that returned prose
    /// instead of the schema is "no structured payload", which downstream
    /// normalization already handles.
    fn parse_payload<T: serde::de::DeserializeOwned>(content: &str) -> Option<T> {
        match serde_json::from_str(content) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("model returned unparseable payload: {e}");
                None
            }
        }
    }
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .finish()
    }
}

#[async_trait]
impl ExtractionModel for OpenAiModel {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn extract_article_info(&self, article_url: &str) -> Result<Option<RawExtraction>> {
        let prompt = EXTRACT_PROMPT.replace("{url}", article_url);
        let content = self.chat(prompt).await?;
        Ok(content.as_deref().and_then(Self::parse_payload))
    }

    async fn predict_relevance(
        &self,
        article_content: &str,
        reading_history: &str,
    ) -> Result<Option<RawRelevance>> {
        let prompt = RELEVANCE_PROMPT
            .replace("{content}", article_content)
            .replace("{history}", reading_history);
        let content = self.chat(prompt).await?;
        Ok(content.as_deref().and_then(Self::parse_payload))
    }
}
