use std::fmt;

use async_trait::async_trait;
use url::Url;

use stash_core::{ExtractionModel, RawExtraction, RawRelevance, Result};

use crate::Config;

/// Deterministic offline model for tests and local runs. Produces a payload
/// derived from the input URL; URLs that do not parse get the same degraded
/// payload a real model is prompted to emit.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub async fn new(_config: Option<Config>) -> Result<Self> {
        Ok(Self)
    }
}

#[async_trait]
impl ExtractionModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn extract_article_info(&self, article_url: &str) -> Result<Option<RawExtraction>> {
        let payload = match Url::parse(article_url) {
            Ok(url) => RawExtraction {
                title: Some(format!(
                    "Saved page from {}",
                    url.host_str().unwrap_or("unknown host")
                )),
                summary: Some(format!(
                    "Offline model: no content was fetched for {article_url}."
                )),
                image_url: None,
                data_ai_hint: Some("general content".to_string()),
            },
            Err(_) => RawExtraction {
                title: Some("Extraction Failed: URL Inaccessible".to_string()),
                summary: Some(
                    "Could not access or process the content at the provided URL.".to_string(),
                ),
                image_url: None,
                data_ai_hint: None,
            },
        };
        Ok(Some(payload))
    }

    async fn predict_relevance(
        &self,
        article_content: &str,
        _reading_history: &str,
    ) -> Result<Option<RawRelevance>> {
        // Stable pseudo-score so repeated calls agree.
        let score = (article_content.len() % 100) as f64 / 100.0;
        Ok(Some(RawRelevance {
            relevance_score: Some(score),
            reasoning: Some("Offline model: score derived from content length.".to_string()),
        }))
    }
}
