use async_trait::async_trait;

use crate::extract::RawExtraction;
use crate::relevance::RawRelevance;
use crate::Result;

/// The generative extraction service, treated as an untrusted black box.
///
/// `Ok(None)` means the call went through but produced no structured payload;
/// `Err` is a transport or protocol failure. Both are absorbed by the
/// extraction normalizer; only the relevance path surfaces them.
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    fn name(&self) -> &str;

    /// Ask the model for title/summary/image/hint for the page at `article_url`.
    async fn extract_article_info(&self, article_url: &str) -> Result<Option<RawExtraction>>;

    /// Ask the model how relevant `article_content` is to a reader described
    /// by `reading_history`.
    async fn predict_relevance(
        &self,
        article_content: &str,
        reading_history: &str,
    ) -> Result<Option<RawRelevance>>;
}
