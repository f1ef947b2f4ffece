use tracing::warn;

use stash_core::{
    normalize_extraction, normalize_relevance, Error, ExtractedInfo, ExtractionModel,
    RelevanceAssessment, Result,
};

/// Extract title/summary/image/hint for a URL.
///
/// This never fails: a transport error or an absent payload both collapse
/// into the normalizer's fully-degraded record, so the caller always gets a
/// displayable result.
pub async fn extract_article_info(
    model: &dyn ExtractionModel,
    article_url: &str,
) -> ExtractedInfo {
    let raw = match model.extract_article_info(article_url).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("extraction call failed for {article_url}: {e}");
            None
        }
    };
    normalize_extraction(raw)
}

/// Score one article against a reading-history summary.
///
/// Unlike extraction this is all-or-nothing: empty inputs, transport
/// failures, missing payloads and out-of-range scores are hard errors. The
/// caller keeps the article's previous assessment when this fails.
pub async fn predict_article_relevance(
    model: &dyn ExtractionModel,
    article_content: &str,
    reading_history: &str,
) -> Result<RelevanceAssessment> {
    if article_content.trim().is_empty() {
        return Err(Error::Relevance("article content is empty".to_string()));
    }
    if reading_history.trim().is_empty() {
        return Err(Error::Relevance("reading history is empty".to_string()));
    }

    let raw = model
        .predict_relevance(article_content, reading_history)
        .await?;
    normalize_relevance(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyModel;
    use async_trait::async_trait;
    use stash_core::extract::{ERROR_HINT, MODEL_ERROR_TITLE};
    use stash_core::{RawExtraction, RawRelevance};

    struct UnreachableModel;

    #[async_trait]
    impl ExtractionModel for UnreachableModel {
        fn name(&self) -> &str {
            "Unreachable"
        }

        async fn extract_article_info(&self, _url: &str) -> Result<Option<RawExtraction>> {
            Err(Error::Extraction("connection refused".to_string()))
        }

        async fn predict_relevance(
            &self,
            _content: &str,
            _history: &str,
        ) -> Result<Option<RawRelevance>> {
            Err(Error::Extraction("connection refused".to_string()))
        }
    }

    struct SilentModel;

    #[async_trait]
    impl ExtractionModel for SilentModel {
        fn name(&self) -> &str {
            "Silent"
        }

        async fn extract_article_info(&self, _url: &str) -> Result<Option<RawExtraction>> {
            Ok(None)
        }

        async fn predict_relevance(
            &self,
            _content: &str,
            _history: &str,
        ) -> Result<Option<RawRelevance>> {
            Ok(None)
        }
    }

    struct OutOfRangeModel;

    #[async_trait]
    impl ExtractionModel for OutOfRangeModel {
        fn name(&self) -> &str {
            "OutOfRange"
        }

        async fn extract_article_info(&self, _url: &str) -> Result<Option<RawExtraction>> {
            Ok(None)
        }

        async fn predict_relevance(
            &self,
            _content: &str,
            _history: &str,
        ) -> Result<Option<RawRelevance>> {
            Ok(Some(RawRelevance {
                relevance_score: Some(1.4),
                reasoning: Some("overenthusiastic".to_string()),
            }))
        }
    }

    #[tokio::test]
    async fn extraction_absorbs_transport_failure() {
        let out = extract_article_info(&UnreachableModel, "https://example.com").await;
        assert_eq!(out.title, MODEL_ERROR_TITLE);
        assert_eq!(out.image_url, None);
        assert_eq!(out.data_ai_hint, ERROR_HINT);
    }

    #[tokio::test]
    async fn extraction_absorbs_missing_payload() {
        let out = extract_article_info(&SilentModel, "https://example.com").await;
        assert_eq!(out.title, MODEL_ERROR_TITLE);
    }

    #[tokio::test]
    async fn extraction_with_dummy_model_is_well_formed() {
        let model = DummyModel::new(None).await.unwrap();
        let out = extract_article_info(&model, "https://example.com/article").await;
        assert!(!out.title.is_empty());
        assert!(!out.summary.is_empty());
        assert!(!out.data_ai_hint.is_empty());
        assert!(out.data_ai_hint.chars().count() <= 50);
    }

    #[tokio::test]
    async fn relevance_surfaces_transport_failure() {
        let err = predict_article_relevance(&UnreachableModel, "content", "history")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[tokio::test]
    async fn relevance_surfaces_missing_payload() {
        let err = predict_article_relevance(&SilentModel, "content", "history")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Relevance(_)));
    }

    #[tokio::test]
    async fn relevance_rejects_out_of_range_score() {
        let err = predict_article_relevance(&OutOfRangeModel, "content", "history")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Relevance(_)));
    }

    #[tokio::test]
    async fn relevance_rejects_empty_inputs() {
        let model = DummyModel::new(None).await.unwrap();
        assert!(predict_article_relevance(&model, "", "history").await.is_err());
        assert!(predict_article_relevance(&model, "content", "  ").await.is_err());
    }
}
