use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use url::Url;

use stash_ai::flows;
use stash_core::{
    ArticleRecord, Error, FeedSubscription, NewArticle, RelevanceAssessment, Tag, UserProfile,
};

use crate::AppState;

/// The authenticated owner, taken from the `x-user-id` header. The identity
/// provider in front of this service is trusted to have set it; the value is
/// opaque here.
pub struct Owner(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Owner(value.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing x-user-id header".to_string(),
            ),
            ApiError::Core(err) => {
                let status = match &err {
                    Error::NotFound(_) => StatusCode::NOT_FOUND,
                    Error::InvalidUrl(_) | Error::InvalidRecord(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    Error::Relevance(_) => StatusCode::BAD_GATEWAY,
                    Error::Extraction(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    error!("request failed: {err}");
                }
                (status, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn parse_absolute_url(raw: &str) -> Result<Url, ApiError> {
    Url::parse(raw.trim()).map_err(|_| ApiError::Core(Error::InvalidUrl(raw.to_string())))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddArticleBody {
    pub url: String,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    owner: Owner,
) -> Result<Json<Vec<ArticleRecord>>, ApiError> {
    Ok(Json(state.store.list_articles(&owner.0).await?))
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Json(body): Json<AddArticleBody>,
) -> Result<(StatusCode, Json<ArticleRecord>), ApiError> {
    let url = parse_absolute_url(&body.url)?;

    // Extraction never fails: a degraded record is stored and returned as
    // data, and the client renders the failure note.
    let info = flows::extract_article_info(state.model.as_ref(), url.as_str()).await;
    if info.is_degraded() {
        warn!("degraded extraction for {url}: {}", info.title);
    }

    let record = state
        .store
        .add_article(
            &owner.0,
            NewArticle {
                title: info.title,
                summary: info.summary,
                url: body.url.trim().to_string(),
                image_url: info.image_url,
                data_ai_hint: info.data_ai_hint,
                source_name: url.host_str().map(String::from),
                content: None,
                tags: vec![],
            },
        )
        .await?;

    info!("📚 added article {} for {}", record.id, owner.0);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<Json<ArticleRecord>, ApiError> {
    Ok(Json(state.store.get_article(&owner.0, &id).await?))
}

/// Relevance as accepted over the wire. Clients may echo back a transient
/// `isLoading` flag; it is accepted here and dropped before anything is
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceDto {
    pub score: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing)]
    pub is_loading: Option<bool>,
}

impl RelevanceDto {
    fn into_assessment(self) -> RelevanceAssessment {
        RelevanceAssessment {
            score: self.score,
            reasoning: self.reasoning,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleBody {
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
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub ai_relevance: Option<RelevanceDto>,
}

impl UpdateArticleBody {
    /// Applies the edit on top of the stored record, enforcing the same
    /// invariants the extraction normalizer guarantees: non-empty
    /// title/summary, a non-empty hint of at most 50 chars, an absolute or
    /// absent image URL, and a relevance score in [0, 1]. Owner and creation
    /// time come from the stored record only.
    fn apply_to(self, stored: &ArticleRecord) -> Result<ArticleRecord, Error> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidRecord("title must not be empty".to_string()));
        }
        let summary = self.summary.trim().to_string();
        if summary.is_empty() {
            return Err(Error::InvalidRecord("summary must not be empty".to_string()));
        }
        let hint = self.data_ai_hint.trim();
        if hint.is_empty() {
            return Err(Error::InvalidRecord(
                "dataAiHint must not be empty".to_string(),
            ));
        }
        let data_ai_hint: String = hint.chars().take(stash_core::extract::MAX_HINT_LEN).collect();

        Url::parse(self.url.trim()).map_err(|_| Error::InvalidUrl(self.url.clone()))?;

        // Null is the canonical "no image"; anything that does not parse as
        // an absolute URL collapses to it rather than being stored.
        let image_url = self.image_url.and_then(|raw| {
            let trimmed = raw.trim().to_string();
            (!trimmed.is_empty() && Url::parse(&trimmed).is_ok()).then_some(trimmed)
        });

        if let Some(relevance) = &self.ai_relevance {
            if !(0.0..=1.0).contains(&relevance.score) {
                return Err(Error::InvalidRecord(format!(
                    "relevance score {} is outside [0, 1]",
                    relevance.score
                )));
            }
        }

        Ok(ArticleRecord {
            id: stored.id.clone(),
            user_id: stored.user_id.clone(),
            title,
            summary,
            url: self.url.trim().to_string(),
            image_url,
            data_ai_hint,
            source_name: self.source_name,
            content: self.content,
            tags: self.tags,
            date_added: stored.date_added,
            is_read: self.is_read,
            ai_relevance: self.ai_relevance.map(RelevanceDto::into_assessment),
        })
    }
}

pub async fn update_article(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Path(id): Path<String>,
    Json(body): Json<UpdateArticleBody>,
) -> Result<Json<ArticleRecord>, ApiError> {
    let stored = state.store.get_article(&owner.0, &id).await?;
    let updated = body.apply_to(&stored)?;
    state.store.update_article(&owner.0, &updated).await?;
    Ok(Json(state.store.get_article(&owner.0, &id).await?))
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_article(&owner.0, &id).await?;
    info!("🗑️ deleted article {id} for {}", owner.0);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceRequest {
    /// Overrides the profile's reading history for this one call.
    #[serde(default)]
    pub reading_history: Option<String>,
}

pub async fn predict_relevance(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Path(id): Path<String>,
    body: Option<Json<RelevanceRequest>>,
) -> Result<Json<ArticleRecord>, ApiError> {
    let mut record = state.store.get_article(&owner.0, &id).await?;

    let history = match body.and_then(|Json(body)| body.reading_history) {
        Some(history) => history,
        None => state.store.get_profile(&owner.0).await?.reading_history,
    };

    let content = record
        .content
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| record.summary.clone());

    // A failed prediction leaves the stored record untouched; the previous
    // assessment, if any, survives.
    let assessment = flows::predict_article_relevance(state.model.as_ref(), &content, &history)
        .await?;

    record.ai_relevance = Some(assessment);
    state.store.update_article(&owner.0, &record).await?;
    Ok(Json(state.store.get_article(&owner.0, &id).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFeedBody {
    pub name: String,
    pub url: String,
}

pub async fn list_feeds(
    State(state): State<Arc<AppState>>,
    owner: Owner,
) -> Result<Json<Vec<FeedSubscription>>, ApiError> {
    Ok(Json(state.store.list_feeds(&owner.0).await?))
}

pub async fn add_feed(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Json(body): Json<AddFeedBody>,
) -> Result<(StatusCode, Json<FeedSubscription>), ApiError> {
    parse_absolute_url(&body.url)?;
    if body.name.trim().is_empty() {
        return Err(ApiError::Core(Error::InvalidUrl(
            "feed name must not be empty".to_string(),
        )));
    }
    let feed = state
        .store
        .add_feed(&owner.0, body.name.trim(), body.url.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(feed)))
}

pub async fn delete_feed(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_feed(&owner.0, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    owner: Owner,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.store.get_profile(&owner.0).await?))
}

pub async fn save_profile(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, ApiError> {
    state.store.save_profile(&owner.0, &profile).await?;
    Ok(Json(state.store.get_profile(&owner.0).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored_record() -> ArticleRecord {
        ArticleRecord {
            id: "a1".to_string(),
            user_id: "alice".to_string(),
            title: "Stored".to_string(),
            summary: "Stored summary.".to_string(),
            url: "https://example.com/post".to_string(),
            image_url: None,
            data_ai_hint: "general content".to_string(),
            source_name: None,
            content: None,
            tags: vec![],
            date_added: Utc::now(),
            is_read: false,
            ai_relevance: None,
        }
    }

    #[test]
    fn update_body_drops_is_loading_flag() {
        let body: UpdateArticleBody = serde_json::from_str(
            r#"{
                "title": "Edited",
                "summary": "Edited summary.",
                "url": "https://example.com/post",
                "dataAiHint": "general content",
                "aiRelevance": {"score": 0.4, "reasoning": "meh", "isLoading": true}
            }"#,
        )
        .unwrap();

        let updated = body.apply_to(&stored_record()).unwrap();
        let relevance = updated.ai_relevance.unwrap();
        assert_eq!(relevance.score, 0.4);
        // The core type has no isLoading field; serializing must not leak one.
        let json = serde_json::to_value(&relevance).unwrap();
        assert!(json.get("isLoading").is_none());
    }

    #[test]
    fn update_body_cannot_reassign_owner_or_creation_time() {
        let stored = stored_record();
        let body: UpdateArticleBody = serde_json::from_str(
            r#"{
                "title": "Edited",
                "summary": "Edited summary.",
                "url": "https://example.com/post",
                "dataAiHint": "general content",
                "isRead": true
            }"#,
        )
        .unwrap();
        let updated = body.apply_to(&stored).unwrap();
        assert_eq!(updated.user_id, stored.user_id);
        assert_eq!(updated.date_added, stored.date_added);
        assert!(updated.is_read);
    }

    fn update_body(json: &str) -> UpdateArticleBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn update_body_rejects_empty_required_fields() {
        let stored = stored_record();
        for json in [
            r#"{"title": "", "summary": "ok", "url": "https://example.com/p", "dataAiHint": "general content"}"#,
            r#"{"title": "  ", "summary": "ok", "url": "https://example.com/p", "dataAiHint": "general content"}"#,
            r#"{"title": "ok", "summary": "", "url": "https://example.com/p", "dataAiHint": "general content"}"#,
            r#"{"title": "ok", "summary": "ok", "url": "https://example.com/p", "dataAiHint": " "}"#,
        ] {
            let err = update_body(json).apply_to(&stored).unwrap_err();
            assert!(matches!(err, Error::InvalidRecord(_)), "must reject {json}");
        }
    }

    #[test]
    fn update_body_rejects_bad_url_and_out_of_range_score() {
        let stored = stored_record();
        let err = update_body(
            r#"{"title": "ok", "summary": "ok", "url": "not-a-url", "dataAiHint": "general content"}"#,
        )
        .apply_to(&stored)
        .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));

        for score in ["7.3", "-0.1", "1.0001"] {
            let json = format!(
                r#"{{"title": "ok", "summary": "ok", "url": "https://example.com/p",
                    "dataAiHint": "general content",
                    "aiRelevance": {{"score": {score}, "reasoning": "r"}}}}"#
            );
            let err = update_body(&json).apply_to(&stored).unwrap_err();
            assert!(matches!(err, Error::InvalidRecord(_)), "must reject score {score}");
        }
    }

    #[test]
    fn update_body_collapses_bad_image_and_truncates_hint() {
        let stored = stored_record();
        let long_hint = "h".repeat(80);
        let json = format!(
            r#"{{"title": "ok", "summary": "ok", "url": "https://example.com/p",
                "imageUrl": "not-a-url", "dataAiHint": "{long_hint}"}}"#
        );
        let updated = update_body(&json).apply_to(&stored).unwrap();
        assert_eq!(updated.image_url, None);
        assert_eq!(updated.data_ai_hint.chars().count(), 50);

        let json = r#"{"title": "ok", "summary": "ok", "url": "https://example.com/p",
                       "imageUrl": "https://example.com/cover.png", "dataAiHint": "general content"}"#;
        let updated = update_body(json).apply_to(&stored).unwrap();
        assert_eq!(
            updated.image_url.as_deref(),
            Some("https://example.com/cover.png")
        );
    }

    #[tokio::test]
    async fn invalid_update_is_rejected_and_leaves_record_unchanged() {
        let state = test_state().await;
        let (_, Json(record)) = create_article(
            State(state.clone()),
            Owner("alice".to_string()),
            Json(AddArticleBody {
                url: "https://example.com/post".to_string(),
            }),
        )
        .await
        .unwrap();

        let body = update_body(
            r#"{"title": "", "summary": "", "url": "https://example.com/post",
                "imageUrl": "not-a-url", "dataAiHint": "",
                "aiRelevance": {"score": 7.3, "reasoning": "way off"}}"#,
        );
        let err = update_article(
            State(state.clone()),
            Owner("alice".to_string()),
            Path(record.id.clone()),
            Json(body),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ApiError::Core(Error::InvalidRecord(_) | Error::InvalidUrl(_))
        ));

        let Json(fetched) = get_article(
            State(state),
            Owner("alice".to_string()),
            Path(record.id),
        )
        .await
        .unwrap();
        assert_eq!(fetched.title, record.title);
        assert_eq!(fetched.summary, record.summary);
        assert_eq!(fetched.data_ai_hint, record.data_ai_hint);
        assert_eq!(fetched.image_url, record.image_url);
        assert!(fetched.ai_relevance.is_none());
    }

    #[test]
    fn article_record_serializes_camel_case() {
        let json = serde_json::to_value(stored_record()).unwrap();
        assert!(json.get("dataAiHint").is_some());
        assert!(json.get("dateAdded").is_some());
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("user_id").is_none());
    }

    async fn test_state() -> Arc<AppState> {
        let model = stash_ai::models::DummyModel::new(None).await.unwrap();
        Arc::new(AppState {
            store: Arc::new(stash_storage::MemoryStore::new()),
            model: Arc::new(model),
        })
    }

    #[tokio::test]
    async fn create_list_and_delete_article() {
        let state = test_state().await;
        let (status, Json(record)) = create_article(
            State(state.clone()),
            Owner("alice".to_string()),
            Json(AddArticleBody {
                url: "https://example.com/post".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record.source_name.as_deref(), Some("example.com"));
        assert!(!record.title.is_empty());

        let Json(listed) = list_articles(State(state.clone()), Owner("alice".to_string()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let Json(listed) = list_articles(State(state.clone()), Owner("bob".to_string()))
            .await
            .unwrap();
        assert!(listed.is_empty());

        let status = delete_article(
            State(state.clone()),
            Owner("alice".to_string()),
            Path(record.id),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn create_rejects_relative_url() {
        let state = test_state().await;
        let err = create_article(
            State(state),
            Owner("alice".to_string()),
            Json(AddArticleBody {
                url: "not-a-url".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::Core(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn relevance_uses_profile_history_and_persists() {
        let state = test_state().await;
        state
            .store
            .save_profile(
                "alice",
                &UserProfile {
                    name: "Alice".to_string(),
                    email: "alice@example.com".to_string(),
                    reading_history: "Rust, databases.".to_string(),
                },
            )
            .await
            .unwrap();

        let (_, Json(record)) = create_article(
            State(state.clone()),
            Owner("alice".to_string()),
            Json(AddArticleBody {
                url: "https://example.com/post".to_string(),
            }),
        )
        .await
        .unwrap();

        let Json(scored) = predict_relevance(
            State(state.clone()),
            Owner("alice".to_string()),
            Path(record.id.clone()),
            None,
        )
        .await
        .unwrap();
        let assessment = scored.ai_relevance.unwrap();
        assert!((0.0..=1.0).contains(&assessment.score));

        let Json(fetched) = get_article(
            State(state),
            Owner("alice".to_string()),
            Path(record.id),
        )
        .await
        .unwrap();
        assert!(fetched.ai_relevance.is_some());
    }

    struct OverenthusiasticModel;

    #[axum::async_trait]
    impl stash_core::ExtractionModel for OverenthusiasticModel {
        fn name(&self) -> &str {
            "Overenthusiastic"
        }

        async fn extract_article_info(
            &self,
            _url: &str,
        ) -> stash_core::Result<Option<stash_core::RawExtraction>> {
            Ok(Some(stash_core::RawExtraction {
                title: Some("A Title".to_string()),
                summary: Some("A summary.".to_string()),
                image_url: None,
                data_ai_hint: Some("general content".to_string()),
            }))
        }

        async fn predict_relevance(
            &self,
            _content: &str,
            _history: &str,
        ) -> stash_core::Result<Option<stash_core::RawRelevance>> {
            Ok(Some(stash_core::RawRelevance {
                relevance_score: Some(1.4),
                reasoning: Some("over the top".to_string()),
            }))
        }
    }

    #[tokio::test]
    async fn out_of_range_score_fails_and_keeps_previous_assessment() {
        let state = Arc::new(AppState {
            store: Arc::new(stash_storage::MemoryStore::new()),
            model: Arc::new(OverenthusiasticModel),
        });

        let (_, Json(mut record)) = create_article(
            State(state.clone()),
            Owner("alice".to_string()),
            Json(AddArticleBody {
                url: "https://example.com/post".to_string(),
            }),
        )
        .await
        .unwrap();

        // Seed a previous assessment the failed call must not clobber.
        record.ai_relevance = Some(RelevanceAssessment {
            score: 0.6,
            reasoning: "earlier run".to_string(),
        });
        state.store.update_article("alice", &record).await.unwrap();

        let err = predict_relevance(
            State(state.clone()),
            Owner("alice".to_string()),
            Path(record.id.clone()),
            Some(Json(RelevanceRequest {
                reading_history: Some("Rust.".to_string()),
            })),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::Core(Error::Relevance(_))));

        let Json(fetched) = get_article(
            State(state),
            Owner("alice".to_string()),
            Path(record.id),
        )
        .await
        .unwrap();
        assert_eq!(fetched.ai_relevance.unwrap().score, 0.6);
    }

    #[tokio::test]
    async fn relevance_without_history_fails_and_preserves_record() {
        let state = test_state().await;
        let (_, Json(record)) = create_article(
            State(state.clone()),
            Owner("alice".to_string()),
            Json(AddArticleBody {
                url: "https://example.com/post".to_string(),
            }),
        )
        .await
        .unwrap();

        // No profile saved, no override: the flow rejects the empty history.
        let err = predict_relevance(
            State(state.clone()),
            Owner("alice".to_string()),
            Path(record.id.clone()),
            None,
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::Core(Error::Relevance(_))));

        let Json(fetched) = get_article(
            State(state),
            Owner("alice".to_string()),
            Path(record.id),
        )
        .await
        .unwrap();
        assert!(fetched.ai_relevance.is_none());
    }
}
