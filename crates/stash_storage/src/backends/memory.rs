use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use stash_core::{
    ArticleRecord, ArticleStore, Error, FeedSubscription, NewArticle, Result, UserProfile,
};

use crate::StorageBackend;

fn scrub_image_url(image_url: Option<String>) -> Option<String> {
    image_url.filter(|url| !url.trim().is_empty())
}

#[derive(Default)]
struct MemoryInner {
    articles: Vec<ArticleRecord>,
    feeds: Vec<FeedSubscription>,
    profiles: HashMap<String, UserProfile>,
}

/// In-memory backend. The default for tests and local runs; every write is
/// whole-document under one lock, matching the per-document atomicity the
/// core assumes.
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryInner::default())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    fn get_error_message() -> &'static str {
        "Memory storage should always be available"
    }

    async fn new() -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn add_article(&self, owner: &str, article: NewArticle) -> Result<ArticleRecord> {
        let record = ArticleRecord {
            id: Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            title: article.title,
            summary: article.summary,
            url: article.url,
            image_url: scrub_image_url(article.image_url),
            data_ai_hint: article.data_ai_hint,
            source_name: article.source_name,
            content: article.content,
            tags: article.tags,
            date_added: Utc::now(),
            is_read: false,
            ai_relevance: None,
        };
        let mut inner = self.inner.write().await;
        inner.articles.push(record.clone());
        Ok(record)
    }

    async fn list_articles(&self, owner: &str) -> Result<Vec<ArticleRecord>> {
        let inner = self.inner.read().await;
        let mut articles: Vec<ArticleRecord> = inner
            .articles
            .iter()
            .filter(|a| a.user_id == owner)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.date_added.cmp(&a.date_added));
        Ok(articles)
    }

    async fn get_article(&self, owner: &str, id: &str) -> Result<ArticleRecord> {
        let inner = self.inner.read().await;
        inner
            .articles
            .iter()
            .find(|a| a.id == id && a.user_id == owner)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("article {id}")))
    }

    async fn update_article(&self, owner: &str, article: &ArticleRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .articles
            .iter_mut()
            .find(|a| a.id == article.id && a.user_id == owner)
            .ok_or_else(|| Error::NotFound(format!("article {}", article.id)))?;

        let mut updated = article.clone();
        // Owner and creation time are immutable; the stored values win.
        updated.user_id = existing.user_id.clone();
        updated.date_added = existing.date_added;
        updated.image_url = scrub_image_url(updated.image_url);
        *existing = updated;
        Ok(())
    }

    async fn delete_article(&self, owner: &str, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.articles.len();
        inner
            .articles
            .retain(|a| !(a.id == id && a.user_id == owner));
        if inner.articles.len() == before {
            return Err(Error::NotFound(format!("article {id}")));
        }
        Ok(())
    }

    async fn add_feed(&self, owner: &str, name: &str, url: &str) -> Result<FeedSubscription> {
        let feed = FeedSubscription {
            id: Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            last_fetched: None,
        };
        let mut inner = self.inner.write().await;
        inner.feeds.push(feed.clone());
        Ok(feed)
    }

    async fn list_feeds(&self, owner: &str) -> Result<Vec<FeedSubscription>> {
        let inner = self.inner.read().await;
        Ok(inner
            .feeds
            .iter()
            .filter(|f| f.user_id == owner)
            .cloned()
            .collect())
    }

    async fn delete_feed(&self, owner: &str, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let before = inner.feeds.len();
        inner.feeds.retain(|f| !(f.id == id && f.user_id == owner));
        if inner.feeds.len() == before {
            return Err(Error::NotFound(format!("feed {id}")));
        }
        Ok(())
    }

    async fn get_profile(&self, owner: &str) -> Result<UserProfile> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(owner).cloned().unwrap_or_default())
    }

    async fn save_profile(&self, owner: &str, profile: &UserProfile) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.profiles.insert(owner.to_string(), profile.clone());
        Ok(())
    }
}
