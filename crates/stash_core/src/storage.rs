use async_trait::async_trait;

use crate::types::{ArticleRecord, FeedSubscription, NewArticle, UserProfile};
use crate::Result;

/// Per-user document store for the archive.
///
/// Contract: writes succeed or are rejected atomically per document, last
/// write wins per document, and every operation is scoped to `owner`. A
/// lookup under the wrong owner behaves exactly like a missing document.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a new article for `owner`. The store assigns the id and the
    /// creation timestamp and forces `is_read` to false. An empty-string
    /// image URL is collapsed to `None` before the write.
    async fn add_article(&self, owner: &str, article: NewArticle) -> Result<ArticleRecord>;

    /// All of `owner`'s articles, newest first.
    async fn list_articles(&self, owner: &str) -> Result<Vec<ArticleRecord>>;

    /// Point lookup with owner check.
    async fn get_article(&self, owner: &str, id: &str) -> Result<ArticleRecord>;

    /// Full-document update. `user_id` and `date_added` are immutable; the
    /// stored values win over whatever the caller passes.
    async fn update_article(&self, owner: &str, article: &ArticleRecord) -> Result<()>;

    async fn delete_article(&self, owner: &str, id: &str) -> Result<()>;

    /// Store a feed subscription. Feeds are never polled.
    async fn add_feed(&self, owner: &str, name: &str, url: &str) -> Result<FeedSubscription>;

    async fn list_feeds(&self, owner: &str) -> Result<Vec<FeedSubscription>>;

    async fn delete_feed(&self, owner: &str, id: &str) -> Result<()>;

    /// The owner's profile, or the default profile when never saved.
    async fn get_profile(&self, owner: &str) -> Result<UserProfile>;

    async fn save_profile(&self, owner: &str, profile: &UserProfile) -> Result<()>;
}
