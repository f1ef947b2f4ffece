use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use uuid::Uuid;

use stash_core::{
    ArticleRecord, ArticleStore, Error, FeedSubscription, NewArticle, RelevanceAssessment, Result,
    Tag, UserProfile,
};

use crate::StorageBackend;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        summary TEXT NOT NULL,
        url TEXT NOT NULL,
        image_url TEXT,
        data_ai_hint TEXT NOT NULL,
        source_name TEXT,
        content TEXT,
        tags TEXT NOT NULL,
        date_added TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        ai_relevance TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_articles_user_date
    ON articles (user_id, date_added DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS feeds (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        url TEXT NOT NULL,
        last_fetched TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        user_id TEXT PRIMARY KEY,
        name TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL DEFAULT '',
        reading_history TEXT NOT NULL DEFAULT ''
    )
    "#,
    // Add future migrations here
];

/// SQLite backend. Tags and the relevance assessment are stored as JSON
/// columns; timestamps as RFC 3339 text.
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SqliteStore {
    fn get_error_message() -> &'static str {
        "SQLite database should be available at ./stash.db"
    }

    async fn new() -> Result<Self> {
        Self::new_with_path(Path::new("stash.db")).await
    }
}

impl SqliteStore {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .map_err(|e| Error::Storage(format!("invalid database path: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("failed to connect to database: {e}")))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("failed to run migration {i}: {e}")))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn scrub_image_url(image_url: Option<String>) -> Option<String> {
    image_url.filter(|url| !url.trim().is_empty())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("invalid stored timestamp {value:?}: {e}")))
}

fn row_to_article(row: &sqlx::sqlite::SqliteRow) -> Result<ArticleRecord> {
    let tags: String = row.get("tags");
    let tags: Vec<Tag> = serde_json::from_str(&tags)?;

    let ai_relevance: Option<String> = row.get("ai_relevance");
    let ai_relevance: Option<RelevanceAssessment> = match ai_relevance {
        Some(json) => Some(serde_json::from_str(&json)?),
        None => None,
    };

    let date_added: String = row.get("date_added");

    Ok(ArticleRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        summary: row.get("summary"),
        url: row.get("url"),
        image_url: row.get("image_url"),
        data_ai_hint: row.get("data_ai_hint"),
        source_name: row.get("source_name"),
        content: row.get("content"),
        tags,
        date_added: parse_timestamp(&date_added)?,
        is_read: row.get("is_read"),
        ai_relevance,
    })
}

#[async_trait]
impl ArticleStore for SqliteStore {
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

        let tags = serde_json::to_string(&record.tags)?;
        sqlx::query(
            r#"
            INSERT INTO articles
            (id, user_id, title, summary, url, image_url, data_ai_hint,
             source_name, content, tags, date_added, is_read, ai_relevance)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.title)
        .bind(&record.summary)
        .bind(&record.url)
        .bind(record.image_url.as_deref())
        .bind(&record.data_ai_hint)
        .bind(record.source_name.as_deref())
        .bind(record.content.as_deref())
        .bind(tags)
        .bind(record.date_added.to_rfc3339())
        .bind(record.is_read)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to store article: {e}")))?;

        Ok(record)
    }

    async fn list_articles(&self, owner: &str) -> Result<Vec<ArticleRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE user_id = ?
            ORDER BY date_added DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to list articles: {e}")))?;

        rows.iter().map(row_to_article).collect()
    }

    async fn get_article(&self, owner: &str, id: &str) -> Result<ArticleRecord> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("failed to fetch article: {e}")))?
            .ok_or_else(|| Error::NotFound(format!("article {id}")))?;

        row_to_article(&row)
    }

    async fn update_article(&self, owner: &str, article: &ArticleRecord) -> Result<()> {
        let tags = serde_json::to_string(&article.tags)?;
        let ai_relevance = article
            .ai_relevance
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let image_url = scrub_image_url(article.image_url.clone());

        // user_id and date_added are intentionally absent from the SET list.
        let result = sqlx::query(
            r#"
            UPDATE articles SET
                title = ?, summary = ?, url = ?, image_url = ?, data_ai_hint = ?,
                source_name = ?, content = ?, tags = ?, is_read = ?, ai_relevance = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.url)
        .bind(image_url.as_deref())
        .bind(&article.data_ai_hint)
        .bind(article.source_name.as_deref())
        .bind(article.content.as_deref())
        .bind(tags)
        .bind(article.is_read)
        .bind(ai_relevance.as_deref())
        .bind(&article.id)
        .bind(owner)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to update article: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("article {}", article.id)));
        }
        Ok(())
    }

    async fn delete_article(&self, owner: &str, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("failed to delete article: {e}")))?;

        if result.rows_affected() == 0 {
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

        sqlx::query(
            "INSERT INTO feeds (id, user_id, name, url, last_fetched) VALUES (?, ?, ?, ?, NULL)",
        )
        .bind(&feed.id)
        .bind(&feed.user_id)
        .bind(&feed.name)
        .bind(&feed.url)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to store feed: {e}")))?;

        Ok(feed)
    }

    async fn list_feeds(&self, owner: &str) -> Result<Vec<FeedSubscription>> {
        let rows = sqlx::query("SELECT * FROM feeds WHERE user_id = ?")
            .bind(owner)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("failed to list feeds: {e}")))?;

        rows.iter()
            .map(|row| {
                let last_fetched: Option<String> = row.get("last_fetched");
                Ok(FeedSubscription {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    name: row.get("name"),
                    url: row.get("url"),
                    last_fetched: last_fetched.as_deref().map(parse_timestamp).transpose()?,
                })
            })
            .collect()
    }

    async fn delete_feed(&self, owner: &str, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM feeds WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("failed to delete feed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("feed {id}")));
        }
        Ok(())
    }

    async fn get_profile(&self, owner: &str) -> Result<UserProfile> {
        let row = sqlx::query("SELECT * FROM profiles WHERE user_id = ?")
            .bind(owner)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("failed to fetch profile: {e}")))?;

        Ok(match row {
            Some(row) => UserProfile {
                name: row.get("name"),
                email: row.get("email"),
                reading_history: row.get("reading_history"),
            },
            None => UserProfile::default(),
        })
    }

    async fn save_profile(&self, owner: &str, profile: &UserProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, name, email, reading_history)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                reading_history = excluded.reading_history
            "#,
        )
        .bind(owner)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.reading_history)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("failed to save profile: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new_with_path(&dir.path().join("stash.db"))
            .await
            .unwrap();
        (dir, store)
    }

    fn new_article(title: &str) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            summary: "A summary.".to_string(),
            url: "https://example.com/post".to_string(),
            image_url: Some("https://example.com/cover.png".to_string()),
            data_ai_hint: "general content".to_string(),
            source_name: Some("Example".to_string()),
            content: Some("Full body.".to_string()),
            tags: vec![Tag {
                id: "rust".to_string(),
                name: "Rust".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn article_round_trip() {
        let (_dir, store) = temp_store().await;
        let record = store.add_article("alice", new_article("First")).await.unwrap();

        let fetched = store.get_article("alice", &record.id).await.unwrap();
        assert_eq!(fetched, record);

        assert!(matches!(
            store.get_article("bob", &record.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn update_persists_relevance_but_not_owner() {
        let (_dir, store) = temp_store().await;
        let record = store.add_article("alice", new_article("First")).await.unwrap();

        let mut edited = record.clone();
        edited.is_read = true;
        edited.ai_relevance = Some(RelevanceAssessment {
            score: 0.9,
            reasoning: "on topic".to_string(),
        });
        store.update_article("alice", &edited).await.unwrap();

        let fetched = store.get_article("alice", &record.id).await.unwrap();
        assert!(fetched.is_read);
        assert_eq!(fetched.ai_relevance.as_ref().unwrap().score, 0.9);
        assert_eq!(fetched.user_id, "alice");
        assert_eq!(fetched.date_added, record.date_added);
    }

    #[tokio::test]
    async fn listing_orders_newest_first() {
        let (_dir, store) = temp_store().await;
        store.add_article("alice", new_article("First")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.add_article("alice", new_article("Second")).await.unwrap();

        let listed = store.list_articles("alice").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
    }

    #[tokio::test]
    async fn feeds_and_profiles_round_trip() {
        let (_dir, store) = temp_store().await;
        let feed = store
            .add_feed("alice", "A Blog", "https://example.com/feed.xml")
            .await
            .unwrap();
        assert_eq!(store.list_feeds("alice").await.unwrap(), vec![feed.clone()]);
        store.delete_feed("alice", &feed.id).await.unwrap();

        let profile = UserProfile {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            reading_history: "Rust and distributed systems.".to_string(),
        };
        store.save_profile("alice", &profile).await.unwrap();
        store.save_profile("alice", &profile).await.unwrap();
        assert_eq!(store.get_profile("alice").await.unwrap(), profile);
    }
}
