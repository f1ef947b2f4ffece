pub mod error;
pub mod extract;
pub mod models;
pub mod relevance;
pub mod storage;
pub mod types;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use extract::{normalize_extraction, ExtractedInfo, RawExtraction};
pub use models::ExtractionModel;
pub use relevance::{normalize_relevance, RawRelevance};
pub use storage::ArticleStore;
pub use types::{
    ArticleRecord, FeedSubscription, NewArticle, RelevanceAssessment, Tag, UserProfile,
};

pub mod prelude {
    pub use crate::extract::{normalize_extraction, ExtractedInfo, RawExtraction};
    pub use crate::relevance::{normalize_relevance, RawRelevance};
    pub use crate::storage::ArticleStore;
    pub use crate::types::{ArticleRecord, NewArticle, RelevanceAssessment, Tag};
    pub use crate::{Error, Result};
}
