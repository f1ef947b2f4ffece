pub mod flows;
pub mod models;

pub use flows::{extract_article_info, predict_article_relevance};
pub use models::create_model;
pub use stash_core::ExtractionModel;

/// Model construction parameters, passed explicitly from `main`. There is no
/// ambient client; callers own the handle they build.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub model_url: Option<String>,
}

pub mod prelude {
    pub use super::flows::{extract_article_info, predict_article_relevance};
    pub use super::models::create_model;
    pub use super::Config;
    pub use stash_core::{ExtractedInfo, ExtractionModel, RelevanceAssessment, Result};
}
