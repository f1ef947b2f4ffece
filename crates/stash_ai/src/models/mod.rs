use std::sync::Arc;

use stash_core::{Error, ExtractionModel, Result};

use crate::Config;

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

/// Build a model by name. `"dummy"` needs no credentials and is the default
/// for local runs and tests; `"openai"` talks to a chat-completions endpoint.
pub async fn create_model(config: Option<Config>) -> Result<Arc<dyn ExtractionModel>> {
    let config = config.unwrap_or_default();
    match config.model_name.as_deref().unwrap_or("dummy") {
        "dummy" => Ok(Arc::new(DummyModel::new(None).await?)),
        "openai" => Ok(Arc::new(OpenAiModel::new(Some(config)).await?)),
        other => Err(Error::Extraction(format!("unknown model: {other}"))),
    }
}
