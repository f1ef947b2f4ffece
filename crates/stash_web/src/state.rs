use std::sync::Arc;

use stash_core::{ArticleStore, ExtractionModel};

/// Shared handler state. Both handles are injected by the binary that builds
/// the router; nothing here is lazily initialized or global.
pub struct AppState {
    pub store: Arc<dyn ArticleStore>,
    pub model: Arc<dyn ExtractionModel>,
}
