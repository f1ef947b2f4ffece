use std::sync::Arc;

use async_trait::async_trait;
use stash_core::{ArticleStore, Error, Result};

pub mod backends;

pub use backends::*;

/// Default-constructible storage backend, for wiring by name from the CLI.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn new() -> Result<Self>
    where
        Self: Sized;
}

async fn init_backend<T>() -> Result<Arc<dyn ArticleStore>>
where
    T: StorageBackend + ArticleStore + 'static,
{
    let store = T::new()
        .await
        .map_err(|e| Error::Storage(format!("{}: {e}", T::get_error_message())))?;
    Ok(Arc::new(store))
}

/// Build a store by name: `"memory"` (default) or `"sqlite"` when the
/// feature is enabled.
pub async fn create_store(kind: &str) -> Result<Arc<dyn ArticleStore>> {
    match kind {
        "memory" => init_backend::<MemoryStore>().await,
        #[cfg(feature = "sqlite")]
        "sqlite" => init_backend::<SqliteStore>().await,
        other => Err(Error::Storage(format!("unknown storage backend: {other}"))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_store, StorageBackend};
    pub use stash_core::{ArticleStore, Result};
}
