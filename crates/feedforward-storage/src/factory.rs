use crate::{InMemoryStorage, LocalStorage, Storage, StorageBackend, StorageResult};
use feedforward_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        StorageBackend::Local => {
            let storage = LocalStorage::new(config.local_storage_path()).await?;
            tracing::info!(path = %config.local_storage_path(), "Using local storage backend");
            Ok(Arc::new(storage))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage backend; uploads are lost on restart");
            Ok(Arc::new(InMemoryStorage::new()))
        }
    }
}
