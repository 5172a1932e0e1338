use std::sync::Arc;

// Re-export core storage types so callers can use crate::storage::*
pub use demobank_core::storage::{StorageBackend, StorageError};
pub use demobank_json::JsonFileStorage;
pub use demobank_memory::MemoryStorage;

use crate::config::{StorageConfig, StorageEngine};

pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    match config.engine {
        StorageEngine::Json => Ok(Arc::new(JsonFileStorage::open(&config.data_dir)?)),
        StorageEngine::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on exit");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}
