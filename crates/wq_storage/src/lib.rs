use std::sync::Arc;

use wq_core::{Error, QuizStorage, Result};

pub mod backends;

pub use backends::*;

pub const DEFAULT_DATABASE_PATH: &str = "quiz_data.db";

/// Open the backend named by `kind` (`memory` or `sqlite`). `url` is the
/// SQLite file path or `sqlite:` URL and is ignored by the memory backend.
#[cfg_attr(not(feature = "sqlite"), allow(unused_variables))]
pub async fn create_storage(kind: &str, url: Option<&str>) -> Result<Arc<dyn QuizStorage>> {
    match kind.to_ascii_lowercase().as_str() {
        "memory" => {
            tracing::info!("🏦 Using in-memory storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let storage = SQLiteStorage::new_with_url(url.unwrap_or(DEFAULT_DATABASE_PATH)).await?;
            tracing::info!(path = %storage.get_db_path().display(), "🏦 Using SQLite storage");
            Ok(Arc::new(storage))
        }
        other => Err(Error::Storage(format!(
            "Unknown storage backend '{}'. Available backends: {}",
            other,
            available_backends().join(", ")
        ))),
    }
}

pub fn available_backends() -> Vec<&'static str> {
    let mut backends = vec!["memory"];
    if cfg!(feature = "sqlite") {
        backends.push("sqlite");
    }
    backends
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
    pub use wq_core::QuizStorage;
}
