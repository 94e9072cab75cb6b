//! Animal records and parent resolution.

mod collection;
mod record;
pub mod relations;

pub use collection::load_collection;
pub use record::{AnimalRecord, Sex};
pub use relations::{coerce_id, extract_parents, ParentIds};

use std::path::PathBuf;
use thiserror::Error;

/// Identifier of an animal. Always positive.
pub type AnimalId = u64;

/// Errors raised while ingesting animal records.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Invalid animal id: {0}")]
    InvalidId(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RecordError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecordError::Io {
            path: path.into(),
            source,
        }
    }
}
