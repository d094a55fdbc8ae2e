use spotted_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid settings key: {0:?}")]
    InvalidKey(String),
}

impl From<DbError> for CoreError {
    fn from(e: DbError) -> Self {
        CoreError::Persistence(e.to_string())
    }
}
