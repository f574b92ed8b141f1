use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("UNKNOWN_ENTITY_TYPE: {0}")]
    UnknownEntityType(String),
    #[error("CORRUPT_DOCUMENT: {0}")]
    CorruptDocument(String),
    #[error("STORAGE_FAILURE: {0}")]
    Storage(String),
    #[error("FORBIDDEN: {0}")]
    Forbidden(String),
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
