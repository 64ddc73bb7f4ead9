use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported document version {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid document: {0}")]
    Invalid(String),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
