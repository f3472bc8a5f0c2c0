#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid input `{field}`: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("partition `{0}` not found")]
    NotFoundPartition(String),

    #[error("partition `{0}` overlaps an existing partition")]
    PartitionConflict(String),

    #[error("{0} is not available")]
    NotAvailable(&'static str),

    #[error("rollback error `{rollback}` while recovering from `{source}`")]
    Rollback {
        source: Box<StoreError>,
        rollback: String,
    },

    #[cfg(feature = "pg")]
    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),

    #[error("serde_json `{0}`")]
    SerdeJson(#[from] serde_json::Error),

    #[error("{0}")]
    Any(#[from] anyhow::Error),
}

impl StoreError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
