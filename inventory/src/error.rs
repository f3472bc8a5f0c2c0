use inventory_migrator::MigrateError;
use inventory_store::StoreError;
use validator::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("resource {id} not found")]
    NotFound { id: String },

    #[error("the value for field {field} was invalid: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("legacy write `{legacy}` and new write `{new}` both failed")]
    DualWrite { legacy: StoreError, new: StoreError },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Migrate(#[from] MigrateError),

    #[cfg(feature = "pg")]
    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),
}

impl InventoryError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        InventoryError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller sent something the inventory refuses, as opposed to
    /// a failure of the storage underneath.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            InventoryError::InvalidInput { .. }
                | InventoryError::Validation(_)
                | InventoryError::Store(StoreError::InvalidInput { .. })
        )
    }

    pub(crate) fn log(&self) {
        if self.is_invalid_input() {
            tracing::info!("invalid input: {self}");
        } else if !matches!(self, InventoryError::NotFound { .. }) {
            tracing::error!("storage error: {self}");
        }
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;
