#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("database schema is dirty at version {0}, force a version to recover")]
    Dirty(u32),

    #[error("no change")]
    NoChange,

    #[error("unknown schema version {0}")]
    UnknownVersion(u32),

    #[error("migration source `{0}`")]
    InvalidSource(String),

    #[error("connection `{0}`")]
    Connection(String),

    #[error("migration {version} failed `{reason}`")]
    Failed { version: u32, reason: String },

    #[error("io `{0}`")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "pg")]
    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),
}

impl MigrateError {
    /// Whether the error comes from a connection that went stale and may
    /// recover after reconnecting.
    pub fn is_connection(&self) -> bool {
        match self {
            MigrateError::Connection(_) => true,
            #[cfg(feature = "pg")]
            MigrateError::Sqlx(
                sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut,
            ) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
