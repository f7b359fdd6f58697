use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The database returned a byte column with an unexpected length.
    /// The schema carries CHECK()s for the relevant columns, so hitting
    /// this means the database was modified outside the store.
    #[error("database returned byte array with illegal length")]
    InvalidLength,

    /// Foreign key enforcement is disabled on the connection, which would
    /// silently break cascade deletes. Migrations refuse to run.
    #[error("foreign keys are not enabled")]
    ForeignKeysDisabled,

    #[error("failed to upgrade database to v{version}: {source}")]
    Migration {
        version: i32,
        #[source]
        source: Box<StoreError>,
    },

    #[error("gave up waiting for database locks after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    #[error("database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("{op} failed: {source}")]
    Database {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("serialization/deserialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Helper to annotate a database error with the operation that produced it.
/// Use with `.map_err(db("put identity"))?`.
#[inline]
pub(crate) fn db(op: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |source| StoreError::Database { op, source }
}
