use thiserror::Error;

/// Failures raised by the query builder, the reading services and the stores.
///
/// The HTTP adapter maps each variant to a status code in `api::errors`.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or out-of-domain input.
    #[error("{0}")]
    Validation(String),

    /// No record matches the requested id.
    #[error("{0}")]
    NotFound(String),

    /// Missing or unparsable date bounds.
    #[error("{0}")]
    InvalidRange(String),

    /// Request body over the configured size limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
