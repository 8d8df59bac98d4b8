use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl BookingError {
    /// Returns the conflict reason if this is a `Conflict`.
    pub fn conflict_reason(&self) -> Option<&str> {
        match self {
            BookingError::Conflict(reason) => Some(reason),
            _ => None,
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
