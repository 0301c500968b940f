use thiserror::Error;

/// All the ways the inventory core can fail
///
/// Missing optional data (no container, unopened cosmetics) is never an
/// error; those paths return neutral results instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage operation failed: {0}")]
    StorageError(String),

    #[error("Notification service error: {0}")]
    NotificationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    AuthError(#[from] thingz_api::AuthError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
