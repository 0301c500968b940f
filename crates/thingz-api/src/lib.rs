// Client for the remote account service
pub mod auth;
pub mod models;
pub mod retry;

// Re-export common types
pub use auth::{AuthClient, AuthError, DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
pub use models::{LoginMethod, Session, User};
pub use retry::RetryConfig;
