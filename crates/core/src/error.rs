//! Error types for the DermaChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all DermaChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Upstream service errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failure of one of the hosted services (embedding, vector index, generation).
///
/// Always fatal to the current turn; nothing is retried.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to the matching variant.
    ///
    /// Shared by every HTTP-backed service so they classify failures alike.
    pub fn from_status(status_code: u16, body: String) -> Self {
        match status_code {
            429 => ProviderError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => ProviderError::ApiError {
                status_code,
                message: body,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session {0} is already processing a submission")]
    Busy(String),
}
