//! Error handling for labops
//!
//! Centralized error types using thiserror. Every failure an operator task
//! can hit maps onto one of these variants, and the binary derives its exit
//! code from them: `UserAbort` exits 0, everything else exits 1.

use thiserror::Error;

/// Main error type for labops
#[derive(Error, Debug)]
pub enum OpsError {
    /// IO errors (file operations, reading confirmation input, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (missing/invalid environment options)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Neither key-based nor password-based authentication is usable
    #[error("Authentication selection error: {0}")]
    AuthSelection(String),

    /// A remote command exited non-zero
    #[error("Remote action failed: {0}")]
    RemoteAction(String),

    /// An upload/download (scp or cloud) exited non-zero or produced nothing
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// A post-action check did not confirm the expected state
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Operator declined the confirmation prompt (not an error outcome)
    #[error("Aborted by operator")]
    UserAbort,

    /// Pipeline state errors (invalid transition, step after terminal state)
    #[error("Pipeline state error: {0}")]
    State(String),
}

/// Result type alias for labops operations
pub type Result<T> = std::result::Result<T, OpsError>;

// Convenient error constructors
impl OpsError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a configuration error for a missing required environment variable
    pub fn missing_var(name: &str) -> Self {
        Self::Config(format!("missing required env var: {name}"))
    }

    /// Create an authentication selection error
    pub fn auth_selection(msg: impl Into<String>) -> Self {
        Self::AuthSelection(msg.into())
    }

    /// Create a remote action error
    pub fn remote_action(msg: impl Into<String>) -> Self {
        Self::RemoteAction(msg.into())
    }

    /// Create a transfer error
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    /// Create a verification error
    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }

    /// Create a pipeline state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}
