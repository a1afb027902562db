//! Shared primitives for all Rust crates in grantlens.

#![forbid(unsafe_code)]

/// Identity primitives shared across crates.
pub mod identity;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use identity::UserId;

/// Result type used across grantlens crates.
pub type AppResult<T> = Result<T, AppError>;

/// Identifier of one operator review session, attached to log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewSessionId(Uuid);

impl ReviewSessionId {
    /// Creates a random session identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReviewSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ReviewSessionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Invalid input or violated invariant. Never reaches the network.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An external call failed or returned an unusable response.
    #[error("network error: {0}")]
    Network(String),

    /// The remote service refused a remediation against the given target.
    #[error("remediation restricted: {0}")]
    RemediationRestricted(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the message carried by the error without its category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Network(message)
            | Self::RemediationRestricted(message)
            | Self::Internal(message) => message.as_str(),
        }
    }
}
