//! Error types for the dyn agent
//!
//! Errors fall into three groups with different lifetimes:
//! - configuration errors are fatal at startup
//! - resolution errors end a tick (or the loop, depending on policy)
//! - provider errors end a tick; the next tick retries

use thiserror::Error;

/// Result type alias for dyn operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the dyn agent
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Public IP discovery failed
    #[error("Public IP resolution failed: {0}")]
    Resolution(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Authentication against the provider API failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The provider rejected the request because of rate limiting
    #[error("Rate limited: {0}")]
    RateLimited(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Whether this error came from public IP discovery
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }

    /// Whether this error came from the DNS provider API
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::Authentication(_) | Self::RateLimited(_)
        )
    }
}
