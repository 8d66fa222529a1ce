//! Errors returned by the ARM client layer

use stratus_core::provider::{ErrorKind, ProviderError};
use thiserror::Error;

/// Errors that can occur when talking to Azure Resource Manager
#[derive(Debug, Error)]
pub enum ArmError {
    /// The resource does not exist (HTTP 404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other non-success response
    #[error("Unexpected status {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected model
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Token acquisition failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A URL could not be built from the resource ID
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ArmError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArmError::NotFound(_))
    }

    /// Wrap into the provider taxonomy, keeping `self` as the cause
    pub fn into_provider(self, message: impl Into<String>) -> ProviderError {
        let kind = match &self {
            ArmError::NotFound(_) => ErrorKind::NotFound,
            ArmError::Decode(_) => ErrorKind::MalformedResponse,
            ArmError::Auth(_) => ErrorKind::Configuration,
            _ => ErrorKind::Api,
        };
        ProviderError::new(kind, message).with_cause(self)
    }
}

/// Result type for ARM calls
pub type ArmResult<T> = Result<T, ArmError>;
