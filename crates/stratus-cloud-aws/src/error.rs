//! AWS API error types

use stratus_cloud::CloudError;
use thiserror::Error;

/// Error returned by an API client call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Attach operation and identity, turning this into a reconciler error
    pub fn into_remote(self, operation: &str, identity: &str) -> CloudError {
        CloudError::remote(operation, identity, self)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
