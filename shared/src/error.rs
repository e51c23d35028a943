use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ParseTileKeyError, WireError};

/// Request-level failures returned by the mutation handlers and surfaced on
/// the client. Serializable so it can travel in a response body.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ApiError {
    /// Malformed input, rejected before anything was written
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Wrong role or wrong campaign for this request
    #[error("Not authorized: {message}")]
    Authorization { message: String },

    /// The addressed campaign, marker or session does not exist
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },

    /// Stored state moved on since the caller last looked; resynchronize
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The request never got an answer
    #[error("Transport failure: {message}")]
    Transport { message: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// HTTP-style status code for this error
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 400,
            ApiError::Authorization { .. } => 403,
            ApiError::NotFound { .. } => 404,
            ApiError::Conflict { .. } => 409,
            ApiError::Transport { .. } => 503,
        }
    }

    /// A transport failure may succeed when sent again unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }

    /// The caller's view is stale and should be refetched
    pub fn requires_resync(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}

impl From<ParseTileKeyError> for ApiError {
    fn from(err: ParseTileKeyError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<WireError> for ApiError {
    fn from(err: WireError) -> Self {
        ApiError::validation(err.to_string())
    }
}
