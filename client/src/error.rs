use thiserror::Error;

use hexmap_shared::{ApiError, Role, WireError};

/// Errors surfaced by the client side of a campaign connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The server (or the transport in front of it) rejected a request
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A pushed frame could not be decoded
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The replica's role does not allow this operation
    #[error("A {role} replica cannot {action}")]
    Capability { role: Role, action: &'static str },
}

impl ClientError {
    pub fn capability(role: Role, action: &'static str) -> Self {
        Self::Capability { role, action }
    }

    /// The underlying request error, if any
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(err) => Some(err),
            _ => None,
        }
    }
}
