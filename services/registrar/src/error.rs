//! Registrar error types.

use pidreg_id::{IdError, RecordId, ResourceId, Scheme};
use thiserror::Error;

use crate::connector::ConnectorError;
use crate::status::IllegalTransition;
use crate::store::StoreError;

/// Errors surfaced by registrar operations.
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] IdError),

    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("identifier record not found: {0}")]
    NotFound(RecordId),

    #[error("no identifier with value {0}")]
    UnknownValue(String),

    #[error("resource not found: {0}")]
    ResourceMissing(ResourceId),

    #[error("no connector configured for scheme {0}")]
    NoConnector(Scheme),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("resource directory error: {0}")]
    Directory(#[source] anyhow::Error),

    #[error("registration queue is full")]
    QueueFull,

    #[error("registration worker has stopped")]
    WorkerStopped,
}

impl From<ConnectorError> for RegistrarError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::Unreachable(message) => Self::Unreachable(message),
            ConnectorError::Rejected { status, message } => Self::Rejected { status, message },
            ConnectorError::MalformedValue(e) => Self::MalformedIdentifier(e),
        }
    }
}

impl RegistrarError {
    /// True when retrying later may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_)
                | Self::Directory(_)
                | Self::Store(StoreError::VersionConflict { .. })
        )
    }
}

/// Result type for registrar operations.
pub type RegistrarResult<T> = Result<T, RegistrarError>;
