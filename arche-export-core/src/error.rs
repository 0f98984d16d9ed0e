//! Error taxonomy of an export run.
//!
//! [`BuildError`]s are input errors: they are raised while the graphs are built or
//! the payloads are checked, always before the first repository call.
//! [`RepositoryError`]s come out of the transaction protocol. Neither kind is
//! retried; the run stops at the first one.

use std::path::PathBuf;

use thiserror::Error;

use crate::contract::TransportError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing required field '{field}' on {node}")]
    MissingField { field: &'static str, node: String },

    #[error("missing mandatory folder '{0}'")]
    MissingFolder(String),

    #[error("invalid identifier segment {0:?}")]
    InvalidSegment(String),

    #[error("identifier {0} is produced by more than one resource")]
    DuplicateIdentifier(String),

    #[error("file path {} has no usable file name", .0.display())]
    InvalidPath(PathBuf),

    #[error("payload {} is not readable: {source}", path.display())]
    UnreadablePayload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(
        "repository reported a conflict for {identifier} but no resource with that identifier was found"
    )]
    UnresolvedConflict { identifier: String },

    #[error("not authorized to update the resource {uri} (HTTP {status})")]
    Permission { uri: String, status: u16 },

    #[error("resource doesn't exist or has been deleted: {uri} (HTTP {status})")]
    MissingResource { uri: String, status: u16 },

    #[error("repository call {target} failed with HTTP {status}: {body}")]
    Protocol {
        target: String,
        status: u16,
        body: String,
    },

    #[error("repository call {target} could not be sent: {source}")]
    Transport {
        target: String,
        #[source]
        source: TransportError,
    },

    #[error("malformed repository response from {target}: {reason}")]
    MalformedResponse { target: String, reason: String },

    #[error("transaction is {state}, no further calls are allowed")]
    Inactive { state: &'static str },

    #[error("failed to serialise graph {identifier}: {source}")]
    Serialisation {
        identifier: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read payload {} for {uri}: {source}", path.display())]
    Payload {
        uri: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepositoryError {
    /// Map a non-success status of a call against `target` onto the taxonomy.
    pub fn from_status(target: &str, status: u16, body: String) -> Self {
        match status {
            401 | 403 => RepositoryError::Permission {
                uri: target.to_string(),
                status,
            },
            404 | 410 => RepositoryError::MissingResource {
                uri: target.to_string(),
                status,
            },
            _ => RepositoryError::Protocol {
                target: target.to_string(),
                status,
                body,
            },
        }
    }

    /// HTTP status behind the error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            RepositoryError::Permission { status, .. }
            | RepositoryError::MissingResource { status, .. }
            | RepositoryError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal error of [`crate::synchronise::export`].
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ExportError {
    /// Input errors abort the run before any network call.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ExportError::Build(_))
    }
}
