use thiserror::Error;

use crate::peer_connection::ConnectionId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// ErrConnectionClosed indicates an operation executed after connection
    /// has already been closed.
    #[error("connection closed")]
    ErrConnectionClosed,

    /// ErrConnectionIdInUse indicates that a connection was registered under
    /// an id that already belongs to a live connection.
    #[error("connection id {0} is already registered")]
    ErrConnectionIdInUse(ConnectionId),

    /// ErrConnectionNotFound indicates that an event was routed to an id with
    /// no registered connection.
    #[error("no connection registered with id {0}")]
    ErrConnectionNotFound(ConnectionId),

    /// ErrNoExternalPeerConnection indicates that an API was built without
    /// the external implementation to forward to.
    #[error("no external peer connection implementation configured")]
    ErrNoExternalPeerConnection,

    /// ErrExternal carries a rejection reported by the external connection
    /// implementation.
    #[error("external peer connection: {0}")]
    ErrExternal(String),

    /// ErrTaskAborted indicates that a queued operation panicked or was
    /// cancelled by the runtime before it could report its outcome.
    #[error("task aborted: {0}")]
    ErrTaskAborted(String),

    /// ErrEventHandler wraps a failure reported by an event handler.
    #[error("event handler: {0}")]
    ErrEventHandler(String),

    /// ErrInvalidEventPayload indicates that a reserved event carried a
    /// payload of the wrong shape.
    #[error("invalid payload for event {0}")]
    ErrInvalidEventPayload(String),

    #[error("json: {0}")]
    Json(String),

    #[allow(non_camel_case_types)]
    #[error("{0}")]
    new(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::ErrTaskAborted(e.to_string())
    }
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.into().to_string()).collect();
        Err(Error::new(errs_strs.join("\n")))
    }
}
