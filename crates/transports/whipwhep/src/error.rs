//! Error types for WHIP/WHEP signaling

use std::time::Duration;

/// Result type alias using signaling Error
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of a signaling failure
///
/// The HTTP dispatcher maps each kind to a status code; the lifecycle
/// monitor only ever sees `Transport` failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is unusable (empty or non-text offer)
    Input,
    /// The engine refused or could not finish offer/answer negotiation
    Negotiation,
    /// Failure of an established session's transport
    Transport,
    /// Invalid configuration
    Config,
    /// Anything else
    Internal,
}

/// Errors that can occur while negotiating a WHIP/WHEP session
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request body carried no offer
    #[error("Empty SDP offer")]
    EmptyOffer,

    /// Request body could not be read as SDP text
    #[error("Invalid SDP offer: {0}")]
    InvalidOffer(String),

    /// Engine could not create a peer connection
    #[error("Failed to create session: {0}")]
    SessionCreation(String),

    /// Engine rejected the remote offer
    #[error("Failed to set remote description: {0}")]
    RemoteDescription(String),

    /// Engine could not produce an answer
    #[error("Failed to create answer: {0}")]
    AnswerCreation(String),

    /// Engine rejected the local answer
    #[error("Failed to set local description: {0}")]
    LocalDescription(String),

    /// No local description after gathering finished
    #[error("No local description after ICE gathering")]
    MissingLocalDescription,

    /// ICE gathering did not finish within the configured bound
    #[error("ICE gathering did not complete within {0:?}")]
    GatheringTimeout(Duration),

    /// Engine dropped the gathering notification without firing it
    #[error("ICE gathering aborted before completion")]
    GatheringAborted,

    /// Session transport error (close, teardown)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyOffer | Error::InvalidOffer(_) => ErrorKind::Input,
            Error::SessionCreation(_)
            | Error::RemoteDescription(_)
            | Error::AnswerCreation(_)
            | Error::LocalDescription(_)
            | Error::MissingLocalDescription
            | Error::GatheringTimeout(_)
            | Error::GatheringAborted => ErrorKind::Negotiation,
            Error::Transport(_) => ErrorKind::Transport,
            Error::InvalidConfig(_) => ErrorKind::Config,
            Error::Io(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error was caused by the request input
    pub fn is_input_error(&self) -> bool {
        self.kind() == ErrorKind::Input
    }

    /// Check if this error happened during offer/answer negotiation
    pub fn is_negotiation_error(&self) -> bool {
        self.kind() == ErrorKind::Negotiation
    }
}
