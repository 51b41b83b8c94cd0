//! Peer connection engine seam
//!
//! Everything below SDP text (ICE, DTLS, SRTP, codecs) belongs to the engine.
//! The signaling core only drives the offer/answer steps through these traits,
//! which lets tests substitute a scripted engine for webrtc-rs.

mod rtc;

pub use rtc::WebRtcEngine;

use crate::config::IceServerConfig;
use crate::gathering::GatheringWait;
use crate::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Connection state reported by an engine session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Session created, no connectivity checks yet
    New,
    /// Connectivity checks in progress
    Checking,
    /// A working candidate pair was found
    Connected,
    /// Connectivity lost, may recover
    Disconnected,
    /// Connectivity checks failed; the session is unusable
    Failed,
    /// Session was shut down
    Closed,
}

impl ConnectionState {
    /// No further transitions are expected from this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::New => "new",
            ConnectionState::Checking => "checking",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Callback invoked on every connection state transition
pub type StateChangeHandler = Box<dyn Fn(ConnectionState) -> BoxFuture<'static, ()> + Send + Sync>;

/// Factory for isolated negotiation sessions
#[async_trait]
pub trait PeerEngine: Send + Sync {
    /// Create a new session using the given STUN/TURN servers
    async fn create_session(&self, ice_servers: &[IceServerConfig])
        -> Result<Arc<dyn EngineSession>>;
}

/// One peer connection owned by the engine
#[async_trait]
pub trait EngineSession: Send + Sync {
    /// Engine-unique session identifier
    fn id(&self) -> &str;

    /// Apply the remote offer
    async fn set_remote_offer(&self, sdp: String) -> Result<()>;

    /// Produce an answer to the applied offer
    async fn create_answer(&self) -> Result<String>;

    /// Apply the answer locally; starts ICE gathering
    async fn set_local_description(&self, sdp: String) -> Result<()>;

    /// One-shot handle resolved when ICE gathering completes
    ///
    /// Must be obtained before `set_local_description` so the completion
    /// cannot be missed.
    async fn gathering_complete(&self) -> GatheringWait;

    /// Register the connection state observer (replaces any previous one)
    fn on_connection_state_change(&self, handler: StateChangeHandler);

    /// Current local description, including gathered candidates
    async fn local_description(&self) -> Option<String>;

    /// Tear down the session and release engine resources
    async fn close(&self) -> Result<()>;
}
