//! WHIP/WHEP signaling for WebRTC
//!
//! This crate implements the signaling half of the WebRTC-HTTP Ingestion
//! (WHIP) and Egress (WHEP) protocols: an SDP offer arrives in an HTTP POST,
//! a peer connection is created for it, ICE candidates are gathered up front
//! (non-trickle) and the complete answer is returned in the response.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  WHIP publisher / WHEP player (browser, OBS, ...)      │
//! │  ↓ POST /whip | /whep  (SDP offer)                     │
//! │  SignalingServer (axum)                                │
//! │  └─ Negotiator                                         │
//! │     ├─ PeerEngine::create_session (webrtc-rs)          │
//! │     ├─ GatheringWait (blocks until gathering is done)  │
//! │     └─ LifecycleMonitor (logs states, closes on fail)  │
//! │  ↑ 201 Created, Location, SDP answer with candidates   │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use whipwhep::{IceServerConfig, SignalingConfig};
//!
//! let config = SignalingConfig {
//!     bind_address: "127.0.0.1:8080".to_string(),
//!     ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
//!     ..Default::default()
//! };
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Async Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use whipwhep::{Negotiator, SignalingConfig, SignalingServer, WebRtcEngine};
//!
//! # async fn example() -> whipwhep::Result<()> {
//! let config = Arc::new(SignalingConfig::default());
//! let engine = Arc::new(WebRtcEngine::new(&config)?);
//! let negotiator = Arc::new(Negotiator::new(engine, Arc::clone(&config)));
//!
//! SignalingServer::new(config, negotiator).serve().await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod gathering;
pub mod monitor;
pub mod negotiation;
pub mod server;

pub use config::{IceServerConfig, SignalingConfig};
pub use engine::{ConnectionState, EngineSession, PeerEngine, StateChangeHandler, WebRtcEngine};
pub use error::{Error, ErrorKind, Result};
pub use gathering::{gathering_channel, GatheringSignal, GatheringWait};
pub use monitor::LifecycleMonitor;
pub use negotiation::{NegotiatedSession, Negotiator};
pub use server::{Endpoint, SignalingServer, SDP_CONTENT_TYPE};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
    }
}
