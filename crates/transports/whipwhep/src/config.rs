//! Configuration types for WHIP/WHEP signaling

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const ICE_URL_SCHEMES: [&str; 4] = ["stun:", "stuns:", "turn:", "turns:"];

/// Main configuration for the signaling server
///
/// Built once at startup and shared read-only (behind an `Arc`) by every
/// negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingConfig {
    /// HTTP bind address (default: 0.0.0.0:8080)
    pub bind_address: String,

    /// STUN/TURN servers handed to every new session
    pub ice_servers: Vec<IceServerConfig>,

    /// Upper bound on ICE gathering per request, in milliseconds
    /// (default: 10000, `None` waits indefinitely)
    pub gathering_timeout_ms: Option<u64>,

    /// Directory served for non-signaling GET requests (default: ".")
    pub static_dir: Option<PathBuf>,

    /// Maximum accepted offer size in bytes (default: 64 KiB)
    pub max_offer_bytes: usize,

    /// Gather candidates on loopback interfaces (default: false)
    pub include_loopback_candidates: bool,
}

/// A single STUN or TURN server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    /// Server URLs (stun:, stuns:, turn: or turns:)
    pub urls: Vec<String>,

    /// Username for TURN authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Credential for TURN authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    /// STUN server without credentials
    pub fn stun(url: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: None,
            credential: None,
        }
    }

    /// TURN server with long-term credentials
    pub fn turn(url: &str, username: &str, credential: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: Some(username.to_string()),
            credential: Some(credential.to_string()),
        }
    }

    /// Whether any URL points at a TURN relay
    pub fn is_turn(&self) -> bool {
        self.urls
            .iter()
            .any(|url| url.starts_with("turn:") || url.starts_with("turns:"))
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
            gathering_timeout_ms: Some(10_000),
            static_dir: Some(PathBuf::from(".")),
            max_offer_bytes: 64 * 1024,
            include_loopback_candidates: false,
        }
    }
}

impl SignalingConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `bind_address` is not a socket address
    /// - an ICE server has no URLs or a URL with an unknown scheme
    /// - a TURN server lacks username or credential
    /// - `max_offer_bytes` is zero
    /// - `gathering_timeout_ms` is `Some(0)`
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if self.bind_address.parse::<SocketAddr>().is_err() {
            return Err(Error::InvalidConfig(format!(
                "bind_address must be a socket address, got {}",
                self.bind_address
            )));
        }

        for server in &self.ice_servers {
            if server.urls.is_empty() {
                return Err(Error::InvalidConfig(
                    "ICE server entry has no URLs".to_string(),
                ));
            }

            if let Some(url) = server
                .urls
                .iter()
                .find(|url| !ICE_URL_SCHEMES.iter().any(|scheme| url.starts_with(scheme)))
            {
                return Err(Error::InvalidConfig(format!(
                    "ICE server URL must start with stun:, stuns:, turn: or turns:, got {}",
                    url
                )));
            }

            if server.is_turn() && (server.username.is_none() || server.credential.is_none()) {
                return Err(Error::InvalidConfig(format!(
                    "TURN server {} requires username and credential",
                    server.urls[0]
                )));
            }
        }

        if self.max_offer_bytes == 0 {
            return Err(Error::InvalidConfig(
                "max_offer_bytes must be greater than 0".to_string(),
            ));
        }

        if self.gathering_timeout_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "gathering_timeout_ms must be greater than 0 (use None to disable)".to_string(),
            ));
        }

        Ok(())
    }

    /// Gathering bound as a `Duration`
    pub fn gathering_timeout(&self) -> Option<Duration> {
        self.gathering_timeout_ms.map(Duration::from_millis)
    }

    /// Replace the ICE server list
    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    /// Set the gathering bound (`None` waits indefinitely)
    ///
    /// Rounded up to whole milliseconds; any non-zero bound stays non-zero.
    pub fn with_gathering_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.gathering_timeout_ms = timeout.map(|t| {
            let millis = t.as_nanos().div_ceil(1_000_000);
            u64::try_from(millis).unwrap_or(u64::MAX)
        });
        self
    }

    /// Set the static file directory (`None` disables static serving)
    pub fn with_static_dir(mut self, static_dir: Option<PathBuf>) -> Self {
        self.static_dir = static_dir;
        self
    }

    /// Set the HTTP bind address
    pub fn with_bind_address(mut self, bind_address: &str) -> Self {
        self.bind_address = bind_address.to_string();
        self
    }

    /// Enable or disable loopback candidates
    pub fn with_loopback_candidates(mut self, include: bool) -> Self {
        self.include_loopback_candidates = include;
        self
    }
}
