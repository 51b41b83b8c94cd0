//! Non-trickle offer/answer negotiation
//!
//! WHIP and WHEP allow a single signaling round trip, so the answer has to
//! carry every ICE candidate. `Negotiator::negotiate` drives one engine
//! session from remote offer to a fully gathered local answer.

use crate::config::SignalingConfig;
use crate::engine::{EngineSession, PeerEngine};
use crate::monitor::LifecycleMonitor;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a successful negotiation
pub struct NegotiatedSession {
    /// Engine session identifier
    pub session_id: String,

    /// Final answer SDP with all gathered candidates
    pub answer_sdp: String,

    /// Monitor that now owns the session
    pub monitor: Arc<LifecycleMonitor>,
}

/// Drives offer/answer exchanges against a peer engine
pub struct Negotiator {
    engine: Arc<dyn PeerEngine>,
    config: Arc<SignalingConfig>,
}

impl Negotiator {
    /// Create a negotiator sharing `config` with every session it creates
    pub fn new(engine: Arc<dyn PeerEngine>, config: Arc<SignalingConfig>) -> Self {
        Self { engine, config }
    }

    /// Negotiate a new session for `offer`
    ///
    /// Returns only once ICE gathering has completed. On any failure after
    /// the session was created it is closed before the error is returned;
    /// there is no retry and no partial answer.
    #[instrument(skip_all, fields(offer_len = offer.len()))]
    pub async fn negotiate(&self, offer: &str) -> Result<NegotiatedSession> {
        if offer.trim().is_empty() {
            return Err(Error::EmptyOffer);
        }

        let session = self.engine.create_session(&self.config.ice_servers).await?;
        let monitor = LifecycleMonitor::attach(Arc::clone(&session));
        let session_id = monitor.session_id().to_string();

        match self.exchange(session.as_ref(), offer).await {
            Ok(answer_sdp) => {
                info!(session_id = %session_id, "Negotiated session");
                Ok(NegotiatedSession {
                    session_id,
                    answer_sdp,
                    monitor,
                })
            }
            Err(e) => {
                warn!(session_id = %session_id, "Negotiation failed: {}", e);
                if let Err(close_err) = monitor.release().await {
                    warn!(session_id = %session_id, "Failed to close abandoned session: {}", close_err);
                }
                Err(e)
            }
        }
    }

    async fn exchange(&self, session: &dyn EngineSession, offer: &str) -> Result<String> {
        session.set_remote_offer(offer.to_string()).await?;

        // Taken before the local description starts gathering
        let gathered = session.gathering_complete().await;

        let answer = session.create_answer().await?;
        session.set_local_description(answer).await?;

        debug!(session_id = %session.id(), "Waiting for ICE gathering");
        gathered.wait(self.config.gathering_timeout()).await?;

        session
            .local_description()
            .await
            .ok_or(Error::MissingLocalDescription)
    }
}
