//! webrtc-rs backed engine

use super::{ConnectionState, EngineSession, PeerEngine, StateChangeHandler};
use crate::config::{IceServerConfig, SignalingConfig};
use crate::gathering::{gathering_channel, GatheringWait};
use crate::{Error, Result};
use anyhow::Context;
use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

/// Engine creating webrtc-rs peer connections
///
/// The `API` (codecs, interceptors, settings) is built once and shared;
/// webrtc-rs copies the media engine into every peer connection, so sessions
/// do not see each other's negotiated codecs.
pub struct WebRtcEngine {
    api: API,
}

impl WebRtcEngine {
    /// Build the engine from signaling configuration
    pub fn new(config: &SignalingConfig) -> Result<Self> {
        let mut media_engine = MediaEngine::default();

        // Opus, G722, PCMU/PCMA, VP8, VP9, H.264
        media_engine
            .register_default_codecs()
            .context("Failed to register default codecs")?;

        let interceptor_registry =
            register_default_interceptors(Default::default(), &mut media_engine)
                .context("Failed to register default interceptors")?;

        let mut setting_engine = SettingEngine::default();
        setting_engine.set_include_loopback_candidate(config.include_loopback_candidates);

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .with_setting_engine(setting_engine)
            .build();

        Ok(Self { api })
    }
}

fn rtc_ice_servers(ice_servers: &[IceServerConfig]) -> Vec<RTCIceServer> {
    ice_servers
        .iter()
        .map(|server| {
            #[allow(clippy::needless_update)]
            RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            }
        })
        .collect()
}

fn map_ice_state(state: RTCIceConnectionState) -> Option<ConnectionState> {
    match state {
        RTCIceConnectionState::New => Some(ConnectionState::New),
        RTCIceConnectionState::Checking => Some(ConnectionState::Checking),
        RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => {
            Some(ConnectionState::Connected)
        }
        RTCIceConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCIceConnectionState::Failed => Some(ConnectionState::Failed),
        RTCIceConnectionState::Closed => Some(ConnectionState::Closed),
        _ => None,
    }
}

#[async_trait]
impl PeerEngine for WebRtcEngine {
    #[instrument(skip_all, fields(ice_servers = ice_servers.len()))]
    async fn create_session(
        &self,
        ice_servers: &[IceServerConfig],
    ) -> Result<Arc<dyn EngineSession>> {
        let rtc_config = RTCConfiguration {
            ice_servers: rtc_ice_servers(ice_servers),
            ..Default::default()
        };

        let peer_connection = self
            .api
            .new_peer_connection(rtc_config)
            .await
            .map_err(|e| Error::SessionCreation(e.to_string()))?;

        let session = WebRtcSession {
            id: uuid::Uuid::new_v4().to_string(),
            peer_connection: Arc::new(peer_connection),
            gather_task: Mutex::new(None),
        };

        info!(session_id = %session.id, "Created peer connection");

        Ok(Arc::new(session))
    }
}

/// A single webrtc-rs peer connection
pub struct WebRtcSession {
    id: String,
    peer_connection: Arc<RTCPeerConnection>,
    /// Bridges `gathering_complete_promise` into the session's `GatheringSignal`
    gather_task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl EngineSession for WebRtcSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_remote_offer(&self, sdp: String) -> Result<()> {
        let offer = RTCSessionDescription::offer(sdp)
            .map_err(|e| Error::RemoteDescription(format!("Invalid offer SDP: {}", e)))?;

        self.peer_connection
            .set_remote_description(offer)
            .await
            .map_err(|e| Error::RemoteDescription(e.to_string()))
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(|e| Error::AnswerCreation(e.to_string()))?;

        Ok(answer.sdp)
    }

    async fn set_local_description(&self, sdp: String) -> Result<()> {
        let answer = RTCSessionDescription::answer(sdp)
            .map_err(|e| Error::LocalDescription(format!("Invalid answer SDP: {}", e)))?;

        self.peer_connection
            .set_local_description(answer)
            .await
            .map_err(|e| Error::LocalDescription(e.to_string()))
    }

    async fn gathering_complete(&self) -> GatheringWait {
        let (signal, wait) = gathering_channel();
        let mut promise = self.peer_connection.gathering_complete_promise().await;
        let session_id = self.id.clone();

        let task = tokio::spawn(async move {
            // The promise resolves by dropping its sender
            let _ = promise.recv().await;
            debug!(session_id = %session_id, "ICE gathering complete");
            signal.complete();
        });

        if let Some(previous) = self.gather_task.lock().replace(task) {
            previous.abort();
        }

        wait
    }

    fn on_connection_state_change(&self, handler: StateChangeHandler) {
        self.peer_connection
            .on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
                let fut: BoxFuture<'static, ()> = match map_ice_state(state) {
                    Some(state) => handler(state),
                    None => Box::pin(async {}),
                };
                fut
            }));
    }

    async fn local_description(&self) -> Option<String> {
        self.peer_connection
            .local_description()
            .await
            .map(|desc| desc.sdp)
    }

    async fn close(&self) -> Result<()> {
        if let Some(task) = self.gather_task.lock().take() {
            task.abort();
        }

        self.peer_connection
            .close()
            .await
            .map_err(|e| Error::Transport(format!("Failed to close peer connection: {}", e)))
    }
}
