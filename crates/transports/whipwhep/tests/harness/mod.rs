//! Signaling test harness
//!
//! Provides a scriptable in-process `PeerEngine` so negotiation and HTTP
//! behavior can be tested without real ICE:
//! - Step-level failure injection
//! - Immediate, manual or never-completing ICE gathering
//! - Connection state injection and close counting
//!
//! Basic usage pattern:
//!
//! 1. Create a `MockEngine` with a `GatheringMode`
//! 2. Build a `Negotiator` (or `test_router`) on top of it
//! 3. Drive offers through it and inspect `engine.sessions()`

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use whipwhep::{
    gathering_channel, ConnectionState, EngineSession, Error, GatheringSignal, GatheringWait,
    IceServerConfig, Negotiator, PeerEngine, Result, SignalingConfig, SignalingServer,
    StateChangeHandler,
};

/// Minimal offer accepted by the mock engine
pub const TEST_OFFER: &str = "v=0\r\n\
o=- 4215775240449105457 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
c=IN IP4 0.0.0.0\r\n\
a=ice-ufrag:offerufrag\r\n\
a=ice-pwd:offerpasswordofferpassword\r\n\
a=fingerprint:sha-256 00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF:00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF\r\n\
a=setup:actpass\r\n\
a=mid:0\r\n\
a=sctp-port:5000\r\n";

/// Engine step at which a failure is injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailStep {
    CreateSession,
    RemoteDescription,
    CreateAnswer,
    LocalDescription,
}

/// How ICE gathering completes for mock sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatheringMode {
    /// Completes inside `set_local_description`, before anyone waits
    Immediate,
    /// Completes only when the test calls `MockSession::complete_gathering`
    Manual,
    /// Never completes
    Never,
}

/// Scriptable peer engine
pub struct MockEngine {
    gathering: GatheringMode,
    fail_at: Option<FailStep>,
    sessions: Mutex<Vec<Arc<MockSession>>>,
    created: AtomicUsize,
    seen_ice_servers: Mutex<Vec<Vec<IceServerConfig>>>,
}

impl MockEngine {
    pub fn new(gathering: GatheringMode) -> Arc<Self> {
        Arc::new(Self {
            gathering,
            fail_at: None,
            sessions: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
            seen_ice_servers: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_at(step: FailStep) -> Arc<Self> {
        Arc::new(Self {
            gathering: GatheringMode::Immediate,
            fail_at: Some(step),
            sessions: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
            seen_ice_servers: Mutex::new(Vec::new()),
        })
    }

    /// Number of `create_session` calls, including failed ones
    pub fn create_calls(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().clone()
    }

    pub fn seen_ice_servers(&self) -> Vec<Vec<IceServerConfig>> {
        self.seen_ice_servers.lock().clone()
    }

    /// Wait until `count` sessions have started gathering
    pub async fn wait_for_gathering(&self, count: usize) -> Vec<Arc<MockSession>> {
        for _ in 0..400 {
            let sessions = self.sessions();
            let started: Vec<_> = sessions
                .into_iter()
                .filter(|session| session.gathering_started())
                .collect();
            if started.len() >= count {
                return started;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {} sessions to start gathering", count);
    }
}

#[async_trait]
impl PeerEngine for MockEngine {
    async fn create_session(
        &self,
        ice_servers: &[IceServerConfig],
    ) -> Result<Arc<dyn EngineSession>> {
        let index = self.created.fetch_add(1, Ordering::SeqCst);
        self.seen_ice_servers.lock().push(ice_servers.to_vec());

        if self.fail_at == Some(FailStep::CreateSession) {
            return Err(Error::SessionCreation("injected failure".to_string()));
        }

        let session = Arc::new(MockSession::new(
            format!("mock-session-{}", index),
            self.gathering,
            self.fail_at,
        ));
        self.sessions.lock().push(Arc::clone(&session));
        Ok(session)
    }
}

/// Session produced by `MockEngine`
pub struct MockSession {
    id: String,
    gathering: GatheringMode,
    fail_at: Option<FailStep>,
    remote_offer: Mutex<Option<String>>,
    handler_before_offer: Mutex<Option<bool>>,
    local: Mutex<Option<String>>,
    signal: Mutex<Option<GatheringSignal>>,
    gathering_started: Mutex<bool>,
    handler: Mutex<Option<StateChangeHandler>>,
    closes: AtomicUsize,
}

impl MockSession {
    fn new(id: String, gathering: GatheringMode, fail_at: Option<FailStep>) -> Self {
        Self {
            id,
            gathering,
            fail_at,
            remote_offer: Mutex::new(None),
            handler_before_offer: Mutex::new(None),
            local: Mutex::new(None),
            signal: Mutex::new(None),
            gathering_started: Mutex::new(false),
            handler: Mutex::new(None),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn remote_offer(&self) -> Option<String> {
        self.remote_offer.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn gathering_started(&self) -> bool {
        *self.gathering_started.lock()
    }

    pub fn has_state_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Whether a state observer was registered when the remote offer arrived
    pub fn handler_registered_before_offer(&self) -> Option<bool> {
        *self.handler_before_offer.lock()
    }

    /// Append the gathered candidate and fire the completion signal
    pub fn complete_gathering(&self) {
        if let Some(local) = self.local.lock().as_mut() {
            if !local.contains("a=candidate") {
                local.push_str(&format!(
                    "a=candidate:1 1 udp 2130706431 127.0.0.1 {} typ host\r\n\
                     a=end-of-candidates\r\n",
                    candidate_port(&self.id)
                ));
            }
        }

        if let Some(signal) = self.signal.lock().as_ref() {
            signal.complete();
        }
    }

    /// Deliver a connection state change to the registered observer
    pub async fn emit_state(&self, state: ConnectionState) {
        let fut = self.handler.lock().as_ref().map(|handler| handler(state));
        if let Some(fut) = fut {
            fut.await;
        }
    }
}

fn candidate_port(id: &str) -> u32 {
    let index: u32 = id.rsplit('-').next().and_then(|n| n.parse().ok()).unwrap_or(0);
    50_000 + index
}

#[async_trait]
impl EngineSession for MockSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_remote_offer(&self, sdp: String) -> Result<()> {
        let registered = self.has_state_handler();
        *self.handler_before_offer.lock() = Some(registered);

        if self.fail_at == Some(FailStep::RemoteDescription) {
            return Err(Error::RemoteDescription("injected failure".to_string()));
        }
        *self.remote_offer.lock() = Some(sdp);
        Ok(())
    }

    async fn create_answer(&self) -> Result<String> {
        if self.fail_at == Some(FailStep::CreateAnswer) {
            return Err(Error::AnswerCreation("injected failure".to_string()));
        }
        Ok(format!(
            "v=0\r\n\
             o=- {id} 2 IN IP4 127.0.0.1\r\n\
             s=-\r\n\
             t=0 0\r\n\
             a=group:BUNDLE 0\r\n\
             m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
             c=IN IP4 0.0.0.0\r\n\
             a=ice-ufrag:{id}\r\n\
             a=ice-pwd:{id}-password\r\n\
             a=setup:active\r\n\
             a=mid:0\r\n\
             a=sctp-port:5000\r\n",
            id = self.id
        ))
    }

    async fn set_local_description(&self, sdp: String) -> Result<()> {
        if self.fail_at == Some(FailStep::LocalDescription) {
            return Err(Error::LocalDescription("injected failure".to_string()));
        }
        *self.local.lock() = Some(sdp);
        *self.gathering_started.lock() = true;

        if self.gathering == GatheringMode::Immediate {
            self.complete_gathering();
        }
        Ok(())
    }

    async fn gathering_complete(&self) -> GatheringWait {
        let (signal, wait) = gathering_channel();
        *self.signal.lock() = Some(signal);
        wait
    }

    fn on_connection_state_change(&self, handler: StateChangeHandler) {
        *self.handler.lock() = Some(handler);
    }

    async fn local_description(&self) -> Option<String> {
        self.local.lock().clone()
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Configuration for mock-backed tests: no static files, short gathering bound
pub fn test_config() -> SignalingConfig {
    SignalingConfig::default()
        .with_bind_address("127.0.0.1:0")
        .with_static_dir(None)
        .with_gathering_timeout(Some(Duration::from_secs(5)))
}

pub fn test_negotiator(engine: Arc<MockEngine>, config: SignalingConfig) -> Negotiator {
    Negotiator::new(engine, Arc::new(config))
}

pub fn test_router(engine: Arc<MockEngine>, config: SignalingConfig) -> axum::Router {
    let config = Arc::new(config);
    let negotiator = Arc::new(Negotiator::new(engine, Arc::clone(&config)));
    SignalingServer::new(config, negotiator).router()
}

/// Initialize test logging once
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
