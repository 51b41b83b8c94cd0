//! Connection lifecycle monitoring
//!
//! Once an answer has been sent the HTTP exchange is over, so nothing else
//! holds on to the session. The monitor owns it from then on, logs every
//! connection state transition and closes it when the transport fails.

use crate::engine::{ConnectionState, EngineSession};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-session observer of connection state changes
///
/// The session's state handler keeps the monitor alive and the monitor keeps
/// the session; releasing the session breaks that cycle.
pub struct LifecycleMonitor {
    session_id: String,
    session: Mutex<Option<Arc<dyn EngineSession>>>,
    state: Mutex<ConnectionState>,
}

impl LifecycleMonitor {
    /// Take ownership of `session` and register for its state changes
    pub fn attach(session: Arc<dyn EngineSession>) -> Arc<Self> {
        let monitor = Arc::new(Self {
            session_id: session.id().to_string(),
            session: Mutex::new(Some(Arc::clone(&session))),
            state: Mutex::new(ConnectionState::New),
        });

        let observer = Arc::clone(&monitor);
        session.on_connection_state_change(Box::new(move |state| {
            let observer = Arc::clone(&observer);
            Box::pin(async move { observer.handle_state_change(state).await })
        }));

        monitor
    }

    /// Identifier of the observed session
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Last observed connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Whether the session has been closed or handed back
    pub fn is_released(&self) -> bool {
        self.session.lock().is_none()
    }

    /// Record a transition; closes the session on `Failed`
    pub async fn handle_state_change(&self, state: ConnectionState) {
        *self.state.lock() = state;

        info!(
            session_id = %self.session_id,
            state = %state,
            "Connection state has changed"
        );

        if !state.is_terminal() {
            return;
        }

        if state == ConnectionState::Failed {
            if let Err(e) = self.release().await {
                warn!(session_id = %self.session_id, "Failed to close session: {}", e);
            }
        } else {
            // Already torn down by the engine; drop our handle without closing again
            self.session.lock().take();
        }
    }

    /// Close the session if it is still held
    ///
    /// Returns `Ok(true)` if this call closed it, `Ok(false)` if it had
    /// already been released.
    pub async fn release(&self) -> Result<bool> {
        let session = self.session.lock().take();

        match session {
            Some(session) => {
                info!(session_id = %self.session_id, "Closing session");
                session.close().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
