//! WHIP/WHEP HTTP signaling server
//!
//! Provides HTTP endpoints for session negotiation:
//! - POST /whip - Publish (ingest) offer, answered with 201 + SDP
//! - POST /whep - Subscribe (egress) offer, answered with 201 + SDP
//! - GET /health - Health check
//! - GET /* - Static files from the configured directory

use crate::config::SignalingConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::negotiation::Negotiator;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

/// Content type of offer and answer bodies
pub const SDP_CONTENT_TYPE: &str = "application/sdp";

/// Signaling endpoint kind
///
/// Both endpoints negotiate identically; only the `Location` they return
/// differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// WHIP ingest
    Publish,
    /// WHEP egress
    Subscribe,
}

impl Endpoint {
    /// Path served and echoed back in the `Location` header
    pub fn location(&self) -> &'static str {
        match self {
            Endpoint::Publish => "/whip",
            Endpoint::Subscribe => "/whep",
        }
    }
}

/// HTTP server state shared across handlers
#[derive(Clone)]
struct ServerState {
    negotiator: Arc<Negotiator>,
}

/// WHIP/WHEP signaling server
pub struct SignalingServer {
    config: Arc<SignalingConfig>,
    state: ServerState,
}

impl SignalingServer {
    /// Create a new signaling server
    ///
    /// # Arguments
    ///
    /// * `config` - Bind address, body limit and static directory
    /// * `negotiator` - Orchestrator shared by every request
    pub fn new(config: Arc<SignalingConfig>, negotiator: Arc<Negotiator>) -> Self {
        Self {
            config,
            state: ServerState { negotiator },
        }
    }

    /// Build the router with all endpoints
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_handler))
            .route(Endpoint::Publish.location(), post(whip_handler))
            .route(Endpoint::Subscribe.location(), post(whep_handler))
            .with_state(self.state.clone());

        let router = match &self.config.static_dir {
            Some(dir) => router.fallback_service(ServeDir::new(dir)),
            None => router,
        };

        router.layer(
            tower::ServiceBuilder::new()
                .layer(tower_http::trace::TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(self.config.max_offer_bytes)),
        )
    }

    /// Start the server on the configured address
    ///
    /// This method blocks until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the server on the configured address, stopping when `shutdown` resolves
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self
            .config
            .bind_address
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("Invalid bind address: {}", e)))?;

        let listener = TcpListener::bind(addr).await?;

        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting signaling server on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Signaling server stopped");
        Ok(())
    }
}

// Handler implementations

/// Health check endpoint
async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// Error response body for structured error responses
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error type (e.g., "input", "negotiation", "internal")
    error_type: String,
    /// Human-readable error message
    message: String,
}

/// Map signaling errors to HTTP status codes and structured responses
fn map_signaling_error(e: Error) -> (StatusCode, Json<ErrorResponse>) {
    let (status, error_type) = match (e.kind(), &e) {
        (ErrorKind::Input, _) => (StatusCode::BAD_REQUEST, "input"),
        (ErrorKind::Negotiation, Error::GatheringTimeout(_)) => {
            (StatusCode::GATEWAY_TIMEOUT, "negotiation")
        }
        (ErrorKind::Negotiation, _) => (StatusCode::INTERNAL_SERVER_ERROR, "negotiation"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };

    (
        status,
        Json(ErrorResponse {
            error_type: error_type.to_string(),
            message: e.to_string(),
        }),
    )
}

/// Read the request body as offer text
fn read_offer(body: &[u8]) -> Result<&str> {
    let offer = std::str::from_utf8(body)
        .map_err(|e| Error::InvalidOffer(format!("Body is not UTF-8: {}", e)))?;

    if offer.trim().is_empty() {
        return Err(Error::EmptyOffer);
    }

    Ok(offer)
}

/// POST /whip - Publish offer
async fn whip_handler(
    State(state): State<ServerState>,
    body: Bytes,
) -> std::result::Result<Response, (StatusCode, Json<ErrorResponse>)> {
    answer_offer(&state, Endpoint::Publish, &body).await
}

/// POST /whep - Subscribe offer
async fn whep_handler(
    State(state): State<ServerState>,
    body: Bytes,
) -> std::result::Result<Response, (StatusCode, Json<ErrorResponse>)> {
    answer_offer(&state, Endpoint::Subscribe, &body).await
}

/// Shared offer handling for both endpoints
///
/// Blocks for the whole ICE gathering; the 201 is only written once the
/// answer carries the complete candidate set.
async fn answer_offer(
    state: &ServerState,
    endpoint: Endpoint,
    body: &[u8],
) -> std::result::Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let offer = read_offer(body).map_err(|e| {
        warn!(endpoint = endpoint.location(), "Rejected offer: {}", e);
        map_signaling_error(e)
    })?;

    let negotiated = state.negotiator.negotiate(offer).await.map_err(|e| {
        error!(endpoint = endpoint.location(), "Negotiation failed: {}", e);
        map_signaling_error(e)
    })?;

    info!(
        endpoint = endpoint.location(),
        session_id = %negotiated.session_id,
        "Answer ready"
    );

    Ok((
        StatusCode::CREATED,
        [
            (header::LOCATION, endpoint.location()),
            (header::CONTENT_TYPE, SDP_CONTENT_TYPE),
        ],
        negotiated.answer_sdp,
    )
        .into_response())
}
