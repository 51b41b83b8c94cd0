//! WHIP/WHEP signaling server binary entry point
//!
//! Accepts SDP offers on `/whip` (publish) and `/whep` (subscribe), gathers
//! all ICE candidates and answers with `201 Created`.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (0.0.0.0:8080, Google STUN, serve ./ for other GETs)
//! cargo run -p whipwhep-server
//!
//! # Custom STUN/TURN servers
//! cargo run -p whipwhep-server -- \
//!   --ice-servers stun:stun.l.google.com:19302,turn:turn.example.com:3478 \
//!   --turn-username user --turn-credential pass
//!
//! # With logging
//! RUST_LOG=debug cargo run -p whipwhep-server
//! ```
//!
//! # Environment Variables
//!
//! - `WHIP_BIND_ADDRESS`: Server bind address (default: `0.0.0.0:8080`)
//! - `WHIP_ICE_SERVERS`: Comma-separated STUN/TURN URLs
//! - `WHIP_GATHERING_TIMEOUT_MS`: ICE gathering bound, `0` disables it
//! - `RUST_LOG`: Logging level (default: `info`)

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use whipwhep::{IceServerConfig, Negotiator, SignalingConfig, SignalingServer, WebRtcEngine};

/// WHIP/WHEP Signaling Server
///
/// Non-trickle SDP offer/answer exchange over HTTP for WebRTC publishers
/// and players.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTTP bind address
    #[arg(long, default_value = "0.0.0.0:8080", env = "WHIP_BIND_ADDRESS")]
    bind_address: String,

    /// STUN/TURN server URLs (comma-separated, empty for host candidates only)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "stun:stun.l.google.com:19302",
        env = "WHIP_ICE_SERVERS"
    )]
    ice_servers: Vec<String>,

    /// Username for TURN servers
    #[arg(long, env = "WHIP_TURN_USERNAME")]
    turn_username: Option<String>,

    /// Credential for TURN servers
    #[arg(long, env = "WHIP_TURN_CREDENTIAL")]
    turn_credential: Option<String>,

    /// ICE gathering bound in milliseconds (0 waits indefinitely)
    #[arg(long, default_value_t = 10_000, env = "WHIP_GATHERING_TIMEOUT_MS")]
    gathering_timeout_ms: u64,

    /// Directory served for other GET requests
    #[arg(long, default_value = ".", env = "WHIP_STATIC_DIR")]
    static_dir: PathBuf,

    /// Disable static file serving
    #[arg(long, default_value_t = false)]
    no_static: bool,

    /// Maximum offer size in bytes
    #[arg(long, default_value_t = 64 * 1024, env = "WHIP_MAX_OFFER_BYTES")]
    max_offer_bytes: usize,

    /// Gather candidates on loopback interfaces
    #[arg(long, default_value_t = false, env = "WHIP_INCLUDE_LOOPBACK")]
    include_loopback: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    init_tracing();

    let config = build_config(&args);
    config.validate()?;

    info!(
        version = whipwhep::version(),
        bind_address = %config.bind_address,
        ice_servers = config.ice_servers.len(),
        gathering_timeout_ms = ?config.gathering_timeout_ms,
        static_dir = ?config.static_dir,
        "WHIP/WHEP signaling server starting"
    );

    if config.ice_servers.is_empty() {
        warn!("No ICE servers configured, answers will carry host candidates only");
    }

    if config.gathering_timeout_ms.is_none() {
        warn!("ICE gathering is unbounded, a stalled peer pins its request until shutdown");
    }

    // Create multi-threaded tokio runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("whipwhep-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))?;

    info!("Signaling server shutdown complete");
    Ok(())
}

async fn async_main(config: SignalingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(config);

    let engine = Arc::new(WebRtcEngine::new(&config).map_err(|e| {
        error!("Failed to create WebRTC engine: {}", e);
        e
    })?);
    let negotiator = Arc::new(Negotiator::new(engine, Arc::clone(&config)));
    let server = SignalingServer::new(Arc::clone(&config), negotiator);

    info!(
        "Open http://{} to access the signaling server",
        config.bind_address
    );

    server
        .serve_with_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {}", e);
            e
        })?;

    Ok(())
}

fn build_config(args: &Args) -> SignalingConfig {
    let ice_servers = args
        .ice_servers
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(|url| {
            if url.starts_with("turn:") || url.starts_with("turns:") {
                IceServerConfig {
                    urls: vec![url.to_string()],
                    username: args.turn_username.clone(),
                    credential: args.turn_credential.clone(),
                }
            } else {
                IceServerConfig::stun(url)
            }
        })
        .collect();

    let gathering_timeout =
        (args.gathering_timeout_ms > 0).then(|| Duration::from_millis(args.gathering_timeout_ms));
    let static_dir = (!args.no_static).then(|| args.static_dir.clone());

    SignalingConfig {
        max_offer_bytes: args.max_offer_bytes,
        ..SignalingConfig::default()
    }
    .with_bind_address(&args.bind_address)
    .with_ice_servers(ice_servers)
    .with_gathering_timeout(gathering_timeout)
    .with_static_dir(static_dir)
    .with_loopback_candidates(args.include_loopback)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, shutting down"),
        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
    }
}

fn init_tracing() {
    // Initialize tracing with EnvFilter for RUST_LOG support
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
