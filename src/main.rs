//! Countdown Timer - A pause/resume countdown controlled over HTTP
//!
//! This is the main entry point for the countdown-timer service.

use std::sync::Arc;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use countdown_timer::{
    config::Config,
    persistence::{FileStore, KeyValueStore},
    state::AppState,
    api::create_router,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("countdown_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting countdown-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, interval={}ms, state_file={:?}",
          config.host, config.port, config.interval_ms, config.state_file);

    let store: Option<Box<dyn KeyValueStore>> = match &config.state_file {
        Some(path) => {
            let store = FileStore::open(path)
                .with_context(|| format!("Failed to open state file {}", path.display()))?;
            Some(Box::new(store))
        }
        None => None,
    };

    // Create application state and spawn the task that owns the countdown
    let (state, driver) = AppState::new(
        config.port,
        config.host.clone(),
        config.tick_interval(),
        store,
    );
    let state = Arc::new(state);
    tokio::spawn(driver.run());

    if config.restore {
        match state.restore().await? {
            Some(snapshot) => info!("Restored countdown with {}s remaining", snapshot.remaining),
            None => info!("No saved countdown to restore"),
        }
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start  - Start or restart the countdown ({{\"duration\": seconds}})");
    info!("  POST /pause  - Pause the countdown");
    info!("  POST /resume - Resume a paused countdown");
    info!("  POST /stop   - Stop and reset the countdown");
    info!("  GET  /status - Check timer state and remaining time");
    info!("  GET  /health - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        result = shutdown_signal() => {
            match result {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => warn!("Signal handler failed, shutting down: {}", e),
            }
        }
    }

    let snapshot = state.get_snapshot();
    info!("Countdown left {} with {}s remaining", snapshot.state, snapshot.remaining);

    info!("Server shutdown complete");
    Ok(())
}
