//! Todo Lists Server - Main entry point.
//!
//! This binary starts the to-do list web application with:
//! - Structured JSON logging for production
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//! - Background expired-session cleanup
//!
//! # Configuration
//!
//! See [`todo_lists_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! # Defaults: port 8080, one day idle session lifetime
//! cargo run --bin todo-lists-server
//!
//! # Behind HTTPS, with a shorter session lifetime
//! TODO_SECURE_COOKIE=true \
//! TODO_SESSION_TTL_SECS=3600 \
//! PORT=3000 \
//! cargo run --release --bin todo-lists-server
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use todo_lists_server::config::Config;
use todo_lists_server::routes::{create_router, AppState};
use todo_lists_server::session::MemorySessionStore;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  PORT                      - HTTP server port (default: 8080)");
            eprintln!("  RUST_LOG                  - Log level filter (default: info)");
            eprintln!("  TODO_SESSION_TTL_SECS     - Idle session lifetime (default: 86400)");
            eprintln!("  TODO_MAX_SESSIONS         - Maximum live sessions (default: 10000)");
            eprintln!("  TODO_SESSION_CLEANUP_SECS - Expired session sweep interval (default: 60)");
            eprintln!("  TODO_SECURE_COOKIE        - Mark the session cookie Secure ('true')");
            return ExitCode::from(1);
        }
    };

    info!(
        port = config.port,
        session_ttl_secs = config.session_ttl.as_secs(),
        max_sessions = config.max_sessions,
        secure_cookie = config.secure_cookie,
        "Todo lists server starting"
    );

    let store = MemorySessionStore::new(config.session_store_config());
    let cleanup_handle = store.spawn_cleanup_task(config.cleanup_interval);
    info!(
        interval_secs = config.cleanup_interval.as_secs(),
        "Session cleanup task started"
    );

    let state = AppState::with_store(config.clone(), Arc::new(store));
    let app = create_router(state);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => {
            info!(
                port = config.port,
                address = %bind_addr,
                "Server listening"
            );
            listener
        }
        Err(err) => {
            error!(
                error = %err,
                address = %bind_addr,
                "Failed to bind to address"
            );
            cleanup_handle.abort();
            return ExitCode::from(1);
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready to accept connections");

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        cleanup_handle.abort();
        return ExitCode::from(1);
    }

    info!("Server shutting down gracefully");

    cleanup_handle.abort();
    info!("Session cleanup task stopped");

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// Configures JSON-formatted output with:
/// - Environment-based log level filtering via RUST_LOG
/// - Default log level of `info`, with request traces from `tower_http`
/// - Target and level information
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum::rejection=trace"));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Creates a future that resolves when a shutdown signal is received.
///
/// Listens for:
/// - SIGTERM (container orchestrator shutdown)
/// - SIGINT (Ctrl+C)
///
/// If a handler cannot be installed, that signal is ignored and the other
/// one still triggers shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }

    info!("Waiting for in-flight requests to complete");
}
