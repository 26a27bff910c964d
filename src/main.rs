//! # Speech Stream Backend - Main Application Entry Point
//!
//! An Actix-web server that accepts raw PCM audio over websocket
//! connections and streams speech recognition results back to the
//! client as JSON.
//!
//! ## Application Architecture:
//! - **config**: Configuration loading (TOML file + environment variables)
//! - **state**: Shared application state and metrics
//! - **audio**: Chunk assembly and optional debug capture
//! - **transcription**: Recognition model and engine adapters
//! - **session**: Per-connection streaming pipeline
//! - **websocket**: The `/ws` transport actor
//! - **health**: Health and metrics endpoints
//! - **middleware**: Request logging and metrics collection
//! - **error**: Error types and their HTTP mapping

mod audio;
mod config;
mod error;
mod health;
mod middleware;
mod session;
mod state;
mod transcription;
mod websocket;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcription::model::SpeechModel;

/// Global shutdown flag set by the signal handler task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// Entry point.
///
/// Loads configuration, loads the recognition model (fatal if the model
/// directory is missing), then serves until SIGINT or SIGTERM. The model
/// is loaded before the socket is bound so a misconfigured deployment
/// fails fast instead of accepting connections it cannot serve.
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing();

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting speech-stream-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Audio format: {}Hz, {} channel(s), {}-bit, {} byte chunks",
        config.audio.sample_rate,
        config.audio.channels,
        config.audio.bit_depth,
        config.audio.min_chunk_bytes
    );

    let model = SpeechModel::load(&config.model)?;
    info!(
        backend = model.backend(),
        path = %model.path().display(),
        "Recognition model loaded"
    );

    let app_state = AppState::new(config.clone(), Arc::new(model));
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let shutdown_timeout = config.server.shutdown_timeout_secs;

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .route("/ws", web::get().to(websocket::audio_websocket))
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics)),
            )
            .route("/health", web::get().to(health::health_check))
    })
    .shutdown_timeout(shutdown_timeout)
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Set up structured logging.
///
/// Respects `RUST_LOG`; otherwise logs this crate at debug and the web
/// framework at info.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "speech_stream_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Listen for SIGTERM and SIGINT and flip the shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate());
        let sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt());

        let (mut sigterm, mut sigint) = match (sigterm, sigint) {
            (Ok(t), Ok(i)) => (t, i),
            _ => {
                error!("Failed to install signal handlers, shutdown via signals disabled");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Resolve once the shutdown flag is set. Polled rather than event
/// driven; 100ms latency on shutdown is acceptable.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
