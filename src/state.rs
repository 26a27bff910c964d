//! # Application State Management
//!
//! Shared state accessed by every HTTP request handler and websocket
//! session: the configuration, the single loaded speech model, and the
//! server metrics.
//!
//! ## Sharing Model:
//! - **Config and metrics**: `Arc<RwLock<..>>`, many readers or one
//!   writer at a time
//! - **Speech model**: plain `Arc`, loaded once at startup, immutable
//!   thereafter, only ever read while sessions construct their own
//!   recognizer instances
//!
//! Per-session state (buffers, engine instances) deliberately does NOT
//! live here; each session owns its own. The state only carries the
//! aggregate counters those sessions report into.

use crate::config::AppConfig;
use crate::transcription::model::SpeechModel;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The shared application state handed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (readable everywhere, rarely written)
    pub config: Arc<RwLock<AppConfig>>,

    /// The loaded recognition model; one per process, shared read-only
    pub model: Arc<SpeechModel>,

    /// Counters updated by requests and streaming sessions
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Aggregate metrics across all requests and sessions.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total HTTP requests processed since startup
    pub request_count: u64,

    /// Total failed HTTP requests since startup
    pub error_count: u64,

    /// Currently connected streaming sessions
    pub active_sessions: u32,

    /// Sessions accepted since startup, including finished ones
    pub sessions_started: u64,

    /// Raw audio bytes received across all sessions
    pub audio_bytes_received: u64,

    /// Partial and final result frames sent to clients
    pub results_sent: u64,

    /// Per-endpoint request statistics, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Request statistics for one endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig, model: Arc<SpeechModel>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            model,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately; AppConfig is cheap to
    /// clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record one request against its endpoint's statistics.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// A streaming session was accepted.
    pub fn session_started(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_sessions += 1;
        metrics.sessions_started += 1;
    }

    /// A streaming session reached Closed.
    ///
    /// Guarded against underflow so a double-close bug cannot panic the
    /// metrics path.
    pub fn session_closed(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_sessions > 0 {
            metrics.active_sessions -= 1;
        }
    }

    /// Account audio received and results sent by one session turn.
    pub fn record_session_traffic(&self, audio_bytes: usize, results: usize) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.audio_bytes_received += audio_bytes as u64;
        metrics.results_sent += results as u64;
    }

    /// Consistent copy of the metrics for reporting endpoints.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_sessions: metrics.active_sessions,
            sessions_started: metrics.sessions_started,
            audio_bytes_received: metrics.audio_bytes_received,
            results_sent: metrics.results_sent,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
