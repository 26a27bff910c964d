//! # WebSocket Audio Streaming Handler
//!
//! Accepts client connections on `/ws`, feeds incoming binary PCM frames
//! through a [`StreamingSession`] and relays transcription results back
//! as text frames.
//!
//! ## Protocol:
//! - **Client to server**: binary frames of raw PCM audio (16-bit
//!   little-endian, 16kHz, mono), any fragment size
//! - **Server to client**: one JSON text frame per recognition result,
//!   `{"partial": ...}` while a segment is in progress and
//!   `{"text": ..., "result": [...]}` when it completes
//!
//! No handshake message is required; audio may start on the first frame.
//! Each connection owns exactly one session, created before the upgrade
//! completes so a failed engine construction is reported as an HTTP
//! error instead of a silent socket.

use crate::error::AppError;
use crate::session::StreamingSession;
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Interval between server pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long a client may stay silent before the connection is dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// WebSocket actor owning one streaming transcription session.
///
/// Frames are processed inline in the actor's message handler, so chunks
/// reach the engine in arrival order and never interleave.
pub struct AudioWebSocket {
    /// The session; taken out exactly once during teardown
    session: Option<StreamingSession>,

    state: web::Data<AppState>,

    last_heartbeat: Instant,
}

impl AudioWebSocket {
    pub fn new(session: StreamingSession, state: web::Data<AppState>) -> Self {
        Self {
            session: Some(session),
            state,
            last_heartbeat: Instant::now(),
        }
    }

    fn handle_audio_frame(&mut self, data: &[u8], ctx: &mut ws::WebsocketContext<Self>) {
        let session = match &mut self.session {
            Some(session) => session,
            None => {
                warn!("Audio frame received after session teardown, dropping");
                return;
            }
        };

        let results = session.ingest(data);
        self.state.record_session_traffic(data.len(), results.len());

        for result in results {
            ctx.text(result);
        }
    }

    /// Close the session if it is still alive. Safe to call more than
    /// once; only the first call reaches the engine.
    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            self.state.session_closed();
        }
    }
}

impl Actor for AudioWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        if let Some(session) = &self.session {
            info!(session_id = %session.id(), "WebSocket connection started");
        }
        self.state.session_started();

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!("WebSocket heartbeat timeout, closing connection");
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.teardown();
        info!("WebSocket connection stopped");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for AudioWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Binary(data)) => {
                self.last_heartbeat = Instant::now();
                self.handle_audio_frame(&data, ctx);
            }
            Ok(ws::Message::Text(text)) => {
                // The protocol is binary-only; text frames are ignored
                // rather than treated as audio.
                warn!(len = text.len(), "Ignoring unexpected text frame");
            }
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                debug!("WebSocket close frame: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!("WebSocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

/// WebSocket endpoint handler.
///
/// Upgrades the HTTP request and hands the connection to an
/// [`AudioWebSocket`] actor. Session construction happens here so a
/// recognizer failure surfaces as a 500 before the upgrade.
pub async fn audio_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let peer = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    info!(peer = %peer, "New WebSocket connection request");

    let config = app_state.get_config();
    let session = StreamingSession::new(&app_state.model, &config).map_err(|err| {
        error!("Failed to create streaming session: {:#}", err);
        AppError::EngineError(format!("Could not start recognition session: {}", err))
    })?;

    ws::start(AudioWebSocket::new(session, app_state), &req, stream)
}
