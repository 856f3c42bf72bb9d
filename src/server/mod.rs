//! HTTP transport for the relay.
//!
//! ## Endpoints
//!
//! - `GET /` — liveness line
//! - `POST /api/chat` — chat turn, streamed back as SSE `data:` frames
//!   terminated by a literal `[DONE]` frame
//! - `POST /api/text-to-speech` — speech synthesis (stub unless a provider
//!   is configured)

use crate::config::ServerConfig;
use crate::error::{ChatError, Result};
use crate::relay::{ChatRequest, RelayService};
use crate::tts::SpeechSynthesizer;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use bytes::Bytes;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    relay: Arc<RelayService>,
    synth: Arc<dyn SpeechSynthesizer>,
}

/// The relay HTTP server.
///
/// Binds on start (port `0` auto-assigns) and serves from a background
/// tokio task until shutdown or drop.
pub struct RelayServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl RelayServer {
    /// Start the relay server.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(
        relay: Arc<RelayService>,
        synth: Arc<dyn SpeechSynthesizer>,
        config: &ServerConfig,
    ) -> Result<Self> {
        let state = AppState { relay, synth };

        let app = Router::new()
            .route("/", get(handle_root))
            .route("/api/chat", post(handle_chat))
            .route("/api/text-to-speech", post(handle_tts))
            .with_state(state);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ChatError::Server(format!("relay server bind failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ChatError::Server(format!("failed to get local addr: {e}")))?;

        info!("relay server listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("relay server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

async fn handle_root() -> &'static str {
    "FinGuru relay server is running"
}

/// `POST /api/chat` — drive the relay generator over SSE.
///
/// The body is parsed by hand so a malformed request answers with a JSON
/// error payload and a 500 status before any stream begins; once the SSE
/// response starts there is no error channel other than the chunk stream
/// itself.
async fn handle_chat(State(state): State<AppState>, body: Bytes) -> axum::response::Response {
    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "rejected malformed chat request");
            let payload = serde_json::json!({
                "error": "An error occurred while processing your request.",
                "details": e.to_string(),
            });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
        }
    };

    info!(history_len = request.history.len(), "chat request");
    let mut chunks = state.relay.open_stream(request);

    let stream = async_stream::stream! {
        while let Some(chunk) = chunks.recv().await {
            // Frames go out in emission order, one chunk per frame.
            if let Ok(json) = serde_json::to_string(&chunk) {
                yield Ok::<_, std::convert::Infallible>(Event::default().data(json));
            }
        }
        yield Ok(Event::default().data("[DONE]"));
    };

    (
        [(axum::http::header::CACHE_CONTROL, "no-cache")],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct TtsRequest {
    text: Option<String>,
    voice: Option<String>,
}

/// `POST /api/text-to-speech` — synthesize a reply for playback.
async fn handle_tts(
    State(state): State<AppState>,
    Json(request): Json<TtsRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(text) = request.text.filter(|text| !text.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Text is required" })),
        );
    };

    info!(
        text_len = text.len(),
        voice = request.voice.as_deref().unwrap_or("default"),
        "tts request"
    );

    match state.synth.synthesize(&text, request.voice.as_deref()).await {
        Ok(Some(audio)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "audioData": audio })),
        ),
        Ok(None) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Failed to generate audio" })),
        ),
        Err(e) => {
            error!(error = %e, "tts synthesis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "An error occurred while generating audio.",
                    "details": e.to_string(),
                })),
            )
        }
    }
}
