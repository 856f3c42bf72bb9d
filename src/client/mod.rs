//! Client-side consumer of the relay's SSE stream.
//!
//! [`ChatApi`] posts a chat turn and re-yields each `data:` frame as a
//! [`StreamChunk`] over a channel. Frame boundaries are reassembled by
//! [`crate::sse::SseFrameBuffer`] because network reads split frames
//! arbitrarily. Transport failures never surface as errors: they become a
//! single terminal error chunk, exactly like the relay's own failures.

use crate::chat::StreamChunk;
use crate::relay::ChatRequest;
use crate::sse::SseFrameBuffer;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::warn;

/// Shown when the relay server cannot be reached or rejects the request.
const BACKEND_UNREACHABLE: &str =
    "Unable to connect to the backend server. Please make sure it's running.";

/// Shown when the connection drops mid-stream.
const NETWORK_TROUBLE: &str =
    "I'm having trouble connecting to the network. Please check your internet connection.";

/// HTTP client for the relay server.
pub struct ChatApi {
    http: reqwest::Client,
    base_url: String,
}

impl ChatApi {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Send a chat turn; chunks arrive on the returned channel.
    ///
    /// The channel closes on the `[DONE]` frame or when the connection
    /// ends. Malformed frames are logged and skipped; they never abort the
    /// stream.
    pub fn send_message(&self, request: ChatRequest) -> mpsc::Receiver<StreamChunk> {
        let (tx, rx) = mpsc::channel(64);
        let http = self.http.clone();
        let url = self.endpoint("/api/chat");
        tokio::spawn(async move {
            if let Err(message) = run_stream(&http, &url, request, &tx).await {
                let _ = tx.send(StreamChunk::Error { text: message }).await;
            }
        });
        rx
    }

    /// Request server-side speech synthesis for a reply.
    ///
    /// Returns base64 audio, or `None` on any failure (logged); playback
    /// falls back to the platform voice engine.
    pub async fn text_to_speech(&self, text: &str, voice: Option<&str>) -> Option<String> {
        #[derive(Debug, Deserialize)]
        struct TtsResponse {
            #[serde(rename = "audioData")]
            audio_data: Option<String>,
        }

        let body = serde_json::json!({ "text": text, "voice": voice });
        let response = self
            .http
            .post(self.endpoint("/api/text-to-speech"))
            .json(&body)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "tts request failed"))
            .ok()?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "tts request rejected");
            return None;
        }

        let parsed: TtsResponse = response
            .json()
            .await
            .inspect_err(|e| warn!(error = %e, "malformed tts response"))
            .ok()?;
        parsed.audio_data
    }
}

/// Drive one SSE response to completion, forwarding chunks.
async fn run_stream(
    http: &reqwest::Client,
    url: &str,
    request: ChatRequest,
    tx: &mpsc::Sender<StreamChunk>,
) -> Result<(), String> {
    let response = http.post(url).json(&request).send().await.map_err(|e| {
        warn!(error = %e, "chat request failed");
        if e.is_connect() {
            BACKEND_UNREACHABLE.to_owned()
        } else {
            NETWORK_TROUBLE.to_owned()
        }
    })?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "chat request rejected");
        return Err(BACKEND_UNREACHABLE.to_owned());
    }

    let mut frames = SseFrameBuffer::new();
    let mut body = response.bytes_stream();
    while let Some(read) = body.next().await {
        let bytes = read.map_err(|e| {
            warn!(error = %e, "chat stream read failed");
            NETWORK_TROUBLE.to_owned()
        })?;

        for payload in frames.push(&bytes) {
            if payload == "[DONE]" {
                return Ok(());
            }
            match serde_json::from_str::<StreamChunk>(&payload) {
                Ok(chunk) => {
                    if tx.send(chunk).await.is_err() {
                        return Ok(());
                    }
                }
                Err(e) => warn!(error = %e, "skipping malformed stream frame"),
            }
        }
    }
    Ok(())
}
