//! The relay generator: one upstream model call, one incrementally
//! delivered chunk sequence.
//!
//! [`RelayService::open_stream`] classifies the request (chart vs. streamed
//! text), issues the upstream call, and feeds a channel from a background
//! task. The sequence is lazy, finite, and non-restartable; it terminates
//! early when the accumulated reply contains the lockdown marker, and any
//! failure surfaces as exactly one terminal error chunk. Nothing ever
//! raises past this boundary.

pub mod intent;
pub mod prompt;
pub mod upstream;

pub use prompt::LOCKDOWN_MARKER;

use crate::chat::{Message, Sender, StreamChunk, UserSettings};
use crate::error::UpstreamError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use upstream::{GenerateRequest, GenerativeBackend, Part, Turn};
use uuid::Uuid;

/// Text used when the chart model returned an image without any prose.
const CHART_FALLBACK_TEXT: &str = "Here is the chart you requested.";

/// A chat turn request as received by the transport adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub user_settings: UserSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Model IDs the relay chooses between per request.
#[derive(Debug, Clone)]
struct ModelChoice {
    chat: String,
    pro: String,
    chart: String,
    max_output_tokens: usize,
}

/// The relay generator service.
///
/// Constructed once at process start and shared by reference with the
/// transport adapter.
pub struct RelayService {
    backend: Arc<dyn GenerativeBackend>,
    models: ModelChoice,
}

impl RelayService {
    #[must_use]
    pub fn new(backend: Arc<dyn GenerativeBackend>, upstream: &crate::config::UpstreamConfig) -> Self {
        Self {
            backend,
            models: ModelChoice {
                chat: upstream.chat_model.clone(),
                pro: upstream.pro_model.clone(),
                chart: upstream.chart_model.clone(),
                max_output_tokens: upstream.max_output_tokens,
            },
        }
    }

    /// Open the chunk stream for one chat turn.
    ///
    /// Never fails: upstream and request-shape failures surface as a single
    /// terminal error chunk on the returned channel.
    pub fn open_stream(&self, request: ChatRequest) -> mpsc::Receiver<StreamChunk> {
        let (tx, rx) = mpsc::channel(64);
        let backend = Arc::clone(&self.backend);
        let models = self.models.clone();
        tokio::spawn(async move {
            run_turn(backend, models, request, tx).await;
        });
        rx
    }
}

async fn run_turn(
    backend: Arc<dyn GenerativeBackend>,
    models: ModelChoice,
    request: ChatRequest,
    tx: mpsc::Sender<StreamChunk>,
) {
    let request_id = Uuid::new_v4();
    debug!(%request_id, history_len = request.history.len(), "relay turn started");

    let outcome = if intent::wants_chart(&request.message) {
        chart_turn(backend.as_ref(), &models, &request, &tx).await
    } else {
        stream_turn(backend.as_ref(), &models, &request, &tx).await
    };

    if let Err(e) = outcome {
        warn!(%request_id, error = %e, "relay turn failed");
        let _ = tx
            .send(StreamChunk::Error {
                text: e.user_message().to_owned(),
            })
            .await;
    }
}

/// Chart path: one non-streaming multimodal call carrying only the current
/// turn, yielding exactly one chunk.
async fn chart_turn(
    backend: &dyn GenerativeBackend,
    models: &ModelChoice,
    request: &ChatRequest,
    tx: &mpsc::Sender<StreamChunk>,
) -> Result<(), UpstreamError> {
    let profile = request.user_settings.financial_profile.as_ref();
    let generate = GenerateRequest {
        model: models.chart.clone(),
        system_instruction: prompt::chart_instruction(profile),
        contents: vec![Turn::user(current_turn_parts(request)?)],
        max_output_tokens: models.max_output_tokens,
    };

    info!(model = %generate.model, "chart request");
    let parts = backend.generate_once(generate).await?;

    let mut text = String::new();
    let mut image_url = None;
    for part in parts {
        if let Some(fragment) = part.text {
            text.push_str(&fragment);
        } else if image_url.is_none()
            && let Some(inline) = part.inline_data
        {
            image_url = Some(upstream::assemble_data_uri(&inline));
        }
    }

    if text.is_empty() {
        text = CHART_FALLBACK_TEXT.to_owned();
    }
    let _ = tx.send(StreamChunk::Chart { text, image_url }).await;
    Ok(())
}

/// Streaming-text path: full history context, per-fragment lockdown scan.
async fn stream_turn(
    backend: &dyn GenerativeBackend,
    models: &ModelChoice,
    request: &ChatRequest,
    tx: &mpsc::Sender<StreamChunk>,
) -> Result<(), UpstreamError> {
    let profile = request.user_settings.financial_profile.as_ref();
    let mut contents: Vec<Turn> = request.history.iter().map(history_turn).collect();
    contents.push(Turn::user(current_turn_parts(request)?));

    let model = if request.user_settings.pro_mode {
        models.pro.clone()
    } else {
        models.chat.clone()
    };
    info!(model = %model, pro_mode = request.user_settings.pro_mode, "chat request");

    let generate = GenerateRequest {
        model,
        system_instruction: prompt::advisor_instruction(profile),
        contents,
        max_output_tokens: models.max_output_tokens,
    };

    let mut fragments = backend.stream_generate(generate).await?;
    let mut accumulated = String::new();
    while let Some(fragment) = fragments.recv().await {
        let fragment = fragment?;
        accumulated.push_str(&fragment);

        // The marker may arrive split across fragments, so the scan runs
        // over the accumulated reply, not the fragment.
        if accumulated.contains(LOCKDOWN_MARKER) {
            info!("lockdown marker detected, terminating stream");
            let _ = tx.send(StreamChunk::Lockdown).await;
            return Ok(());
        }

        if tx.send(StreamChunk::Text { text: fragment }).await.is_err() {
            // Receiver dropped; nobody is listening anymore.
            return Ok(());
        }
    }
    Ok(())
}

/// Parts for the current user turn: inline attachment first, text second.
fn current_turn_parts(request: &ChatRequest) -> Result<Vec<Part>, UpstreamError> {
    let mut parts = Vec::with_capacity(2);
    if let Some(ref uri) = request.image_url {
        let inline = upstream::split_data_uri(uri).ok_or_else(|| {
            UpstreamError::Other("attachment is not a base64 data URI".to_owned())
        })?;
        parts.push(Part::inline(inline));
    }
    parts.push(Part::text(request.message.clone()));
    Ok(parts)
}

/// Map a transcript message to a model-context turn. Only the text carries
/// over; attachments are not replayed into context.
fn history_turn(message: &Message) -> Turn {
    let parts = vec![Part::text(message.text.clone())];
    match message.sender {
        Sender::User => Turn::user(parts),
        Sender::Bot => Turn::model(parts),
    }
}
