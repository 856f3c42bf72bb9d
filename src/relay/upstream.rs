//! Upstream generative-language API client.
//!
//! [`GenerativeBackend`] is the seam between the relay and the provider:
//! the production [`GeminiClient`] speaks the Gemini REST wire format
//! (`:streamGenerateContent?alt=sse` for token streams,
//! `:generateContent` for single-shot multimodal calls), and tests swap in
//! a scripted fake. All failures are classified into [`UpstreamError`]
//! before they leave this module.

use crate::error::UpstreamError;
use crate::sse::SseFrameBuffer;
use async_trait::async_trait;
use base64::Engine;
use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// One part of a model turn: plain text or inline base64 data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "inlineData", default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    #[must_use]
    pub fn inline(inline: InlineData) -> Self {
        Self {
            text: None,
            inline_data: Some(inline),
        }
    }
}

/// Base64-encoded inline payload (images in requests and responses).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Base64 payload without any data-URI framing.
    pub data: String,
}

/// A single role turn sent to the model (`user` or `model`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Turn {
    #[must_use]
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_owned(),
            parts,
        }
    }

    #[must_use]
    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: "model".to_owned(),
            parts,
        }
    }
}

/// One upstream generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub system_instruction: String,
    pub contents: Vec<Turn>,
    pub max_output_tokens: usize,
}

/// Seam between the relay and the generative-language provider.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Open a token stream; text fragments arrive in model order. The
    /// receiver closes when the model finishes.
    async fn stream_generate(
        &self,
        request: GenerateRequest,
    ) -> Result<mpsc::Receiver<Result<String, UpstreamError>>, UpstreamError>;

    /// Single-shot multimodal generation returning the raw response parts
    /// of the first candidate.
    async fn generate_once(&self, request: GenerateRequest) -> Result<Vec<Part>, UpstreamError>;
}

// ---------------------------------------------------------------------------
// Gemini wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text_fragment(&self) -> String {
        let mut out = String::new();
        for part in self.first_parts() {
            if let Some(ref text) = part.text {
                out.push_str(text);
            }
        }
        out
    }

    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map_or(&[], |content| content.parts.as_slice())
    }

    fn into_first_parts(mut self) -> Vec<Part> {
        if self.candidates.is_empty() {
            return Vec::new();
        }
        self.candidates
            .swap_remove(0)
            .content
            .map_or_else(Vec::new, |content| content.parts)
    }
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Gemini REST client.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, model: &str, verb: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/v1beta/models/{model}:{verb}")
    }

    fn request_body(request: &GenerateRequest) -> serde_json::Value {
        serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": request.system_instruction }],
            },
            "contents": request.contents,
            "generationConfig": {
                "maxOutputTokens": request.max_output_tokens,
            },
        })
    }

    async fn send(
        &self,
        url: &str,
        request: &GenerateRequest,
    ) -> Result<reqwest::Response, UpstreamError> {
        let mut builder = self.http.post(url).json(&Self::request_body(request));
        if !self.api_key.is_empty() {
            builder = builder.header("x-goog-api-key", &self.api_key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::Network(format!("upstream request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn stream_generate(
        &self,
        request: GenerateRequest,
    ) -> Result<mpsc::Receiver<Result<String, UpstreamError>>, UpstreamError> {
        let url = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );
        let response = self.send(&url, &request).await?;

        let (tx, rx) = mpsc::channel::<Result<String, UpstreamError>>(64);
        tokio::spawn(async move {
            let mut frames = SseFrameBuffer::new();
            let mut body = response.bytes_stream();
            while let Some(read) = body.next().await {
                let bytes = match read {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(UpstreamError::Network(format!(
                                "stream read failed: {e}"
                            ))))
                            .await;
                        return;
                    }
                };
                for payload in frames.push(&bytes) {
                    if payload == "[DONE]" {
                        return;
                    }
                    match serde_json::from_str::<GenerateResponse>(&payload) {
                        Ok(parsed) => {
                            let fragment = parsed.text_fragment();
                            if !fragment.is_empty() && tx.send(Ok(fragment)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!(error = %e, "skipping malformed upstream frame"),
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn generate_once(&self, request: GenerateRequest) -> Result<Vec<Part>, UpstreamError> {
        let url = self.endpoint(&request.model, "generateContent");
        let response = self.send(&url, &request).await?;
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Other(format!("malformed upstream response: {e}")))?;
        Ok(parsed.into_first_parts())
    }
}

/// Map a non-success upstream status to its error category.
fn classify_status(status: StatusCode, body: &str) -> UpstreamError {
    let detail = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());
    if status == StatusCode::TOO_MANY_REQUESTS {
        UpstreamError::RateLimited(detail)
    } else if status.is_server_error() {
        UpstreamError::ServerFault(detail)
    } else if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || body.contains("API_KEY_INVALID")
        || body.contains("API key not valid")
    {
        UpstreamError::InvalidCredentials(detail)
    } else {
        UpstreamError::Other(detail)
    }
}

// ---------------------------------------------------------------------------
// Data-URI helpers
// ---------------------------------------------------------------------------

/// Split a `data:<mime>;base64,<payload>` URI into an inline part.
///
/// Returns `None` when the URI is not framed that way or the payload is not
/// valid base64.
#[must_use]
pub fn split_data_uri(uri: &str) -> Option<InlineData> {
    let rest = uri.strip_prefix("data:")?;
    let (mime_type, payload) = rest.split_once(";base64,")?;
    if mime_type.is_empty() {
        return None;
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some(InlineData {
        mime_type: mime_type.to_owned(),
        data: payload.to_owned(),
    })
}

/// Reassemble an inline part into a data URI.
#[must_use]
pub fn assemble_data_uri(inline: &InlineData) -> String {
    format!("data:{};base64,{}", inline.mime_type, inline.data)
}
