//! Speech synthesis seam for the TTS endpoint.
//!
//! Speech is normally synthesized on the client by the platform voice
//! engine, so the server endpoint stays unimplemented unless a real
//! provider is wired in behind [`SpeechSynthesizer`]. [`NullSynthesizer`]
//! is that default: it reports no synthesis capability and the endpoint
//! answers with an error payload.

use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Provider seam for server-side speech synthesis.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and return base64 audio, or `None` when the
    /// backend has no synthesis capability.
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Option<String>>;
}

/// Default synthesizer: no provider configured.
pub struct NullSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NullSynthesizer {
    async fn synthesize(&self, _text: &str, _voice: Option<&str>) -> Result<Option<String>> {
        info!("text-to-speech not implemented, no synthesis provider configured");
        Ok(None)
    }
}
