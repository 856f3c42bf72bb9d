//! Shared test utilities used by unit and integration tests.

use crate::error::UpstreamError;
use crate::relay::upstream::{GenerateRequest, GenerativeBackend, Part};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One scripted upstream turn for [`FakeBackend`].
#[derive(Debug, Clone)]
pub enum FakeTurn {
    /// Streamed fragments, each either a token or a mid-stream failure.
    Fragments(Vec<Result<String, UpstreamError>>),
    /// Single-shot response parts (chart path).
    Parts(Vec<Part>),
    /// Fail the call before producing any output.
    Fail(UpstreamError),
}

impl FakeTurn {
    /// Convenience: a streaming turn of plain `Ok` fragments.
    #[must_use]
    pub fn fragments(fragments: &[&str]) -> Self {
        Self::Fragments(fragments.iter().map(|s| Ok((*s).to_owned())).collect())
    }
}

/// Scripted [`GenerativeBackend`] that records every request it receives.
///
/// Turns are consumed front-to-back; an exhausted script fails the call.
pub struct FakeBackend {
    script: Mutex<VecDeque<FakeTurn>>,
    seen: Mutex<Vec<GenerateRequest>>,
}

impl FakeBackend {
    #[must_use]
    pub fn new(script: Vec<FakeTurn>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every request the backend has received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.seen.lock().expect("seen lock").clone()
    }

    fn next_turn(&self, request: GenerateRequest) -> Result<FakeTurn, UpstreamError> {
        self.seen.lock().expect("seen lock").push(request);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .ok_or_else(|| UpstreamError::Other("fake backend script exhausted".to_owned()))
    }
}

#[async_trait]
impl GenerativeBackend for FakeBackend {
    async fn stream_generate(
        &self,
        request: GenerateRequest,
    ) -> Result<mpsc::Receiver<Result<String, UpstreamError>>, UpstreamError> {
        match self.next_turn(request)? {
            FakeTurn::Fragments(fragments) => {
                let (tx, rx) = mpsc::channel(16);
                tokio::spawn(async move {
                    for fragment in fragments {
                        if tx.send(fragment).await.is_err() {
                            return;
                        }
                    }
                });
                Ok(rx)
            }
            FakeTurn::Fail(e) => Err(e),
            FakeTurn::Parts(_) => Err(UpstreamError::Other(
                "fake backend scripted a single-shot turn, got a stream call".to_owned(),
            )),
        }
    }

    async fn generate_once(&self, request: GenerateRequest) -> Result<Vec<Part>, UpstreamError> {
        match self.next_turn(request)? {
            FakeTurn::Parts(parts) => Ok(parts),
            FakeTurn::Fail(e) => Err(e),
            FakeTurn::Fragments(_) => Err(UpstreamError::Other(
                "fake backend scripted a streaming turn, got a single-shot call".to_owned(),
            )),
        }
    }
}
