//! FinGuru: financial-advice chat assistant with a streaming relay.
//!
//! The crate is a thin relay in front of a third-party generative-language
//! API plus the client pipeline that consumes it:
//!
//! - **relay**: turns one upstream model call into an incrementally
//!   delivered chunk sequence, scanning for the embedded lockdown marker
//! - **server**: exposes the relay over a single SSE endpoint
//! - **client**: reassembles the SSE byte stream back into chunks
//! - **store**: folds chunks into a transcript mirrored to durable
//!   key-value storage, with a wall-clock-anchored lockdown timer
//!
//! Data flow: user intent → [`store::ChatStore`] appends a user message →
//! [`relay::RelayService`] invoked through [`server::RelayServer`] → chunks
//! stream back through [`client::ChatApi`] → the store mutates the
//! transcript incrementally.

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod relay;
pub mod server;
pub mod sse;
pub mod store;
pub mod test_utils;
pub mod tts;

pub use chat::{Message, StreamChunk, UserSettings};
pub use config::RelayConfig;
pub use error::{ChatError, Result, UpstreamError};
pub use relay::{ChatRequest, RelayService};
pub use server::RelayServer;
pub use store::{ChatStore, CommunityStore, KvStore};
