//! Wire-level stream chunk union.
//!
//! On the wire a chunk is discriminated by field presence, not an explicit
//! tag: `{"text":…}` vs `{"text":…,"imageUrl":…}` vs `{"lockdown":true}` vs
//! `{"text":…,"isError":true}`. In Rust the union is an explicit enum,
//! converted through a raw wire struct so the JSON field names stay exactly
//! compatible with the existing stream format.

use serde::{Deserialize, Serialize};

/// One frame of a relay response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireChunk", into = "WireChunk")]
pub enum StreamChunk {
    /// A partial text fragment of the growing bot reply.
    Text { text: String },
    /// A completed chart reply: summary text plus an optional rendered image.
    Chart {
        text: String,
        image_url: Option<String>,
    },
    /// Out-of-band policy action: lock the conversation, show no reply.
    Lockdown,
    /// Terminal user-facing failure; always the last chunk of its stream.
    Error { text: String },
}

impl StreamChunk {
    /// The text payload, if this chunk carries one.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::Chart { text, .. } | Self::Error { text } => Some(text),
            Self::Lockdown => None,
        }
    }
}

/// Field-presence wire shape. Absent fields are dropped from the JSON, so a
/// `Chart` without an image serializes identically to a `Text` chunk — the
/// same degradation the field-presence format has always had.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lockdown: Option<bool>,
    #[serde(rename = "isError", default, skip_serializing_if = "Option::is_none")]
    is_error: Option<bool>,
}

impl From<StreamChunk> for WireChunk {
    fn from(chunk: StreamChunk) -> Self {
        match chunk {
            StreamChunk::Text { text } => Self {
                text: Some(text),
                ..Self::default()
            },
            StreamChunk::Chart { text, image_url } => Self {
                text: Some(text),
                image_url,
                ..Self::default()
            },
            StreamChunk::Lockdown => Self {
                lockdown: Some(true),
                ..Self::default()
            },
            StreamChunk::Error { text } => Self {
                text: Some(text),
                is_error: Some(true),
                ..Self::default()
            },
        }
    }
}

impl From<WireChunk> for StreamChunk {
    fn from(wire: WireChunk) -> Self {
        if wire.lockdown == Some(true) {
            return Self::Lockdown;
        }
        if wire.is_error == Some(true) {
            return Self::Error {
                text: wire.text.unwrap_or_default(),
            };
        }
        if wire.image_url.is_some() {
            return Self::Chart {
                text: wire.text.unwrap_or_default(),
                image_url: wire.image_url,
            };
        }
        Self::Text {
            text: wire.text.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn text_chunk_wire_shape() {
        let json = serde_json::to_string(&StreamChunk::Text {
            text: "Hello".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"text":"Hello"}"#);
    }

    #[test]
    fn lockdown_chunk_wire_shape() {
        let json = serde_json::to_string(&StreamChunk::Lockdown).unwrap();
        assert_eq!(json, r#"{"lockdown":true}"#);
    }

    #[test]
    fn error_chunk_wire_shape() {
        let json = serde_json::to_string(&StreamChunk::Error {
            text: "boom".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"text":"boom","isError":true}"#);
    }

    #[test]
    fn chart_chunk_keeps_image_url_field_name() {
        let json = serde_json::to_string(&StreamChunk::Chart {
            text: "Trends".into(),
            image_url: Some("data:image/png;base64,AAAA".into()),
        })
        .unwrap();
        assert!(json.contains("\"imageUrl\":\"data:image/png;base64,AAAA\""));
    }

    #[test]
    fn chart_without_image_degrades_to_text_on_the_wire() {
        let json = serde_json::to_string(&StreamChunk::Chart {
            text: "no image today".into(),
            image_url: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"text":"no image today"}"#);
        let back: StreamChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(
            back,
            StreamChunk::Text {
                text: "no image today".into()
            }
        );
    }

    #[test]
    fn discrimination_precedence_lockdown_wins() {
        // A pathological frame carrying every field is still a lockdown.
        let back: StreamChunk =
            serde_json::from_str(r#"{"text":"x","imageUrl":"y","lockdown":true,"isError":true}"#)
                .unwrap();
        assert_eq!(back, StreamChunk::Lockdown);
    }

    #[test]
    fn error_without_text_parses_to_empty_message() {
        let back: StreamChunk = serde_json::from_str(r#"{"isError":true}"#).unwrap();
        assert_eq!(back, StreamChunk::Error { text: String::new() });
    }

    #[test]
    fn round_trip_preserves_variants() {
        let chunks = [
            StreamChunk::Text { text: "a".into() },
            StreamChunk::Chart {
                text: "b".into(),
                image_url: Some("data:image/png;base64,BBBB".into()),
            },
            StreamChunk::Lockdown,
            StreamChunk::Error { text: "c".into() },
        ];
        for chunk in chunks {
            let json = serde_json::to_string(&chunk).unwrap();
            let back: StreamChunk = serde_json::from_str(&json).unwrap();
            assert_eq!(back, chunk);
        }
    }
}
