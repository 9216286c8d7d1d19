//! # Event Model and Wire Codec
//!
//! An `Event` is one tweet travelling through the pipeline. It is created by an
//! event source, encoded once by the publisher, decoded once by the subscriber
//! and dropped after dispatch.
//!
//! ## Wire Format:
//! The payload is a JSON object with PascalCase keys:
//!
//! ```json
//! {"User":{"Name":"John Doe"},"ID":1700000000,"CreatedAt":"2024-01-01","Text":"foo bar baz - 0"}
//! ```
//!
//! Decoding also accepts the lower/snake case keys used by the home timeline
//! API (`user.name`, `id`, `created_at`, `text`), so a timeline status can be
//! deserialized straight into an `Event`. Unknown fields are ignored.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the event codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Serializing an event failed. Treated as a programming defect.
    #[error("Failed to encode event {id}: {source}")]
    Encode {
        /// Id of the event that could not be encoded.
        id: i64,
        /// Serializer failure.
        #[source]
        source: serde_json::Error,
    },

    /// The payload is not a valid event. Treated as corruption.
    #[error("Failed to decode event payload: {0}")]
    Decode(#[source] serde_json::Error),
}

/// # User
///
/// The author of an event. Only the display name travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct User {
    /// Display name, opaque to the pipeline.
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
}

/// # Event
///
/// A single streamed post.
///
/// `id` is the ordering and dedup key: unique for the lifetime of one source
/// and non-decreasing across successive polls of that source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The author of the post.
    #[serde(rename = "User", alias = "user", default)]
    pub user: User,
    /// Monotonic identifier.
    #[serde(rename = "ID", alias = "id")]
    pub id: i64,
    /// Creation time in the producer's local representation.
    #[serde(rename = "CreatedAt", alias = "created_at", default)]
    pub created_at: String,
    /// The post body.
    #[serde(rename = "Text", alias = "text", default)]
    pub text: String,
}

impl Event {
    /// Builds an event from its four fields.
    pub fn new(
        id: i64,
        author: impl Into<String>,
        created_at: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user: User { name: author.into() },
            id,
            created_at: created_at.into(),
            text: text.into(),
        }
    }

    /// The author's display name.
    pub fn author(&self) -> &str {
        &self.user.name
    }

    /// Encodes the event into its JSON wire payload.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|source| CodecError::Encode { id: self.id, source })
    }

    /// Decodes a JSON wire payload into an event.
    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(payload).map_err(CodecError::Decode)
    }
}
