//! JSON codec for inbound and outbound frames.
//!
//! Decoding is total over arbitrary peer input: whatever text arrives, the
//! caller either gets a typed [`ShadeRequest`] or a [`FrameError`] that maps
//! onto the fixed `error` response frame. A bad frame can never be silently
//! dropped and can never take the daemon down.
//!
//! Decode happens in two steps — parse to a generic JSON value first, then
//! into the typed enum — so the original `action` value survives even when the
//! frame does not match any known request shape. The error response must echo
//! that value back as its `details`.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::{ShadeRequest, ShadeResponse};

/// Errors produced while decoding an inbound frame.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    /// The frame is a JSON map, but its `action` is unrecognized or its
    /// fields do not match the action's expected shape. Carries the original
    /// action value for the error response.
    #[error("unroutable action: {action}")]
    UnknownAction { action: Value },

    /// The frame is not a JSON map at all (invalid JSON, or a bare scalar or
    /// array), or it lacks an `action` field entirely.
    #[error("malformed frame: {0}")]
    Malformed(String),
}

impl FrameError {
    /// The `details` value for the error response this decode failure maps
    /// onto: the offending action value when one exists, JSON `null` when the
    /// frame was too malformed to contain one.
    pub fn details(&self) -> Value {
        match self {
            Self::UnknownAction { action } => action.clone(),
            Self::Malformed(_) => Value::Null,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one inbound text frame into a [`ShadeRequest`].
///
/// # Errors
///
/// - [`FrameError::Malformed`] when `text` is not a JSON map or has no
///   `action` field.
/// - [`FrameError::UnknownAction`] when the `action` value is not a known
///   request kind, or the frame's fields do not fit that kind. The original
///   action value is preserved for the error response.
pub fn decode_request(text: &str) -> Result<ShadeRequest, FrameError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;

    let map = value
        .as_object()
        .ok_or_else(|| FrameError::Malformed("frame is not a map".to_string()))?;

    let action = map
        .get("action")
        .cloned()
        .ok_or_else(|| FrameError::Malformed("frame has no action field".to_string()))?;

    serde_json::from_value(value).map_err(|_| FrameError::UnknownAction { action })
}

/// Encodes one outbound response frame as JSON text.
///
/// Serialization is deterministic: the `action` tag is emitted first, struct
/// fields follow in declaration order, and map payloads are ordered — the
/// same response value always yields the same bytes.
pub fn encode_response(response: &ShadeResponse) -> serde_json::Result<String> {
    serde_json::to_string(response)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
