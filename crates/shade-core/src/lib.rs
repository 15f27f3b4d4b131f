//! # shade-core
//!
//! Shared wire-protocol library for the shade bridge: the JSON frame types
//! exchanged with the cloud coordinator and the codec that turns text frames
//! into typed requests and responses back into text frames.
//!
//! This crate has no I/O and no async — it is pure data. The daemon crate
//! (`shade-bridge`) owns the WebSocket connection and the downstream
//! controller calls; everything that travels over the wire is defined here so
//! both sides of the bridge agree on one vocabulary.
//!
//! # Wire format
//!
//! Every frame is a JSON map with an `action` discriminant:
//!
//! ```text
//! inbound   {"action":"status","blinds":[101,102]}
//! outbound  {"action":"status","blinds":{"101":{"level":42,"stopped":false}}}
//! outbound  {"action":"error","message":"Unknown action","details":"reboot"}
//! ```

pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `shade_core::ShadeRequest` instead of the full module path.
pub use protocol::codec::{decode_request, encode_response, FrameError};
pub use protocol::messages::{BlindId, BlindStatus, LevelSpec, ShadeRequest, ShadeResponse};
