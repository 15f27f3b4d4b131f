//! Wire protocol: frame types and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_request, encode_response, FrameError};
pub use messages::{BlindId, BlindStatus, LevelSpec, ShadeRequest, ShadeResponse};
