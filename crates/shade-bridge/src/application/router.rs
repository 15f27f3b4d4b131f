//! Frame routing: decode → dispatch → encode, one frame at a time.
//!
//! The router is the per-frame half of the protocol engine. The connection
//! loop hands it one inbound text frame; it hands back exactly one outbound
//! text frame — a real response when the frame is routable, the fixed
//! `error` frame when it is not. A frame can never be dropped silently and
//! can never crash the daemon.
//!
//! Unroutable frames are answered directly from the codec error, without
//! touching the session layer — a garbage frame must not trigger downstream
//! logins or device traffic.

use shade_core::{decode_request, encode_response, ShadeResponse};
use tracing::{debug, info, warn};

use crate::application::executor::CommandExecutor;

/// Dispatches decoded frames to the executor and encodes the replies.
pub struct Router {
    executor: CommandExecutor,
}

impl Router {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    /// Processes one inbound frame to completion and returns the response
    /// frame to write back on the connection.
    pub async fn process(&self, text: &str) -> String {
        let response = match decode_request(text) {
            Ok(request) => {
                debug!("dispatching {:?}", request);
                self.executor.execute(request).await
            }
            Err(e) => {
                warn!("unroutable frame: {e}");
                ShadeResponse::unknown_action(e.details())
            }
        };

        let encoded = match encode_response(&response) {
            Ok(frame) => frame,
            Err(e) => {
                // Unreachable for these response types, but a frame is owed
                // either way.
                warn!("response encoding failed: {e}");
                encode_response(&ShadeResponse::unknown_action(serde_json::Value::Null))
                    .expect("the fixed error frame always encodes")
            }
        };

        info!("processed: {text}");
        encoded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
