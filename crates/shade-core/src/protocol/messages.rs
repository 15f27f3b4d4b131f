//! Frame types for the coordinator-facing JSON protocol.
//!
//! The coordinator sends one request frame at a time over the persistent
//! WebSocket; the bridge answers every request with exactly one response frame
//! on the same connection.
//!
//! # JSON discriminant
//!
//! Every frame is a JSON object with an `"action"` field that identifies the
//! variant; the remaining fields are flattened into the same object:
//!
//! ```json
//! {"action":"set-levels","blinds":[{"id":101,"level":75}]}
//! ```
//!
//! Serde's `#[serde(tag = "action")]` attribute handles this automatically,
//! and `rename_all = "kebab-case"` maps `SetLevels` to `"set-levels"`.
//!
//! # Why separate request and response enums?
//!
//! The two directions carry different payloads for the same action name —
//! a `status` request holds a *list* of blind ids, a `status` response holds
//! a *map* of per-blind results. Two distinct enums make it a compile-time
//! error to send a request shape where a response belongs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of one controllable blind inside the downstream system.
///
/// The downstream controller addresses devices by small integer item ids;
/// the coordinator echoes them verbatim, so no richer type is needed.
pub type BlindId = u32;

// ── Request frames (coordinator → bridge) ─────────────────────────────────────

/// One `{id, level}` entry of a `set-levels` request.
///
/// `level` is a percentage-like target position. The bridge performs no range
/// validation — the downstream controller is the authority on what a valid
/// level is and rejects out-of-range values itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Downstream item id of the blind to move.
    pub id: BlindId,
    /// Target level to drive the blind towards.
    pub level: u32,
}

/// All request frames the coordinator can send to the bridge.
///
/// # Serde representation
///
/// ```json
/// {"action":"status","blinds":[101,102]}
/// {"action":"set-levels","blinds":[{"id":101,"level":75}]}
/// {"action":"positions"}
/// {"action":"batteries"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ShadeRequest {
    /// Fetch current level and stopped flag for each listed blind.
    Status {
        /// Blind ids to query, in coordinator order.
        blinds: Vec<BlindId>,
    },

    /// Drive each listed blind towards its target level.
    SetLevels {
        /// Per-blind level targets.
        blinds: Vec<LevelSpec>,
    },

    /// Bulk-fetch level, target level, and stopped flag for all items.
    Positions,

    /// Bulk-fetch battery level for all items.
    Batteries,
}

// ── Response frames (bridge → coordinator) ────────────────────────────────────

/// Per-blind payload of a `status` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindStatus {
    /// Current level as reported by the downstream controller.
    pub level: i64,
    /// Whether the blind has stopped moving.
    pub stopped: bool,
}

/// All response frames the bridge can send to the coordinator.
///
/// The `status` map uses a `BTreeMap` so the serialized frame lists blinds in
/// a stable order — the same request always produces the same bytes.
///
/// # Serde representation
///
/// ```json
/// {"action":"status","blinds":{"101":{"level":42,"stopped":false}}}
/// {"action":"set-levels"}
/// {"action":"positions","positions":{...}}
/// {"action":"error","message":"Unknown action","details":"reboot"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ShadeResponse {
    /// Per-blind level and stopped flag. Blinds whose query failed
    /// permanently are omitted — partial results are valid.
    Status {
        blinds: BTreeMap<BlindId, BlindStatus>,
    },

    /// Bare acknowledgement that the level commands were issued.
    SetLevels,

    /// Bulk position data, passed through opaquely as the downstream
    /// controller returned it.
    Positions { positions: Value },

    /// Bulk battery data, passed through opaquely.
    Batteries { batteries: Value },

    /// Protocol-level error reply. Every inbound frame the bridge cannot
    /// serve still gets a well-formed response — never a silent drop.
    Error {
        /// Short human-readable description.
        message: String,
        /// Identifying detail, e.g. the unrecognized action value.
        details: Value,
    },
}

impl ShadeResponse {
    /// The fixed error frame for unroutable input:
    /// `{"action":"error","message":"Unknown action","details":<details>}`.
    ///
    /// `details` carries the original action value when one could be
    /// extracted from the frame, or JSON `null` when the frame was too
    /// malformed to contain one.
    pub fn unknown_action(details: Value) -> Self {
        Self::Error {
            message: "Unknown action".to_string(),
            details,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── ShadeRequest deserialization ─────────────────────────────────────────

    #[test]
    fn test_status_request_deserializes_with_blind_ids() {
        // Arrange: frame as the coordinator would send it
        let text = r#"{"action":"status","blinds":[101,102,103]}"#;

        // Act
        let req: ShadeRequest = serde_json::from_str(text).unwrap();

        // Assert
        assert_eq!(
            req,
            ShadeRequest::Status {
                blinds: vec![101, 102, 103]
            }
        );
    }

    #[test]
    fn test_set_levels_request_deserializes_specs_in_order() {
        let text = r#"{"action":"set-levels","blinds":[{"id":101,"level":75},{"id":102,"level":0}]}"#;
        let req: ShadeRequest = serde_json::from_str(text).unwrap();
        match req {
            ShadeRequest::SetLevels { blinds } => {
                assert_eq!(blinds.len(), 2);
                assert_eq!(blinds[0], LevelSpec { id: 101, level: 75 });
                assert_eq!(blinds[1], LevelSpec { id: 102, level: 0 });
            }
            other => panic!("expected SetLevels, got {:?}", other),
        }
    }

    #[test]
    fn test_positions_request_deserializes_from_bare_action() {
        let req: ShadeRequest = serde_json::from_str(r#"{"action":"positions"}"#).unwrap();
        assert_eq!(req, ShadeRequest::Positions);
    }

    #[test]
    fn test_batteries_request_deserializes_from_bare_action() {
        let req: ShadeRequest = serde_json::from_str(r#"{"action":"batteries"}"#).unwrap();
        assert_eq!(req, ShadeRequest::Batteries);
    }

    #[test]
    fn test_unknown_action_fails_to_deserialize() {
        let result: Result<ShadeRequest, _> = serde_json::from_str(r#"{"action":"reboot"}"#);
        assert!(result.is_err(), "unknown action must not deserialize");
    }

    #[test]
    fn test_missing_action_field_fails_to_deserialize() {
        let result: Result<ShadeRequest, _> = serde_json::from_str(r#"{"blinds":[1]}"#);
        assert!(result.is_err());
    }

    // ── ShadeResponse serialization ──────────────────────────────────────────

    #[test]
    fn test_status_response_serializes_with_action_tag_first() {
        // Arrange
        let mut blinds = BTreeMap::new();
        blinds.insert(
            101,
            BlindStatus {
                level: 42,
                stopped: false,
            },
        );
        let resp = ShadeResponse::Status { blinds };

        // Act
        let text = serde_json::to_string(&resp).unwrap();

        // Assert: exact frame per the wire contract
        assert_eq!(
            text,
            r#"{"action":"status","blinds":{"101":{"level":42,"stopped":false}}}"#
        );
    }

    #[test]
    fn test_status_response_map_order_is_stable() {
        // Insertion order must not leak into the frame — the BTreeMap sorts ids.
        let mut blinds = BTreeMap::new();
        blinds.insert(202, BlindStatus { level: 1, stopped: true });
        blinds.insert(101, BlindStatus { level: 2, stopped: false });
        let text = serde_json::to_string(&ShadeResponse::Status { blinds }).unwrap();
        let idx_101 = text.find("\"101\"").unwrap();
        let idx_202 = text.find("\"202\"").unwrap();
        assert!(idx_101 < idx_202, "blind ids must serialize in sorted order");
    }

    #[test]
    fn test_set_levels_response_is_bare_acknowledgement() {
        let text = serde_json::to_string(&ShadeResponse::SetLevels).unwrap();
        assert_eq!(text, r#"{"action":"set-levels"}"#);
    }

    #[test]
    fn test_positions_response_passes_payload_through() {
        let resp = ShadeResponse::Positions {
            positions: json!({"101": {"Level": 42}}),
        };
        let text = serde_json::to_string(&resp).unwrap();
        assert_eq!(text, r#"{"action":"positions","positions":{"101":{"Level":42}}}"#);
    }

    #[test]
    fn test_batteries_response_passes_payload_through() {
        let resp = ShadeResponse::Batteries {
            batteries: json!({"101": {"Battery Level": 80}}),
        };
        let text = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            text,
            r#"{"action":"batteries","batteries":{"101":{"Battery Level":80}}}"#
        );
    }

    #[test]
    fn test_unknown_action_frame_is_byte_exact() {
        // This frame is fixed: the same input must always produce the same bytes.
        let resp = ShadeResponse::unknown_action(json!("reboot"));
        let text = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            text,
            r#"{"action":"error","message":"Unknown action","details":"reboot"}"#
        );
    }

    #[test]
    fn test_unknown_action_frame_with_null_details() {
        let resp = ShadeResponse::unknown_action(Value::Null);
        let text = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            text,
            r#"{"action":"error","message":"Unknown action","details":null}"#
        );
    }

    #[test]
    fn test_response_round_trips_through_json() {
        let mut blinds = BTreeMap::new();
        blinds.insert(7, BlindStatus { level: 100, stopped: true });
        let original = ShadeResponse::Status { blinds };
        let text = serde_json::to_string(&original).unwrap();
        let decoded: ShadeResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(original, decoded);
    }
}
