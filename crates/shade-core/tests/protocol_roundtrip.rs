//! Integration tests for the frame codec: full decode → (simulated) handle →
//! encode cycles over the wire contract, including the canonical scenario
//! frames.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use shade_core::{
    decode_request, encode_response, BlindStatus, FrameError, ShadeRequest, ShadeResponse,
};

#[test]
fn test_status_scenario_frame_round_trip() {
    // Inbound: {action: status, blinds: [101]}
    let req = decode_request(r#"{"action":"status","blinds":[101]}"#).unwrap();
    assert_eq!(req, ShadeRequest::Status { blinds: vec![101] });

    // Downstream reports level=42, stopped=false for blind 101.
    let mut blinds = BTreeMap::new();
    blinds.insert(
        101,
        BlindStatus {
            level: 42,
            stopped: false,
        },
    );

    // Outbound frame must match the contract exactly.
    let text = encode_response(&ShadeResponse::Status { blinds }).unwrap();
    assert_eq!(
        text,
        r#"{"action":"status","blinds":{"101":{"level":42,"stopped":false}}}"#
    );
}

#[test]
fn test_set_levels_scenario_frame_round_trip() {
    let req = decode_request(r#"{"action":"set-levels","blinds":[{"id":101,"level":75}]}"#).unwrap();
    match req {
        ShadeRequest::SetLevels { blinds } => {
            assert_eq!(blinds.len(), 1);
            assert_eq!(blinds[0].id, 101);
            assert_eq!(blinds[0].level, 75);
        }
        other => panic!("expected SetLevels, got {:?}", other),
    }

    // The acknowledgement carries no per-device payload.
    let text = encode_response(&ShadeResponse::SetLevels).unwrap();
    assert_eq!(text, r#"{"action":"set-levels"}"#);
}

#[test]
fn test_unknown_action_response_is_byte_for_byte_reproducible() {
    let err = decode_request(r#"{"action":"open-sesame"}"#).unwrap_err();
    let first = encode_response(&ShadeResponse::unknown_action(err.details())).unwrap();

    let err = decode_request(r#"{"action":"open-sesame"}"#).unwrap_err();
    let second = encode_response(&ShadeResponse::unknown_action(err.details())).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first,
        r#"{"action":"error","message":"Unknown action","details":"open-sesame"}"#
    );
}

#[test]
fn test_malformed_frames_all_map_to_the_null_details_error() {
    for text in ["", "{", "[]", "42", r#""status""#, r#"{"blinds":[1]}"#] {
        let err = decode_request(text).unwrap_err();
        assert!(
            matches!(err, FrameError::Malformed(_)),
            "{text:?} should be malformed"
        );
        let frame = encode_response(&ShadeResponse::unknown_action(err.details())).unwrap();
        assert_eq!(
            frame,
            r#"{"action":"error","message":"Unknown action","details":null}"#
        );
    }
}

#[test]
fn test_positions_and_batteries_payloads_are_opaque() {
    // Whatever map the downstream returns is passed through untouched.
    let payload: Value = json!({"101": {"Level": 42, "Target Level": 50, "Stopped": 1}});
    let text = encode_response(&ShadeResponse::Positions {
        positions: payload.clone(),
    })
    .unwrap();
    let decoded: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(decoded["positions"], payload);

    let text = encode_response(&ShadeResponse::Batteries {
        batteries: json!({"101": {"Battery Level": 80}}),
    })
    .unwrap();
    let decoded: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(decoded["batteries"]["101"]["Battery Level"], json!(80));
}
