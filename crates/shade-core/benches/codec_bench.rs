//! Criterion benchmarks for the JSON frame codec.
//!
//! The bridge decodes and encodes one frame per request on the hot path of
//! the connection loop; these benchmarks keep an eye on that cost.
//!
//! Run with:
//! ```bash
//! cargo bench --package shade-core --bench codec_bench
//! ```

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use shade_core::{decode_request, encode_response, BlindStatus, ShadeResponse};

// ── Frame fixtures ────────────────────────────────────────────────────────────

const STATUS_REQUEST: &str = r#"{"action":"status","blinds":[101,102,103,104,105,106,107,108]}"#;

const SET_LEVELS_REQUEST: &str = concat!(
    r#"{"action":"set-levels","blinds":["#,
    r#"{"id":101,"level":75},{"id":102,"level":0},{"id":103,"level":100},"#,
    r#"{"id":104,"level":25},{"id":105,"level":50}]}"#,
);

fn make_status_response() -> ShadeResponse {
    let mut blinds = BTreeMap::new();
    for id in 101..109 {
        blinds.insert(
            id,
            BlindStatus {
                level: i64::from(id) % 100,
                stopped: id % 2 == 0,
            },
        );
    }
    ShadeResponse::Status { blinds }
}

fn make_positions_response() -> ShadeResponse {
    let mut positions = serde_json::Map::new();
    for id in 101..133 {
        positions.insert(
            id.to_string(),
            json!({"Level": id % 100, "Target Level": id % 100, "Stopped": 1}),
        );
    }
    ShadeResponse::Positions {
        positions: positions.into(),
    }
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_request");
    group.bench_function("status", |b| {
        b.iter(|| decode_request(black_box(STATUS_REQUEST)).unwrap())
    });
    group.bench_function("set_levels", |b| {
        b.iter(|| decode_request(black_box(SET_LEVELS_REQUEST)).unwrap())
    });
    group.bench_function("unknown_action", |b| {
        b.iter(|| decode_request(black_box(r#"{"action":"reboot"}"#)).unwrap_err())
    });
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let status = make_status_response();
    let positions = make_positions_response();

    let mut group = c.benchmark_group("encode_response");
    group.bench_function("status", |b| {
        b.iter(|| encode_response(black_box(&status)).unwrap())
    });
    group.bench_function("positions_bulk", |b| {
        b.iter(|| encode_response(black_box(&positions)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
