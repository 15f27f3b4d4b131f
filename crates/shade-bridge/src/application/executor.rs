//! Command execution: one decoded request becomes one or more downstream
//! device operations, and their results become one response frame.
//!
//! Fan-out requests (`status`, `set-levels`) run their per-device operations
//! concurrently and join before the response is produced. The operations are
//! independent: one blind's failure is logged and never aborts its siblings,
//! so a response may legitimately carry partial results.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shade_core::{BlindId, BlindStatus, LevelSpec, ShadeRequest, ShadeResponse};

use crate::application::session::{SessionError, SessionManager};

// Director variable and command names, as the controller spells them.
const VAR_LEVEL: &str = "Level";
const VAR_STOPPED: &str = "Stopped";
const POSITIONS_VARS: &str = "Level,Target Level,Stopped";
const BATTERY_VARS: &str = "Battery Level";
const CMD_SET_LEVEL_TARGET: &str = "SET_LEVEL_TARGET";

/// Translates decoded requests into session-wrapped downstream operations.
pub struct CommandExecutor {
    sessions: Arc<SessionManager>,
}

impl CommandExecutor {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Executes one request to completion and produces its response frame.
    ///
    /// This function is total: downstream failures that sink a whole request
    /// come back as an `error` response frame, never as a daemon fault.
    pub async fn execute(&self, request: ShadeRequest) -> ShadeResponse {
        match request {
            ShadeRequest::Status { blinds } => self.status(blinds).await,
            ShadeRequest::SetLevels { blinds } => self.set_levels(blinds).await,
            ShadeRequest::Positions => self.positions().await,
            ShadeRequest::Batteries => self.batteries().await,
        }
    }

    /// Per-blind level/stopped queries, fanned out concurrently.
    async fn status(&self, blinds: Vec<BlindId>) -> ShadeResponse {
        let results = join_all(blinds.iter().map(|&id| self.fetch_status(id))).await;

        let mut map = BTreeMap::new();
        for (&id, result) in blinds.iter().zip(results) {
            match result {
                Ok(status) => {
                    map.insert(id, status);
                }
                // Partial results are acceptable: the failed blind is simply
                // absent from the response map.
                Err(e) => warn!("status query for blind {id} failed: {e}"),
            }
        }
        ShadeResponse::Status { blinds: map }
    }

    /// Both variables of one blind, fetched under a single retry scope so an
    /// expired token re-fetches this blind's pair only, not the whole batch.
    async fn fetch_status(&self, id: BlindId) -> Result<BlindStatus, SessionError> {
        self.sessions
            .with_session(|session| async move {
                let level = session.variable(id, VAR_LEVEL).await?;
                let stopped = session.variable(id, VAR_STOPPED).await?;
                Ok(BlindStatus {
                    level: as_level(&level),
                    stopped: as_stopped(&stopped),
                })
            })
            .await
    }

    /// Per-blind level commands, fanned out concurrently. The acknowledgement
    /// carries no per-device payload and is sent even when some commands
    /// failed — each failure is logged with its blind id.
    async fn set_levels(&self, blinds: Vec<LevelSpec>) -> ShadeResponse {
        let results = join_all(blinds.iter().map(|&spec| self.set_level(spec))).await;

        for (spec, result) in blinds.iter().zip(results) {
            match result {
                Ok(()) => debug!("blind {} moving to level {}", spec.id, spec.level),
                Err(e) => warn!("set-level command for blind {} failed: {e}", spec.id),
            }
        }
        ShadeResponse::SetLevels
    }

    async fn set_level(&self, spec: LevelSpec) -> Result<(), SessionError> {
        self.sessions
            .with_session(|session| async move {
                session
                    .command(
                        spec.id,
                        CMD_SET_LEVEL_TARGET,
                        json!({ "LEVEL_TARGET": spec.level }),
                    )
                    .await
            })
            .await
    }

    /// One bulk query for level/target/stopped across all items.
    async fn positions(&self) -> ShadeResponse {
        match self
            .sessions
            .with_session(|session| async move {
                session.all_item_variables(POSITIONS_VARS).await
            })
            .await
        {
            Ok(positions) => ShadeResponse::Positions { positions },
            Err(e) => {
                warn!("positions query failed: {e}");
                ShadeResponse::Error {
                    message: "positions query failed".to_string(),
                    details: Value::String(e.to_string()),
                }
            }
        }
    }

    /// One bulk query for battery level across all items.
    async fn batteries(&self) -> ShadeResponse {
        match self
            .sessions
            .with_session(|session| async move { session.all_item_variables(BATTERY_VARS).await })
            .await
        {
            Ok(batteries) => ShadeResponse::Batteries { batteries },
            Err(e) => {
                warn!("batteries query failed: {e}");
                ShadeResponse::Error {
                    message: "batteries query failed".to_string(),
                    details: Value::String(e.to_string()),
                }
            }
        }
    }
}

// ── Director value coercion ───────────────────────────────────────────────────

/// Levels arrive as JSON integers, but older director firmware reports floats.
fn as_level(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or(0)
}

/// The `Stopped` variable is a boolean in spirit but `0`/`1` on the wire for
/// most firmware revisions.
fn as_stopped(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
