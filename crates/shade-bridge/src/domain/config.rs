//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is populated once at startup from CLI arguments and environment
//! variables (see `main.rs`); nothing in the domain or application layers
//! reads the environment directly, which keeps those layers trivial to embed
//! in tests.

use std::time::Duration;

/// All runtime configuration for the bridge daemon.
///
/// Build this struct once at startup and wrap it in an `Arc` to share across
/// tasks.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// WebSocket URL of the cloud coordinator, e.g.
    /// `wss://shade.deepsymmetry.org/ws`. Local development typically points
    /// this at `ws://localhost:3000/ws`.
    pub coordinator_url: String,

    /// Static bearer token presented to the coordinator as the
    /// `x-shade-token` header at connect time. Distinct from the downstream
    /// director token, which is short-lived and managed by the session layer.
    pub coordinator_token: String,

    /// Control4 account user name.
    pub account_user: String,

    /// Control4 account password, exchanged for bearer tokens at login.
    pub account_password: String,

    /// IP address or hostname of the Control4 director on the home LAN.
    pub director_host: String,

    /// How often to send a WebSocket ping to the coordinator.
    pub ping_interval: Duration,

    /// How long after a ping to wait for a pong before the connection is
    /// considered dead and torn down for reconnect.
    pub ping_timeout: Duration,

    /// Initial delay before a reconnect attempt; doubles after each failed
    /// attempt up to [`reconnect_max_delay`](Self::reconnect_max_delay).
    pub reconnect_delay: Duration,

    /// Upper bound on the reconnect backoff.
    pub reconnect_max_delay: Duration,

    /// Upper bound on any single downstream director call. A hung call fails
    /// the affected request instead of stalling heartbeat handling.
    pub downstream_timeout: Duration,
}

impl Default for BridgeConfig {
    /// Defaults suitable for local development against a coordinator on
    /// localhost. The heartbeat numbers match the production service's
    /// 60-second ping / 30-second timeout contract.
    fn default() -> Self {
        Self {
            coordinator_url: "ws://localhost:3000/ws".to_string(),
            coordinator_token: String::new(),
            account_user: String::new(),
            account_password: String::new(),
            director_host: "127.0.0.1".to_string(),
            ping_interval: Duration::from_secs(60),
            ping_timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            reconnect_max_delay: Duration::from_secs(60),
            downstream_timeout: Duration::from_secs(10),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
