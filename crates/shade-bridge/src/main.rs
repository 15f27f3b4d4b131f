//! Shade bridge — entry point.
//!
//! This binary keeps one persistent WebSocket connection to the shade cloud
//! coordinator and translates its commands into calls against the Control4
//! blinds controller on the home LAN, answering every request over the same
//! connection.
//!
//! # Why a bridge process?
//!
//! The coordinator lives in the cloud and cannot reach the director on the
//! home LAN; the director speaks an authenticated local REST protocol the
//! coordinator has no business knowing. The bridge dials *out* to the
//! coordinator (no inbound firewall holes) and owns the director credential
//! lifecycle locally.
//!
//! # Usage
//!
//! ```text
//! shade-bridge [OPTIONS]
//!
//! Options:
//!   --ws-url <URL>             Coordinator WebSocket URL
//!   --shade-token <TOKEN>      Connection auth token (x-shade-token header)
//!   --c4-username <USER>       Control4 account user name
//!   --c4-password <PASSWORD>   Control4 account password
//!   --c4-director-ip <HOST>    Director address on the home LAN
//! ```
//!
//! # Environment variable overrides
//!
//! Every flag can come from the environment instead; CLI args take
//! precedence when both are present.
//!
//! | Variable                    | Default                           |
//! |-----------------------------|-----------------------------------|
//! | `SHADE_WS_URL`              | `wss://shade.deepsymmetry.org/ws` |
//! | `SHADE_TOKEN`               | (required)                        |
//! | `C4_USERNAME`               | (required)                        |
//! | `C4_PASSWORD`               | (required)                        |
//! | `C4_DIRECTOR_IP`            | (required)                        |
//! | `SHADE_PING_INTERVAL`       | `60` seconds                      |
//! | `SHADE_PING_TIMEOUT`        | `30` seconds                      |
//! | `SHADE_RECONNECT_DELAY`     | `5` seconds                       |
//! | `SHADE_RECONNECT_MAX_DELAY` | `60` seconds                      |
//! | `SHADE_DOWNSTREAM_TIMEOUT`  | `10` seconds                      |
//!
//! For local development set `SHADE_WS_URL` to `ws://localhost:3000/ws`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{ensure, Context};
use clap::Parser;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use shade_bridge::application::{CommandExecutor, Router, SessionError, SessionManager};
use shade_bridge::domain::BridgeConfig;
use shade_bridge::infrastructure::{run_bridge, DirectorGateway};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Bridge daemon between the shade cloud coordinator and a Control4 blinds
/// controller.
#[derive(Debug, Parser)]
#[command(
    name = "shade-bridge",
    about = "Bridges the shade cloud coordinator to a local Control4 blinds controller",
    version
)]
struct Cli {
    /// WebSocket URL of the cloud coordinator.
    #[arg(
        long,
        default_value = "wss://shade.deepsymmetry.org/ws",
        env = "SHADE_WS_URL"
    )]
    ws_url: String,

    /// Static auth token presented as the `x-shade-token` header at connect
    /// time.
    #[arg(long, env = "SHADE_TOKEN", hide_env_values = true)]
    shade_token: String,

    /// Control4 account user name.
    #[arg(long, env = "C4_USERNAME")]
    c4_username: String,

    /// Control4 account password.
    #[arg(long, env = "C4_PASSWORD", hide_env_values = true)]
    c4_password: String,

    /// IP address or hostname of the director on the home LAN.
    #[arg(long, env = "C4_DIRECTOR_IP")]
    c4_director_ip: String,

    /// Heartbeat ping interval in seconds.
    #[arg(long, default_value_t = 60, env = "SHADE_PING_INTERVAL")]
    ping_interval: u64,

    /// Seconds to wait for a pong before the connection counts as dead.
    #[arg(long, default_value_t = 30, env = "SHADE_PING_TIMEOUT")]
    ping_timeout: u64,

    /// Initial reconnect delay in seconds; doubles per failed attempt.
    #[arg(long, default_value_t = 5, env = "SHADE_RECONNECT_DELAY")]
    reconnect_delay: u64,

    /// Upper bound on the reconnect delay in seconds.
    #[arg(long, default_value_t = 60, env = "SHADE_RECONNECT_MAX_DELAY")]
    reconnect_max_delay: u64,

    /// Upper bound on any single downstream director call, in seconds.
    #[arg(long, default_value_t = 10, env = "SHADE_DOWNSTREAM_TIMEOUT")]
    downstream_timeout: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error when `--ws-url` is not a `ws://` or `wss://` URL.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        ensure!(
            self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://"),
            "coordinator URL must use the ws:// or wss:// scheme, got '{}'",
            self.ws_url
        );

        Ok(BridgeConfig {
            coordinator_url: self.ws_url,
            coordinator_token: self.shade_token,
            account_user: self.c4_username,
            account_password: self.c4_password,
            director_host: self.c4_director_ip,
            ping_interval: Duration::from_secs(self.ping_interval),
            ping_timeout: Duration::from_secs(self.ping_timeout),
            reconnect_delay: Duration::from_secs(self.reconnect_delay),
            reconnect_max_delay: Duration::from_secs(self.reconnect_max_delay),
            downstream_timeout: Duration::from_secs(self.downstream_timeout),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log level is controlled by RUST_LOG; default to info.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(cli.into_bridge_config()?);

    info!(
        "shade bridge starting — coordinator={}, director={}",
        config.coordinator_url, config.director_host
    );

    let gateway = DirectorGateway::new(&config).context("failed to build director gateway")?;
    let sessions = Arc::new(SessionManager::new(
        Arc::new(gateway),
        config.downstream_timeout,
    ));

    // Log in eagerly so the first request does not pay the handshake. A bad
    // credential is logged and the daemon keeps running: requests then fail
    // individually with error frames rather than the process dying.
    match sessions.authenticate().await {
        Ok(()) => {}
        Err(SessionError::BadCredentials) => {
            error!("error authenticating with the Control4 account API: incorrect username or password");
        }
        Err(e) => warn!("initial director login failed: {e}; will retry on first request"),
    }

    let router = Arc::new(Router::new(CommandExecutor::new(Arc::clone(&sessions))));

    // Graceful shutdown: Ctrl+C clears the running flag and wakes any select
    // loop that is mid-session or sleeping out a reconnect backoff.
    let running = Arc::new(AtomicBool::new(true));
    let shutdown = Arc::new(Notify::new());
    {
        let running = Arc::clone(&running);
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received Ctrl+C — initiating graceful shutdown");
                    running.store(false, Ordering::Relaxed);
                    shutdown.notify_waiters();
                }
                Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
            }
        });
    }

    run_bridge(config, router, running, shutdown).await?;

    info!("shade bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// The required credential flags, so tests can focus on one knob at a time.
    const REQUIRED: [&str; 9] = [
        "shade-bridge",
        "--shade-token",
        "secret",
        "--c4-username",
        "user@example.org",
        "--c4-password",
        "hunter2",
        "--c4-director-ip",
        "192.168.1.25",
    ];

    fn parse(extra: &[&str]) -> Cli {
        let args: Vec<&str> = REQUIRED.iter().chain(extra.iter()).copied().collect();
        Cli::parse_from(args)
    }

    #[test]
    fn test_cli_default_ws_url_is_production_coordinator() {
        let cli = parse(&[]);
        assert_eq!(cli.ws_url, "wss://shade.deepsymmetry.org/ws");
    }

    #[test]
    fn test_cli_default_ping_interval() {
        let cli = parse(&[]);
        assert_eq!(cli.ping_interval, 60);
    }

    #[test]
    fn test_cli_default_ping_timeout() {
        let cli = parse(&[]);
        assert_eq!(cli.ping_timeout, 30);
    }

    #[test]
    fn test_cli_default_reconnect_knobs() {
        let cli = parse(&[]);
        assert_eq!(cli.reconnect_delay, 5);
        assert_eq!(cli.reconnect_max_delay, 60);
    }

    #[test]
    fn test_cli_ws_url_override() {
        let cli = parse(&["--ws-url", "ws://localhost:3000/ws"]);
        assert_eq!(cli.ws_url, "ws://localhost:3000/ws");
    }

    #[test]
    fn test_cli_missing_required_credentials_fails() {
        let result = Cli::try_parse_from(["shade-bridge"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_bridge_config_maps_all_fields() {
        let cli = parse(&["--ws-url", "ws://localhost:3000/ws", "--ping-interval", "15"]);
        let config = cli.into_bridge_config().unwrap();
        assert_eq!(config.coordinator_url, "ws://localhost:3000/ws");
        assert_eq!(config.coordinator_token, "secret");
        assert_eq!(config.account_user, "user@example.org");
        assert_eq!(config.director_host, "192.168.1.25");
        assert_eq!(config.ping_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_into_bridge_config_rejects_non_websocket_url() {
        let cli = parse(&["--ws-url", "https://shade.deepsymmetry.org/ws"]);
        let result = cli.into_bridge_config();
        assert!(result.is_err());
    }
}
