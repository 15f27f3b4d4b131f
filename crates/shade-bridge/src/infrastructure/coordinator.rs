//! Coordinator connection lifecycle.
//!
//! Maintains exactly one outbound WebSocket connection to the cloud
//! coordinator, authenticated by the static `x-shade-token` header presented
//! at connect time. Responsibilities:
//!
//! - Dial, with the token attached as connection metadata.
//! - Read inbound frames one at a time and answer each on the same
//!   connection before reading the next — responses keep frame order.
//! - Heartbeat with WebSocket ping/pong; a pong that stays out past the
//!   timeout tears the connection down for reconnect, not process exit.
//! - Reconnect on any drop with doubling backoff capped at a maximum, reset
//!   after a connection that established successfully.
//! - Stop reconnecting and close cleanly on shutdown.
//!
//! Connection faults are logged and recovered here; none of them terminate
//! the daemon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Notify;
use tokio::time::interval;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message as WsMessage},
};
use tracing::{debug, info, warn};

use crate::application::Router;
use crate::domain::BridgeConfig;

/// How one established connection ended.
enum SessionEnd {
    /// Shutdown was requested; the close frame has been sent.
    Shutdown,
    /// The coordinator closed the connection or the stream ended.
    Closed,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the connect / serve / reconnect loop until `running` is cleared.
///
/// `shutdown` wakes an in-flight session's select loop immediately when the
/// flag is cleared, so shutdown does not wait out a reconnect backoff or an
/// idle read.
///
/// # Errors
///
/// Only configuration-level failures (an unparseable coordinator URL or a
/// token that cannot be a header value) surface here; transport failures are
/// handled by the reconnect policy.
pub async fn run_bridge(
    config: Arc<BridgeConfig>,
    router: Arc<Router>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
) -> anyhow::Result<()> {
    let mut delay = config.reconnect_delay;

    while running.load(Ordering::Relaxed) {
        info!("opening web socket to {}", config.coordinator_url);

        match run_connection(&config, &router, &shutdown).await {
            Ok(SessionEnd::Shutdown) => break,
            Ok(SessionEnd::Closed) => {
                info!("connection closed; reconnecting in {:?}", config.reconnect_delay);
                delay = config.reconnect_delay;
            }
            Err(e) => {
                warn!("connection error: {e:#}; reconnecting in {delay:?}");
            }
        }

        if !running.load(Ordering::Relaxed) {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.notified() => break,
        }
        delay = (delay * 2).min(config.reconnect_max_delay);
    }

    info!("coordinator connection loop stopped");
    Ok(())
}

// ── One connection ────────────────────────────────────────────────────────────

/// Dials the coordinator and serves frames until the connection ends.
async fn run_connection(
    config: &BridgeConfig,
    router: &Router,
    shutdown: &Notify,
) -> anyhow::Result<SessionEnd> {
    let mut request = config
        .coordinator_url
        .as_str()
        .into_client_request()
        .with_context(|| format!("invalid coordinator URL: {}", config.coordinator_url))?;
    request.headers_mut().insert(
        "x-shade-token",
        HeaderValue::from_str(&config.coordinator_token)
            .context("coordinator token is not a valid header value")?,
    );

    let (ws_stream, _response) = connect_async(request).await.with_context(|| {
        format!("failed to connect to coordinator at {}", config.coordinator_url)
    })?;
    info!("opened connection");

    let (mut sink, mut stream) = ws_stream.split();

    let mut ticker = interval(config.ping_interval);
    ticker.tick().await; // the first tick fires immediately; skip it
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("shutdown requested; closing connection");
                let _ = sink.send(WsMessage::Close(None)).await;
                return Ok(SessionEnd::Shutdown);
            }

            _ = ticker.tick() => {
                // A pong older than interval + timeout means the previous
                // ping went unanswered past the deadline.
                if last_pong.elapsed() > config.ping_interval + config.ping_timeout {
                    anyhow::bail!(
                        "heartbeat timed out ({:?} without a pong)",
                        last_pong.elapsed()
                    );
                }
                sink.send(WsMessage::Ping(Vec::new()))
                    .await
                    .context("failed to send heartbeat ping")?;
                debug!("sent heartbeat ping");
            }

            frame = stream.next() => match frame {
                None => {
                    info!("connection closed by coordinator");
                    return Ok(SessionEnd::Closed);
                }
                Some(Err(e)) => {
                    return Err(anyhow::Error::new(e).context("web socket read failed"));
                }
                Some(Ok(WsMessage::Text(text))) => {
                    // One frame at a time: the response is written before the
                    // next frame is read. Fan-out happens inside `process`.
                    let response = router.process(&text).await;
                    sink.send(WsMessage::Text(response))
                        .await
                        .context("failed to send response frame")?;
                }
                Some(Ok(WsMessage::Ping(payload))) => {
                    sink.send(WsMessage::Pong(payload))
                        .await
                        .context("failed to answer coordinator ping")?;
                }
                Some(Ok(WsMessage::Pong(_))) => {
                    last_pong = Instant::now();
                    debug!("heartbeat pong received");
                }
                Some(Ok(WsMessage::Close(_))) => {
                    info!("coordinator sent close frame");
                    return Ok(SessionEnd::Closed);
                }
                Some(Ok(WsMessage::Binary(_))) => {
                    // The coordinator protocol is JSON text frames only.
                    warn!("unexpected binary frame from coordinator (ignored)");
                }
                Some(Ok(WsMessage::Frame(_))) => {
                    debug!("raw frame (ignored)");
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
