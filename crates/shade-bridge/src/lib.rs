//! shade-bridge library crate.
//!
//! A long-running daemon that holds one persistent WebSocket connection to the
//! shade cloud coordinator and translates its commands into calls against a
//! Control4 blinds controller on the home LAN, answering every request frame
//! with a response frame on the same connection.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Coordinator (JSON frames over WebSocket)
//!         ↕
//! [shade-bridge]
//!   ├── domain/           Pure types: BridgeConfig
//!   ├── application/      Session manager, command executor, message router
//!   └── infrastructure/
//!         ├── coordinator/ Outbound WebSocket dial, heartbeat, reconnect
//!         └── director/    Control4 account + director REST gateway
//!         ↕
//! Control4 director (HTTPS on the home LAN)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no external dependencies (no I/O, no async, no frameworks).
//! - `application` depends on `domain` and `shade-core`; downstream access
//!   goes through the `DeviceSession`/`SessionFactory` traits it defines, so
//!   the whole command path is testable without a network.
//! - `infrastructure` depends on everything plus `tokio`, `tungstenite`, and
//!   `reqwest`, and provides the real collaborator implementations.

/// Domain layer: pure configuration types (no I/O).
pub mod domain;

/// Application layer: session lifecycle, command execution, frame routing.
pub mod application;

/// Infrastructure layer: coordinator connection and director gateway.
pub mod infrastructure;
