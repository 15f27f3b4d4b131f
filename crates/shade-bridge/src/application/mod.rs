//! Application layer: session lifecycle, command execution, frame routing.

pub mod executor;
pub mod router;
pub mod session;

pub use executor::CommandExecutor;
pub use router::Router;
pub use session::{DeviceSession, SessionError, SessionFactory, SessionManager};
