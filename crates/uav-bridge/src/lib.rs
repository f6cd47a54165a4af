//! Bridge process supervision.
//!
//! The bridge is an external executable that exposes the vehicle protocol
//! on a local control port. This crate owns its whole lifetime for a run:
//! evicting a stale instance from the port, locating and spawning the
//! executable, draining its output in the background, waiting for the
//! port to listen, and tearing the process down gracefully (then
//! forcefully) at the end.

mod error;
pub use error::BridgeError;

mod poll;
pub use poll::{await_ready, wait_for_port};

mod scan;
pub use scan::{evict_port, listener_pid};

mod proc;
pub use proc::{BridgeProcess, locate_executable};

/// File name of the bridge executable searched next to the orchestrator.
pub const BRIDGE_EXECUTABLE: &str = "bridge_server";

/// Environment override for the bridge executable location.
pub const BRIDGE_PATH_ENV: &str = "BRIDGE_SERVER_PATH";
