//! Vehicle-protocol stub.
//!
//! The orchestration engine talks to the vehicle exclusively through the
//! [`Vehicle`] trait. The production implementation, [`BridgeClient`],
//! speaks newline-delimited JSON to the bridge process's control port; the
//! wire format beyond that framing is the bridge's concern, not ours.

mod api;
pub use api::{ConnectionState, Health, Vehicle};

mod error;
pub use error::VehicleError;

mod client;
pub use client::BridgeClient;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
