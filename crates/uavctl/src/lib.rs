//! Command orchestration for a single vehicle action.
//!
//! The binary wires a run together: resolve identity and config, bring the
//! bridge process up, confirm the logical connection, apply parameters,
//! execute exactly one action, tear the bridge down, exit 0 or 1.

pub mod actions;
pub mod dispatch;
pub mod host;
pub mod outcome;
pub mod params;
pub mod settings;
pub mod sources;
pub mod status;
pub mod update;
