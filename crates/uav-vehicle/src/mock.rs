//! Scriptable in-memory vehicle for exercising code that drives the
//! [`Vehicle`] trait without a bridge process.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use crate::api::{ConnectionState, Health, Vehicle};
use crate::error::VehicleError;

/// Records every remote call and fails the ones it was told to fail.
#[derive(Default)]
pub struct MockVehicle {
    calls: Mutex<Vec<String>>,
    fail: Mutex<HashSet<String>>,
    /// Number of `connection` polls that still report "not connected".
    pending_polls: AtomicU32,
    gps_ok: AtomicBool,
    home_ok: AtomicBool,
}

impl MockVehicle {
    /// A vehicle that is connected and healthy from the first poll.
    pub fn ready() -> Self {
        let mock = Self::default();
        mock.gps_ok.store(true, Ordering::Relaxed);
        mock.home_ok.store(true, Ordering::Relaxed);
        mock
    }

    /// Reports "not connected" for the first `polls` connection snapshots.
    pub fn connected_after(self, polls: u32) -> Self {
        self.pending_polls.store(polls, Ordering::Relaxed);
        self
    }

    /// Never reports a logical connection.
    pub fn never_connected(self) -> Self {
        self.connected_after(u32::MAX)
    }

    pub fn set_health(&self, gps_ok: bool, home_ok: bool) {
        self.gps_ok.store(gps_ok, Ordering::Relaxed);
        self.home_ok.store(home_ok, Ordering::Relaxed);
    }

    /// Makes every subsequent call recorded under `call` fail with an
    /// action-kind rejection. The key is either a bare operation name
    /// (`arm`) or the full recorded form (`set_param_float GF_ACTION=3`).
    pub fn fail_on(&self, call: &str) {
        self.fail.lock().unwrap().insert(call.to_string());
    }

    /// Every call recorded so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls whose name starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) -> Result<(), VehicleError> {
        let failed = {
            let fail = self.fail.lock().unwrap();
            fail.contains(&call) || call.split(' ').next().is_some_and(|op| fail.contains(op))
        };
        let command = call.split(' ').next().unwrap_or(&call).to_string();
        self.calls.lock().unwrap().push(call);
        if failed {
            return Err(VehicleError::Action {
                command,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Vehicle for MockVehicle {
    async fn arm(&self) -> Result<(), VehicleError> {
        self.record("arm".into())
    }

    async fn disarm(&self) -> Result<(), VehicleError> {
        self.record("disarm".into())
    }

    async fn takeoff(&self) -> Result<(), VehicleError> {
        self.record("takeoff".into())
    }

    async fn land(&self) -> Result<(), VehicleError> {
        self.record("land".into())
    }

    async fn hold(&self) -> Result<(), VehicleError> {
        self.record("hold".into())
    }

    async fn return_to_launch(&self) -> Result<(), VehicleError> {
        self.record("return_to_launch".into())
    }

    async fn terminate(&self) -> Result<(), VehicleError> {
        self.record("terminate".into())
    }

    async fn reboot(&self) -> Result<(), VehicleError> {
        self.record("reboot".into())
    }

    async fn set_takeoff_altitude(&self, altitude: f32) -> Result<(), VehicleError> {
        self.record(format!("set_takeoff_altitude {altitude}"))
    }

    async fn set_param_int(&self, name: &str, value: i32) -> Result<(), VehicleError> {
        self.record(format!("set_param_int {name}={value}"))
    }

    async fn set_param_float(&self, name: &str, value: f32) -> Result<(), VehicleError> {
        self.record(format!("set_param_float {name}={value}"))
    }

    async fn connection(&self) -> Result<ConnectionState, VehicleError> {
        let pending = self.pending_polls.load(Ordering::Relaxed);
        if pending > 0 {
            if pending != u32::MAX {
                self.pending_polls.store(pending - 1, Ordering::Relaxed);
            }
            return Ok(ConnectionState { connected: false });
        }
        Ok(ConnectionState { connected: true })
    }

    async fn health(&self) -> Result<Health, VehicleError> {
        Ok(Health {
            global_position_ok: self.gps_ok.load(Ordering::Relaxed),
            home_position_ok: self.home_ok.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_in_order() {
        let mock = MockVehicle::ready();
        mock.hold().await.unwrap();
        mock.land().await.unwrap();
        assert_eq!(mock.calls(), vec!["hold", "land"]);
    }

    #[tokio::test]
    async fn injected_failure_is_an_action_error() {
        let mock = MockVehicle::ready();
        mock.fail_on("arm");
        let err = mock.arm().await.unwrap_err();
        assert!(err.is_action());
        // The call is still recorded: the remote attempt happened.
        assert_eq!(mock.count("arm"), 1);
    }

    #[tokio::test]
    async fn param_failures_match_by_name() {
        let mock = MockVehicle::ready();
        mock.fail_on("set_param_float GF_ACTION=3");
        assert!(mock.set_param_float("GF_ACTION", 3.0).await.is_err());
        assert!(mock.set_param_float("OTHER", 3.0).await.is_ok());
    }

    #[tokio::test]
    async fn connection_countdown() {
        let mock = MockVehicle::ready().connected_after(2);
        assert!(!mock.connection().await.unwrap().connected);
        assert!(!mock.connection().await.unwrap().connected);
        assert!(mock.connection().await.unwrap().connected);
    }
}
