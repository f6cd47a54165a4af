//! The action routines themselves.
//!
//! Each routine is the essential remote-call sequence for one action,
//! with in-progress status colors on the side. Success/failure colors and
//! outcome reduction live in the dispatch wrapper.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use uav_vehicle::{Vehicle, VehicleError};

use crate::host::HostControl;
use crate::outcome::Outcome;
use crate::params::apply_batch;
use crate::sources::{SourceError, load_common_params};
use crate::status::{Color, StatusLed};

/// Timing knobs for the routines, overridable for tests.
#[derive(Debug, Clone)]
pub struct ActionTimeouts {
    /// Bound on waiting for GPS fix and home position before takeoff.
    pub preflight: Duration,
    /// Interval between health snapshots during preflight.
    pub health_poll: Duration,
    /// Pause between `hold` and the follow-up command in land/RTL.
    pub settle: Duration,
}

impl Default for ActionTimeouts {
    fn default() -> Self {
        Self {
            preflight: Duration::from_secs(15),
            health_poll: Duration::from_secs(1),
            settle: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Vehicle(#[from] VehicleError),

    #[error("preflight checks timed out: GPS or home position not ready")]
    PreflightTimeout,

    #[error("hardware id {0} does not fit the system-id parameter")]
    IdentityRange(u32),

    #[error("host reboot failed: {0}")]
    Host(#[source] std::io::Error),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ActionError {
    /// `true` when the vehicle itself rejected a command, as opposed to
    /// everything else that can go wrong around one.
    pub fn is_action(&self) -> bool {
        matches!(self, ActionError::Vehicle(e) if e.is_action())
    }
}

/// Waits for the two takeoff preconditions. Flags are sticky: once any
/// snapshot reported GPS (or home) as good it stays good for the rest of
/// the wait.
async fn preflight(vehicle: &dyn Vehicle, timeouts: &ActionTimeouts) -> bool {
    info!("checking preflight conditions");
    let deadline = Instant::now() + timeouts.preflight;
    let mut gps_ok = false;
    let mut home_ok = false;
    loop {
        match vehicle.health().await {
            Ok(health) => {
                gps_ok |= health.global_position_ok;
                home_ok |= health.home_position_ok;
            }
            Err(e) => debug!("health probe failed: {e}"),
        }
        if gps_ok && home_ok {
            info!("preflight passed: GPS and home position good");
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(timeouts.health_poll).await;
    }
}

pub async fn takeoff(
    vehicle: &dyn Vehicle,
    led: &dyn StatusLed,
    altitude: f32,
    timeouts: &ActionTimeouts,
) -> Result<(), ActionError> {
    if !preflight(vehicle, timeouts).await {
        return Err(ActionError::PreflightTimeout);
    }
    led.set(Color::YELLOW);
    vehicle.set_takeoff_altitude(altitude).await?;
    vehicle.arm().await?;
    led.set(Color::WHITE);
    vehicle.takeoff().await?;
    info!(altitude, "takeoff commanded");
    Ok(())
}

pub async fn land(
    vehicle: &dyn Vehicle,
    led: &dyn StatusLed,
    timeouts: &ActionTimeouts,
) -> Result<(), ActionError> {
    led.set(Color::YELLOW);
    vehicle.hold().await?;
    sleep(timeouts.settle).await;
    led.set(Color::BLUE);
    vehicle.land().await?;
    Ok(())
}

pub async fn return_rtl(
    vehicle: &dyn Vehicle,
    led: &dyn StatusLed,
    timeouts: &ActionTimeouts,
) -> Result<(), ActionError> {
    led.set(Color::MAGENTA);
    vehicle.hold().await?;
    sleep(timeouts.settle).await;
    led.set(Color::BLUE);
    vehicle.return_to_launch().await?;
    Ok(())
}

pub async fn hold(vehicle: &dyn Vehicle, led: &dyn StatusLed) -> Result<(), ActionError> {
    led.set(Color::BLUE);
    vehicle.hold().await?;
    Ok(())
}

/// Flight termination. Deliberately no arm/disarm gate: this is the
/// emergency path.
pub async fn kill_terminate(vehicle: &dyn Vehicle, led: &dyn StatusLed) -> Result<(), ActionError> {
    led.set(Color::RED);
    vehicle.terminate().await?;
    Ok(())
}

/// Arm/disarm round-trip to verify the whole command path.
pub async fn test(vehicle: &dyn Vehicle, led: &dyn StatusLed) -> Result<(), ActionError> {
    led.set(Color::RED);
    vehicle.arm().await?;
    led.set(Color::WHITE);
    vehicle.disarm().await?;
    Ok(())
}

pub async fn reboot(
    vehicle: &dyn Vehicle,
    led: &dyn StatusLed,
    host: &dyn HostControl,
    flight_controller: bool,
    system: bool,
) -> Result<(), ActionError> {
    led.set(Color::YELLOW);
    if flight_controller {
        vehicle.reboot().await?;
        info!("flight controller reboot issued");
    }
    if system {
        led.off();
        host.reboot_system().await.map_err(ActionError::Host)?;
        info!("system reboot issued");
    }
    Ok(())
}

pub async fn init_sysid(
    vehicle: &dyn Vehicle,
    led: &dyn StatusLed,
    hw_id: u32,
) -> Result<(), ActionError> {
    let sys_id = i32::try_from(hw_id).map_err(|_| ActionError::IdentityRange(hw_id))?;
    led.set(Color::YELLOW);
    vehicle.set_param_int("MAV_SYS_ID", sys_id).await?;
    info!(hw_id, "system id written, rebooting flight controller");
    led.set(Color::CYAN);
    vehicle.reboot().await?;
    Ok(())
}

pub async fn apply_common_params(
    vehicle: &dyn Vehicle,
    led: &dyn StatusLed,
    path: &std::path::Path,
    reboot_after: bool,
    outcome: &Outcome,
) -> Result<(), ActionError> {
    led.set(Color::MAGENTA);
    let entries = load_common_params(path)?;
    info!(count = entries.len(), "applying common parameters");

    if apply_batch(vehicle, &entries, outcome).await {
        led.set(Color::GREEN);
    }
    if reboot_after {
        info!("rebooting flight controller as requested");
        led.set(Color::CYAN);
        vehicle.reboot().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::LogLed;
    use uav_vehicle::mock::MockVehicle;

    fn fast() -> ActionTimeouts {
        ActionTimeouts {
            preflight: Duration::from_millis(80),
            health_poll: Duration::from_millis(20),
            settle: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn takeoff_sequence_in_order() {
        let mock = MockVehicle::ready();
        takeoff(&mock, &LogLed, 15.0, &fast()).await.expect("takeoff");
        assert_eq!(
            mock.calls(),
            vec!["set_takeoff_altitude 15", "arm", "takeoff"]
        );
    }

    #[tokio::test]
    async fn takeoff_aborts_before_arming_without_health() {
        let mock = MockVehicle::ready();
        mock.set_health(true, false);

        let err = takeoff(&mock, &LogLed, 15.0, &fast()).await.unwrap_err();
        assert!(matches!(err, ActionError::PreflightTimeout));
        assert_eq!(mock.count("arm"), 0);
        assert_eq!(mock.count("takeoff"), 0);
    }

    #[tokio::test]
    async fn preflight_accumulates_across_snapshots() {
        // GPS good from the start, home flips good shortly after.
        let mock = std::sync::Arc::new(MockVehicle::ready());
        mock.set_health(true, false);
        let flip = mock.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            flip.set_health(true, true);
        });

        takeoff(&*mock, &LogLed, 10.0, &fast()).await.expect("takeoff");
    }

    #[tokio::test]
    async fn land_holds_first() {
        let mock = MockVehicle::ready();
        land(&mock, &LogLed, &fast()).await.expect("land");
        assert_eq!(mock.calls(), vec!["hold", "land"]);
    }

    #[tokio::test]
    async fn rtl_holds_first() {
        let mock = MockVehicle::ready();
        return_rtl(&mock, &LogLed, &fast()).await.expect("rtl");
        assert_eq!(mock.calls(), vec!["hold", "return_to_launch"]);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let mock = MockVehicle::ready();
        test(&mock, &LogLed).await.expect("test");
        assert_eq!(mock.calls(), vec!["arm", "disarm"]);
    }

    #[tokio::test]
    async fn init_sysid_writes_then_reboots() {
        let mock = MockVehicle::ready();
        init_sysid(&mock, &LogLed, 7).await.expect("init_sysid");
        assert_eq!(mock.calls(), vec!["set_param_int MAV_SYS_ID=7", "reboot"]);
    }

    #[tokio::test]
    async fn vehicle_rejection_keeps_its_action_kind() {
        let mock = MockVehicle::ready();
        mock.fail_on("terminate");
        let err = kill_terminate(&mock, &LogLed).await.unwrap_err();
        assert!(err.is_action());
    }
}
