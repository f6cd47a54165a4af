use async_trait::async_trait;

use crate::error::VehicleError;

/// Latest known logical connection state between the bridge and the
/// vehicle autopilot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub connected: bool,
}

/// The two readiness flags the orchestration cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Health {
    pub global_position_ok: bool,
    pub home_position_ok: bool,
}

/// Remote operations the bridge exposes for the vehicle.
///
/// Every call is a single remote invocation; the engine never retries one
/// on its own. `connection` and `health` return the bridge's latest known
/// snapshot and are polled by the bounded readiness waits.
#[async_trait]
pub trait Vehicle: Send + Sync {
    async fn arm(&self) -> Result<(), VehicleError>;
    async fn disarm(&self) -> Result<(), VehicleError>;
    async fn takeoff(&self) -> Result<(), VehicleError>;
    async fn land(&self) -> Result<(), VehicleError>;
    async fn hold(&self) -> Result<(), VehicleError>;
    async fn return_to_launch(&self) -> Result<(), VehicleError>;
    async fn terminate(&self) -> Result<(), VehicleError>;
    async fn reboot(&self) -> Result<(), VehicleError>;
    async fn set_takeoff_altitude(&self, altitude: f32) -> Result<(), VehicleError>;
    async fn set_param_int(&self, name: &str, value: i32) -> Result<(), VehicleError>;
    async fn set_param_float(&self, name: &str, value: f32) -> Result<(), VehicleError>;
    async fn connection(&self) -> Result<ConnectionState, VehicleError>;
    async fn health(&self) -> Result<Health, VehicleError>;
}
