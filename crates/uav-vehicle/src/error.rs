use thiserror::Error;

#[derive(Debug, Error)]
pub enum VehicleError {
    /// The vehicle understood the command and refused it. Distinguished
    /// from transport trouble so dispatch can label it precisely.
    #[error("command '{command}' rejected by vehicle: {reason}")]
    Action { command: String, reason: String },

    /// The bridge reported a failure that is not a vehicle-level
    /// rejection (backend unavailable, unsupported command, ...).
    #[error("command '{command}' failed: {reason}")]
    Failed { command: String, reason: String },

    #[error("bridge transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The bridge answered with something that is not a valid reply frame.
    #[error("malformed bridge reply: {0}")]
    Protocol(String),
}

impl VehicleError {
    /// Returns `true` for protocol-level command rejections.
    pub fn is_action(&self) -> bool {
        matches!(self, VehicleError::Action { .. })
    }
}
