use crate::Action;

/// Everything one invocation asked for. Built once from the CLI and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub action: Action,
    /// Target altitude in meters, used by `takeoff` only.
    pub altitude: f32,
    /// Repeatable `--param NAME VALUE` pairs, in the order given.
    pub parameters: Vec<(String, String)>,
    /// Branch for `update_code`.
    pub branch: Option<String>,
    /// Reboot the flight controller after `apply_common_params`.
    pub reboot_after: bool,
}

impl RunRequest {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            altitude: 10.0,
            parameters: Vec::new(),
            branch: None,
            reboot_after: false,
        }
    }
}
