use std::path::PathBuf;
use std::time::Duration;

use crate::actions::ActionTimeouts;

/// Default bridge control port, matching the fleet image.
pub const DEFAULT_CONTROL_PORT: u16 = 50040;

/// Default data-plane port between the bridge and the autopilot.
pub const DEFAULT_COMMAND_PORT: u16 = 14540;

/// Everything a run needs besides the request itself: ports, file
/// locations and timing. Built once from the CLI, defaults matching the
/// deployed layout.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub control_port: u16,
    pub command_port: u16,
    /// How long the freshly spawned bridge gets to start listening.
    pub listen_timeout: Duration,
    /// How long the vehicle gets to report a logical connection.
    pub connect_timeout: Duration,
    /// Interval between connection-state polls.
    pub connect_poll: Duration,
    /// Grace both for evicting a stale bridge and for teardown.
    pub grace: Duration,
    pub identity_dir: PathBuf,
    pub config_path: PathBuf,
    pub common_params_path: PathBuf,
    pub update_script: PathBuf,
    /// Explicit bridge executable location, ahead of the search path.
    pub bridge_override: Option<PathBuf>,
    pub timeouts: ActionTimeouts,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            control_port: DEFAULT_CONTROL_PORT,
            command_port: DEFAULT_COMMAND_PORT,
            listen_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            connect_poll: Duration::from_millis(500),
            grace: Duration::from_secs(5),
            identity_dir: PathBuf::from("."),
            config_path: PathBuf::from("config.csv"),
            common_params_path: PathBuf::from("common_params.csv"),
            update_script: PathBuf::from("tools/update_repo_ssh.sh"),
            bridge_override: None,
            timeouts: ActionTimeouts::default(),
        }
    }
}
