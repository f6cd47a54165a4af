//! CLI entry point.
//!
//! Exit code is the whole user-visible result: 0 for a clean run, 1 as
//! soon as anything anywhere failed.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use uav_model::{Action, RunRequest};
use uav_observe::{LogConfig, LogFormat};

use uavctl::dispatch;
use uavctl::host::LoginManager;
use uavctl::settings::{DEFAULT_COMMAND_PORT, DEFAULT_CONTROL_PORT, RunSettings};
use uavctl::status::LogLed;

#[derive(Parser, Debug)]
#[command(
    name = "uavctl",
    about = "Issue a single command to the vehicle through the local bridge process",
    version
)]
struct Cli {
    /// Action to perform: takeoff, land, hold, test, reboot_fc, reboot_sys,
    /// return_rtl, kill_terminate, init_sysid, apply_common_params, update_code
    #[arg(long)]
    action: String,

    /// Takeoff altitude in meters
    #[arg(long, default_value_t = 10.0)]
    altitude: f32,

    /// Set a vehicle parameter before the action; repeatable
    #[arg(long = "param", num_args = 2, value_names = ["NAME", "VALUE"], action = clap::ArgAction::Append)]
    param: Vec<String>,

    /// Branch name for update_code
    #[arg(long)]
    branch: Option<String>,

    /// Reboot the flight controller after apply_common_params
    #[arg(long)]
    reboot_after: bool,

    /// Bridge control port (overridden by a resolved config row)
    #[arg(long, default_value_t = DEFAULT_CONTROL_PORT)]
    control_port: u16,

    /// Bridge data-plane port (overridden by a resolved config row)
    #[arg(long, default_value_t = DEFAULT_COMMAND_PORT)]
    command_port: u16,

    /// Fleet config table
    #[arg(long, default_value = "config.csv")]
    config: PathBuf,

    /// Common-parameters table for apply_common_params
    #[arg(long, default_value = "common_params.csv")]
    common_params: PathBuf,

    /// Explicit bridge executable location
    #[arg(long)]
    bridge: Option<PathBuf>,

    /// Log filter, e.g. `info` or `uav=debug,info`
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output: text or json
    #[arg(long, default_value = "text")]
    log_format: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run_cli().await {
        Ok(code) => code,
        // Nothing is supposed to get here; whatever did still maps to 1.
        Err(e) => {
            eprintln!("uavctl: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let format: LogFormat = cli.log_format.parse()?;
    uav_observe::init(&LogConfig {
        format,
        level: cli.log_level.clone(),
        ..LogConfig::default()
    })?;

    // An unknown action is a run failure (exit 1), not a usage error.
    let action: Action = match cli.action.parse() {
        Ok(action) => action,
        Err(e) => {
            error!("{e}");
            return Ok(ExitCode::from(1));
        }
    };

    let request = RunRequest {
        action,
        altitude: cli.altitude,
        parameters: param_pairs(&cli.param),
        branch: cli.branch.clone(),
        reboot_after: cli.reboot_after,
    };
    let settings = RunSettings {
        control_port: cli.control_port,
        command_port: cli.command_port,
        config_path: cli.config.clone(),
        common_params_path: cli.common_params.clone(),
        bridge_override: cli.bridge.clone(),
        ..RunSettings::default()
    };

    let outcome = dispatch::run(&request, &settings, &LogLed, &LoginManager).await;
    Ok(outcome.exit_code())
}

/// clap collects `--param NAME VALUE` occurrences as a flat list; fold it
/// back into ordered pairs.
fn param_pairs(flat: &[String]) -> Vec<(String, String)> {
    flat.chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}
