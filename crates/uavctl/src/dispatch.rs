//! The run envelope.
//!
//! One state machine per invocation: resolve identity and config, evict a
//! stale bridge, launch a fresh one, confirm the logical connection, apply
//! requested parameters, execute the single action, tear the bridge down.
//! Every failure is logged and folded into the [`Outcome`]; nothing past
//! a successful launch may skip teardown.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info};

use uav_bridge::{BridgeProcess, await_ready, evict_port, locate_executable};
use uav_model::{Action, RunRequest};
use uav_vehicle::{BridgeClient, Vehicle};

use crate::actions;
use crate::host::HostControl;
use crate::outcome::Outcome;
use crate::params::apply_batch;
use crate::settings::RunSettings;
use crate::sources;
use crate::status::{Color, StatusLed};
use crate::update::run_update;

/// Executes one run request end to end and returns its outcome.
pub async fn run(
    request: &RunRequest,
    settings: &RunSettings,
    led: &dyn StatusLed,
    host: &dyn HostControl,
) -> Outcome {
    let outcome = Outcome::new();
    info!(
        action = request.action.kind(),
        altitude = request.altitude,
        params = request.parameters.len(),
        reboot_after = request.reboot_after,
        "run requested"
    );

    // update_code never touches identity, config or the bridge.
    if request.action == Action::UpdateCode {
        led.set(Color::YELLOW);
        match run_update(&settings.update_script, request.branch.as_deref()).await {
            Ok(()) => led.set(Color::GREEN),
            Err(e) => {
                error!("{e}");
                outcome.fail();
                led.set(Color::RED);
            }
        }
        led.off();
        return outcome;
    }

    let hw_id = match sources::read_hw_id(&settings.identity_dir) {
        Ok(id) => id,
        Err(e) => {
            error!("cannot resolve hardware identity: {e}");
            outcome.fail();
            return outcome;
        }
    };

    let config = if request.action.needs_config() {
        match sources::lookup_config(&settings.config_path, hw_id) {
            Ok(config) => Some(config),
            Err(e) => {
                error!("cannot resolve drone config: {e}");
                outcome.fail();
                return outcome;
            }
        }
    } else {
        None
    };

    // A resolved config row describes this airframe's ports; otherwise the
    // built-in defaults apply.
    let control_port = config.as_ref().map_or(settings.control_port, |c| c.control_port);
    let command_port = config.as_ref().map_or(settings.command_port, |c| c.command_port);

    if let Err(e) = evict_port(control_port, settings.grace).await {
        error!("cannot free the control port: {e}");
        outcome.fail();
        return outcome;
    }

    let executable = match locate_executable(settings.bridge_override.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            error!("{e}");
            outcome.fail();
            return outcome;
        }
    };

    let bridge = match BridgeProcess::launch(
        &executable,
        control_port,
        command_port,
        settings.listen_timeout,
    )
    .await
    {
        Ok(bridge) => bridge,
        Err(e) => {
            error!("{e}");
            outcome.fail();
            return outcome;
        }
    };

    // From here on the bridge is live: whatever happens below, teardown runs.
    connected_phase(request, settings, led, host, hw_id, control_port, &outcome).await;
    bridge.teardown(settings.grace).await;
    led.off();
    info!(failed = outcome.failed(), "run finished");
    outcome
}

/// Everything between BRIDGE_UP and teardown.
async fn connected_phase(
    request: &RunRequest,
    settings: &RunSettings,
    led: &dyn StatusLed,
    host: &dyn HostControl,
    hw_id: u32,
    control_port: u16,
    outcome: &Outcome,
) {
    let client = match BridgeClient::connect_local(control_port).await {
        Ok(client) => client,
        Err(e) => {
            error!("cannot reach the bridge control port: {e}");
            outcome.fail();
            return;
        }
    };

    if !negotiate(&client, settings.connect_timeout, settings.connect_poll).await {
        error!(
            "vehicle did not report a connection within {:?}",
            settings.connect_timeout
        );
        outcome.fail();
        return;
    }
    info!("vehicle connected");

    if !request.parameters.is_empty() {
        apply_batch(&client, &request.parameters, outcome).await;
    }

    execute(request, &client, led, host, hw_id, settings, outcome).await;
}

/// Bounded wait for the vehicle's logical connection, polling the latest
/// known state. Probe errors count as "not connected yet".
pub async fn negotiate(vehicle: &dyn Vehicle, timeout: Duration, poll: Duration) -> bool {
    await_ready(
        move || async move { matches!(vehicle.connection().await, Ok(state) if state.connected) },
        timeout,
        poll,
    )
    .await
}

/// Dispatches the single requested action through the guarded wrapper.
pub async fn execute(
    request: &RunRequest,
    vehicle: &dyn Vehicle,
    led: &dyn StatusLed,
    host: &dyn HostControl,
    hw_id: u32,
    settings: &RunSettings,
    outcome: &Outcome,
) {
    let timeouts = &settings.timeouts;
    let name = request.action.kind();
    let ok = match request.action {
        Action::Takeoff => {
            guarded(name, led, actions::takeoff(vehicle, led, request.altitude, timeouts)).await
        }
        Action::Land => guarded(name, led, actions::land(vehicle, led, timeouts)).await,
        Action::ReturnRtl => guarded(name, led, actions::return_rtl(vehicle, led, timeouts)).await,
        Action::Hold => guarded(name, led, actions::hold(vehicle, led)).await,
        Action::KillTerminate => guarded(name, led, actions::kill_terminate(vehicle, led)).await,
        Action::Test => guarded(name, led, actions::test(vehicle, led)).await,
        Action::RebootFc => {
            guarded(name, led, actions::reboot(vehicle, led, host, true, false)).await
        }
        Action::RebootSys => {
            guarded(name, led, actions::reboot(vehicle, led, host, false, true)).await
        }
        Action::InitSysid => guarded(name, led, actions::init_sysid(vehicle, led, hw_id)).await,
        Action::ApplyCommonParams => {
            guarded(
                name,
                led,
                actions::apply_common_params(
                    vehicle,
                    led,
                    &settings.common_params_path,
                    request.reboot_after,
                    outcome,
                ),
            )
            .await
        }
        // Dispatched before the bridge phase; nothing to do here.
        Action::UpdateCode => true,
    };
    if !ok {
        outcome.fail();
    }
}

/// Uniform action wrapper: entry/exit logging, error labeling, reduction
/// to a boolean. A vehicle-level rejection gets its distinct message; any
/// other error the generic one. Both count the same against the run.
async fn guarded<F>(name: &str, led: &dyn StatusLed, routine: F) -> bool
where
    F: Future<Output = Result<(), actions::ActionError>>,
{
    info!(action = name, "starting action");
    match routine.await {
        Ok(()) => {
            info!(action = name, "action completed");
            led.set(Color::GREEN);
            true
        }
        Err(e) if e.is_action() => {
            error!(action = name, "vehicle rejected the action: {e}");
            led.set(Color::RED);
            false
        }
        Err(e) => {
            error!(action = name, "action failed: {e}");
            led.set(Color::RED);
            false
        }
    }
}
