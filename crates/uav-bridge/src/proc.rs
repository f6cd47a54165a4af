//! Bridge executable resolution, spawn and teardown.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::poll::wait_for_port;
use crate::{BRIDGE_EXECUTABLE, BRIDGE_PATH_ENV};

/// Resolves the bridge executable.
///
/// Priority: explicit override, then the `BRIDGE_SERVER_PATH` environment
/// variable, then `bridge_server` next to the running binary, then the
/// binary's parent directory. A candidate that is not a regular file is
/// skipped rather than reported.
pub fn locate_executable(override_path: Option<&Path>) -> Result<PathBuf, BridgeError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = override_path {
        candidates.push(path.to_path_buf());
    }
    if let Ok(env_path) = std::env::var(BRIDGE_PATH_ENV) {
        candidates.push(PathBuf::from(env_path));
    }
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        candidates.push(dir.join(BRIDGE_EXECUTABLE));
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join(BRIDGE_EXECUTABLE));
        }
    }

    for candidate in candidates {
        if candidate.is_file() {
            debug!(target: "uav.bridge", path = %candidate.display(), "bridge executable resolved");
            return Ok(candidate);
        }
    }
    Err(BridgeError::ExecutableNotFound)
}

/// A launched bridge process, from spawn to teardown.
///
/// At most one live handle exists per control port within a run. Teardown
/// must be called exactly once; dropping the handle without it still kills
/// the child (`kill_on_drop`), so a panicking run cannot leak a bridge.
pub struct BridgeProcess {
    child: Child,
    control_port: u16,
    cancel: CancellationToken,
    drains: Vec<JoinHandle<()>>,
}

impl BridgeProcess {
    /// Spawns `exe -p <control_port> udp://:<command_port>` and waits for
    /// the control port to accept connections.
    ///
    /// Output streams are piped and drained on independent tasks so that
    /// neither can fill its buffer and stall the bridge. If the port does
    /// not open within `listen_timeout` the just-spawned process is
    /// stopped and [`BridgeError::ListenTimeout`] is returned.
    pub async fn launch(
        exe: &Path,
        control_port: u16,
        command_port: u16,
        listen_timeout: Duration,
    ) -> Result<Self, BridgeError> {
        info!(
            target: "uav.bridge",
            path = %exe.display(),
            control_port,
            command_port,
            "starting bridge"
        );

        let mut child = Command::new(exe)
            .arg("-p")
            .arg(control_port.to_string())
            .arg(format!("udp://:{command_port}"))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(BridgeError::Spawn)?;

        let cancel = CancellationToken::new();
        let mut drains = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            drains.push(spawn_drain(stdout, false, cancel.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(spawn_drain(stderr, true, cancel.clone()));
        }

        if !wait_for_port(control_port, listen_timeout).await {
            warn!(target: "uav.bridge", control_port, "bridge never started listening, stopping it");
            cancel.cancel();
            stop_child(&mut child, Duration::from_secs(1)).await;
            for drain in drains {
                let _ = drain.await;
            }
            return Err(BridgeError::ListenTimeout {
                port: control_port,
                timeout: listen_timeout,
            });
        }

        info!(target: "uav.bridge", control_port, "bridge ready");
        Ok(Self {
            child,
            control_port,
            cancel,
            drains,
        })
    }

    pub fn control_port(&self) -> u16 {
        self.control_port
    }

    /// OS pid of the bridge, while it runs.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Stops the bridge: SIGTERM, wait up to `grace`, SIGKILL on overrun,
    /// and always reap the child. Errors end up in the log; teardown
    /// itself never fails the run.
    pub async fn teardown(mut self, grace: Duration) {
        debug!(target: "uav.bridge", port = self.control_port, "tearing bridge down");
        self.cancel.cancel();
        stop_child(&mut self.child, grace).await;
        for drain in self.drains.drain(..) {
            let _ = drain.await;
        }
    }
}

/// Terminate-then-kill, always reaping the child before returning.
async fn stop_child(child: &mut Child, grace: Duration) {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(target: "uav.bridge", %status, "bridge already exited");
        return;
    }

    send_term(child);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => info!(target: "uav.bridge", %status, "bridge terminated"),
        Ok(Err(e)) => warn!(target: "uav.bridge", "waiting for bridge failed: {e}"),
        Err(_) => {
            warn!(target: "uav.bridge", "bridge ignored SIGTERM for {grace:?}, killing");
            match child.kill().await {
                Ok(()) => info!(target: "uav.bridge", "bridge killed"),
                Err(e) => warn!(target: "uav.bridge", "killing bridge failed: {e}"),
            }
        }
    }
}

#[cfg(unix)]
fn send_term(child: &Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if let Some(id) = child.id() {
        let _ = kill(Pid::from_raw(id as i32), Signal::SIGTERM);
    }
}

#[cfg(not(unix))]
fn send_term(child: &Child) {
    let _ = child;
}

/// Forwards one output stream to the log until EOF or teardown. Failures
/// here are logged and swallowed; they never reach the run outcome.
fn spawn_drain<R>(stream: R, is_stderr: bool, cancel: CancellationToken) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = lines.next_line() => match next {
                    Ok(Some(line)) if is_stderr => warn!(target: "uav.bridge.err", "{line}"),
                    Ok(Some(line)) => debug!(target: "uav.bridge.out", "{line}"),
                    Ok(None) => break,
                    Err(e) => {
                        debug!(target: "uav.bridge", "output drain stopped: {e}");
                        break;
                    }
                }
            }
        }
    })
}
