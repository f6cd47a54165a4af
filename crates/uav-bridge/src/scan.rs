//! Stale-instance detection and eviction.
//!
//! Before launching a bridge we check whether some earlier instance (or an
//! unrelated process) already holds the control port, and take the port
//! back: SIGTERM, a bounded wait, SIGKILL. Resolution goes through `/proc`
//! directly — listening socket inodes from `/proc/net/tcp{,6}` matched
//! against `/proc/<pid>/fd` symlinks.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::poll::await_ready;

const EVICT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// PID of the process listening on local TCP `port`, if any is visible.
///
/// Only implemented for Linux; elsewhere the scan sees nothing and
/// eviction degrades to a no-op.
#[cfg(target_os = "linux")]
pub fn listener_pid(port: u16) -> Option<u32> {
    let inodes = listening_inodes(port);
    if inodes.is_empty() {
        return None;
    }
    let entries = std::fs::read_dir("/proc").ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let Ok(fds) = std::fs::read_dir(format!("/proc/{pid}/fd")) else {
            continue;
        };
        for fd in fds.flatten() {
            if let Ok(target) = std::fs::read_link(fd.path())
                && let Some(s) = target.to_str()
                && let Some(inode) = s.strip_prefix("socket:[").and_then(|s| s.strip_suffix(']'))
                && inodes.contains(&inode.to_string())
            {
                return Some(pid);
            }
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
pub fn listener_pid(_port: u16) -> Option<u32> {
    None
}

/// Socket inodes in LISTEN state on `port`, from `/proc/net/tcp{,6}`.
#[cfg(target_os = "linux")]
fn listening_inodes(port: u16) -> Vec<String> {
    const TCP_LISTEN: &str = "0A";
    let mut inodes = Vec::new();
    for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
        let Ok(content) = std::fs::read_to_string(table) else {
            continue;
        };
        for line in content.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 || fields[3] != TCP_LISTEN {
                continue;
            }
            let Some(hex_port) = fields[1].rsplit(':').next() else {
                continue;
            };
            if u16::from_str_radix(hex_port, 16) == Ok(port) {
                inodes.push(fields[9].to_string());
            }
        }
    }
    inodes
}

/// Takes the control port back from a stale holder.
///
/// No-op when nothing listens on the port (idempotent) or when the holder
/// is this very process. Otherwise terminates the holder gracefully,
/// escalating to SIGKILL after `grace`, and waits for it to disappear.
pub async fn evict_port(port: u16, grace: Duration) -> Result<(), BridgeError> {
    let Some(pid) = listener_pid(port) else {
        debug!(target: "uav.bridge", port, "control port is free");
        return Ok(());
    };
    if pid == std::process::id() {
        warn!(target: "uav.bridge", port, "port is held by this process, leaving it alone");
        return Ok(());
    }

    info!(target: "uav.bridge", port, pid, "control port already taken, evicting");
    send_signal(pid, false);
    let gone = move || async move { !process_alive(pid) };
    if await_ready(gone, grace, EVICT_POLL_INTERVAL).await {
        info!(target: "uav.bridge", pid, "stale bridge terminated");
        return Ok(());
    }

    warn!(target: "uav.bridge", pid, "did not terminate within {grace:?}, killing");
    send_signal(pid, true);
    if await_ready(gone, grace, EVICT_POLL_INTERVAL).await {
        info!(target: "uav.bridge", pid, "stale bridge killed");
        Ok(())
    } else {
        Err(BridgeError::EvictFailed { pid, port })
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, force: bool) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
    if let Err(e) = kill(Pid::from_raw(pid as i32), signal) {
        debug!(target: "uav.bridge", pid, "signal {signal} failed: {e}");
    }
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _force: bool) {}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    // Signal 0: existence probe only. EPERM still means "exists".
    !matches!(
        kill(Pid::from_raw(pid as i32), None::<Signal>),
        Err(Errno::ESRCH)
    )
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn eviction_is_a_noop_on_a_free_port() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        evict_port(port, Duration::from_millis(200))
            .await
            .expect("free port evicts as no-op");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn scan_finds_our_own_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();

        assert_eq!(listener_pid(port), Some(std::process::id()));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn eviction_never_touches_this_process() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();

        evict_port(port, Duration::from_millis(200))
            .await
            .expect("self-held port is left alone");
        // Still alive and the socket still works.
        assert_eq!(listener_pid(port), Some(std::process::id()));
    }
}
