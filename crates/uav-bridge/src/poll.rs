//! Bounded readiness polling.
//!
//! One primitive covers every "wait until X or give up" in the system:
//! probe, sleep, probe again, until the probe reports true or the deadline
//! passes. A timeout is an ordinary `false`, never an error — the caller
//! decides what giving up means.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{Instant, sleep};

/// Interval between TCP connect probes while waiting for the bridge port.
const PORT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Evaluates `probe` until it returns true or `timeout` elapses, sleeping
/// `interval` between attempts. The probe runs at least once; the last
/// attempt may start up to one interval past the deadline.
pub async fn await_ready<P, Fut>(mut probe: P, timeout: Duration, interval: Duration) -> bool
where
    P: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(interval).await;
    }
}

/// Waits until something accepts TCP connections on `127.0.0.1:port`.
pub async fn wait_for_port(port: u16, timeout: Duration) -> bool {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    await_ready(
        move || async move { TcpStream::connect(addr).await.is_ok() },
        timeout,
        PORT_POLL_INTERVAL,
    )
    .await
}
