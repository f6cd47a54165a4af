use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridge executable not found (checked override, alongside the binary, and the parent directory)")]
    ExecutableNotFound,

    #[error("failed to spawn bridge process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("bridge did not listen on port {port} within {timeout:?}")]
    ListenTimeout { port: u16, timeout: Duration },

    #[error("process {pid} holding port {port} survived SIGKILL")]
    EvictFailed { pid: u32, port: u16 },
}
