use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Monotonic run-failure accumulator.
///
/// Cloneable handle threaded through every component of a run. Any of them
/// may mark the run failed; nothing ever clears it. The process exit code
/// is derived from this value alone.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    failed: Arc<AtomicBool>,
}

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.failed.store(true, Ordering::Relaxed);
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.failed() {
            ExitCode::from(1)
        } else {
            ExitCode::SUCCESS
        }
    }
}
