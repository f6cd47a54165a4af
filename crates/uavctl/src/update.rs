//! Source-control update via the external helper script.

use std::path::Path;

use thiserror::Error;
use tokio::process::Command;
use tracing::info;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("cannot run update script '{script}': {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("update script exited with {code}: {stderr}")]
    Failed { code: i32, stderr: String },
}

/// Runs the update script, optionally with a branch argument. Output is
/// captured; a nonzero exit is the script's way of reporting failure.
pub async fn run_update(script: &Path, branch: Option<&str>) -> Result<(), UpdateError> {
    let mut command = Command::new(script);
    if let Some(branch) = branch {
        command.arg(branch);
    }
    info!(target: "uav.update", script = %script.display(), ?branch, "running update script");

    let output = command.output().await.map_err(|e| UpdateError::Spawn {
        script: script.display().to_string(),
        source: e,
    })?;

    if output.status.success() {
        info!(
            target: "uav.update",
            "update script succeeded: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    } else {
        Err(UpdateError::Failed {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("update.sh");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "#!/bin/sh\n{body}").expect("write");
        let mut perms = file.metadata().expect("meta").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = script(dir.path(), "echo updated");
        run_update(&path, None).await.expect("update ok");
    }

    #[tokio::test]
    async fn branch_is_forwarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("branch");
        let path = script(dir.path(), &format!("echo \"$1\" > {}", marker.display()));

        run_update(&path, Some("feature/x")).await.expect("update ok");
        let recorded = std::fs::read_to_string(&marker).expect("marker");
        assert_eq!(recorded.trim(), "feature/x");
    }

    #[tokio::test]
    async fn nonzero_exit_reports_code_and_stderr() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = script(dir.path(), "echo broken >&2\nexit 3");

        let err = run_update(&path, None).await.unwrap_err();
        match err {
            UpdateError::Failed { code, stderr } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_script_is_a_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = run_update(&dir.path().join("nope.sh"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Spawn { .. }));
    }
}
