//! Companion-host control.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

/// OS-level operations on the companion computer itself.
#[async_trait]
pub trait HostControl: Send + Sync {
    async fn reboot_system(&self) -> std::io::Result<()>;
}

/// Reboots through the logind session manager, so no elevated privileges
/// beyond the usual polkit rules are needed.
pub struct LoginManager;

#[async_trait]
impl HostControl for LoginManager {
    async fn reboot_system(&self) -> std::io::Result<()> {
        info!(target: "uav.host", "requesting system reboot via logind");
        let output = Command::new("dbus-send")
            .args([
                "--system",
                "--print-reply",
                "--dest=org.freedesktop.login1",
                "/org/freedesktop/login1",
                "org.freedesktop.login1.Manager.Reboot",
                "boolean:true",
            ])
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(std::io::Error::other(format!(
                "dbus-send failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}
