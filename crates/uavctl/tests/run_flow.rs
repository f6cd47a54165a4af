//! End-to-end runs against a scripted control-port server.
//!
//! The "bridge process" is a scratch shell script that just sleeps; the
//! protocol side is served in-process by [`FakeBridge`] on the same port,
//! which the supervisor's port wait then happily accepts. Eviction leaves
//! the port alone because its holder is this very test process.

#![cfg(unix)]

use std::collections::HashSet;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use uav_model::{Action, RunRequest};
use uavctl::actions::ActionTimeouts;
use uavctl::dispatch;
use uavctl::host::HostControl;
use uavctl::settings::RunSettings;
use uavctl::status::LogLed;

struct NoHost;

#[async_trait::async_trait]
impl HostControl for NoHost {
    async fn reboot_system(&self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct BridgeState {
    commands: Vec<String>,
    fail: HashSet<String>,
}

/// Serves the control-port line protocol and records every command.
struct FakeBridge {
    port: u16,
    state: Arc<Mutex<BridgeState>>,
    accept_task: tokio::task::JoinHandle<()>,
}

impl FakeBridge {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let state = Arc::new(Mutex::new(BridgeState::default()));
        let shared = state.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, shared.clone()));
            }
        });
        Self {
            port,
            state,
            accept_task,
        }
    }

    fn fail(&self, command: &str) {
        self.state.lock().unwrap().fail.insert(command.to_string());
    }

    fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }
}

impl Drop for FakeBridge {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve(stream: TcpStream, state: Arc<Mutex<BridgeState>>) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(frame) = serde_json::from_str::<serde_json::Value>(&line) else {
            break;
        };
        let cmd = frame["cmd"].as_str().unwrap_or_default().to_string();
        let reply = match cmd.as_str() {
            "connection_state" => {
                // Leave the scratch bridge script a moment to start up; the
                // orchestrator polls this while the script is still forking.
                tokio::time::sleep(Duration::from_millis(50)).await;
                r#"{"ok":true,"connected":true}"#.to_string()
            }
            "health" => {
                r#"{"ok":true,"global_position_ok":true,"home_position_ok":true}"#.to_string()
            }
            _ => {
                let mut state = state.lock().unwrap();
                let recorded = match frame.get("name").and_then(|v| v.as_str()) {
                    Some(name) => format!("{cmd} {name}"),
                    None => cmd.clone(),
                };
                state.commands.push(recorded);
                if state.fail.contains(&cmd) {
                    r#"{"ok":false,"kind":"action","error":"injected"}"#.to_string()
                } else {
                    r#"{"ok":true}"#.to_string()
                }
            }
        };
        if write
            .write_all(format!("{reply}\n").as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
}

fn scratch_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake_bridge.sh");
    let mut file = std::fs::File::create(&path).expect("create script");
    writeln!(file, "#!/bin/sh\n{body}").expect("write script");
    let mut perms = file.metadata().expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    path
}

fn write_identity(dir: &Path, hw_id: u32) {
    std::fs::write(dir.join(format!("{hw_id}.hwid")), "").expect("marker");
}

fn write_config(dir: &Path, hw_id: u32, control_port: u16) -> PathBuf {
    let path = dir.join("config.csv");
    std::fs::write(
        &path,
        format!(
            "hw_id,pos_id,x,y,ip,mavlink_port,debug_port,gcs_ip\n\
             {hw_id},1,0.0,0.0,127.0.0.1,14540,{control_port},127.0.0.1\n"
        ),
    )
    .expect("config");
    path
}

fn fast_settings(dir: &Path, script: PathBuf) -> RunSettings {
    RunSettings {
        identity_dir: dir.to_path_buf(),
        config_path: dir.join("config.csv"),
        common_params_path: dir.join("common_params.csv"),
        bridge_override: Some(script),
        listen_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(5),
        connect_poll: Duration::from_millis(50),
        grace: Duration::from_secs(2),
        timeouts: ActionTimeouts {
            preflight: Duration::from_millis(500),
            health_poll: Duration::from_millis(50),
            settle: Duration::from_millis(10),
        },
        ..RunSettings::default()
    }
}

fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    !matches!(
        kill(Pid::from_raw(pid as i32), None::<Signal>),
        Err(Errno::ESRCH)
    )
}

#[tokio::test]
async fn land_run_issues_hold_then_land() {
    let bridge = FakeBridge::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    write_identity(dir.path(), 7);
    write_config(dir.path(), 7, bridge.port);
    let script = scratch_script(dir.path(), "exec sleep 30");

    let mut request = RunRequest::new(Action::Land);
    request.parameters = vec![("MPC_XY_CRUISE".to_string(), "8.5".to_string())];
    let outcome = dispatch::run(
        &request,
        &fast_settings(dir.path(), script),
        &LogLed,
        &NoHost,
    )
    .await;

    assert!(!outcome.failed());
    // CLI parameters go out first, then the action sequence, in order.
    assert_eq!(
        bridge.commands(),
        vec!["set_param_float MPC_XY_CRUISE", "hold", "land"]
    );
}

#[tokio::test]
async fn bridge_that_never_listens_fails_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_identity(dir.path(), 7);
    // A port nobody serves.
    let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = probe.local_addr().expect("addr").port();
    drop(probe);
    write_config(dir.path(), 7, port);
    let script = scratch_script(dir.path(), "exec sleep 30");

    let mut settings = fast_settings(dir.path(), script);
    settings.listen_timeout = Duration::from_millis(400);

    let outcome = dispatch::run(&RunRequest::new(Action::Hold), &settings, &LogLed, &NoHost).await;
    assert!(outcome.failed());
}

#[tokio::test]
async fn rejected_action_still_tears_the_bridge_down() {
    let bridge = FakeBridge::start().await;
    bridge.fail("hold");
    let dir = tempfile::tempdir().expect("tempdir");
    write_identity(dir.path(), 7);
    write_config(dir.path(), 7, bridge.port);
    let pid_file = dir.path().join("pid");
    let script = scratch_script(
        dir.path(),
        &format!("echo $$ > {}\nexec sleep 30", pid_file.display()),
    );

    let outcome = dispatch::run(
        &RunRequest::new(Action::Land),
        &fast_settings(dir.path(), script),
        &LogLed,
        &NoHost,
    )
    .await;

    assert!(outcome.failed());
    assert_eq!(bridge.commands(), vec!["hold"]);

    // The failed action did not skip teardown: the bridge process is gone.
    let pid: u32 = std::fs::read_to_string(&pid_file)
        .expect("pid file")
        .trim()
        .parse()
        .expect("pid parses");
    assert!(!process_alive(pid));
}

#[tokio::test]
async fn missing_identity_aborts_before_any_bridge_interaction() {
    let dir = tempfile::tempdir().expect("tempdir");
    let launched = dir.path().join("launched");
    let script = scratch_script(
        dir.path(),
        &format!("touch {}\nexec sleep 30", launched.display()),
    );

    let outcome = dispatch::run(
        &RunRequest::new(Action::Hold),
        &fast_settings(dir.path(), script),
        &LogLed,
        &NoHost,
    )
    .await;

    assert!(outcome.failed());
    assert!(!launched.exists(), "bridge must not have been launched");
}

#[tokio::test]
async fn missing_config_row_aborts_before_any_bridge_interaction() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_identity(dir.path(), 7);
    write_config(dir.path(), 9, 50999);
    let launched = dir.path().join("launched");
    let script = scratch_script(
        dir.path(),
        &format!("touch {}\nexec sleep 30", launched.display()),
    );

    let outcome = dispatch::run(
        &RunRequest::new(Action::Hold),
        &fast_settings(dir.path(), script),
        &LogLed,
        &NoHost,
    )
    .await;

    assert!(outcome.failed());
    assert!(!launched.exists(), "bridge must not have been launched");
}

#[tokio::test]
async fn init_sysid_runs_without_a_config_row() {
    let bridge = FakeBridge::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    write_identity(dir.path(), 42);
    // No config.csv at all: init_sysid does not need one. The bridge port
    // comes from the settings instead of a config row.
    let script = scratch_script(dir.path(), "exec sleep 30");
    let mut settings = fast_settings(dir.path(), script);
    settings.control_port = bridge.port;

    let outcome = dispatch::run(
        &RunRequest::new(Action::InitSysid),
        &settings,
        &LogLed,
        &NoHost,
    )
    .await;

    assert!(!outcome.failed());
    assert_eq!(
        bridge.commands(),
        vec!["set_param_int MAV_SYS_ID", "reboot"]
    );
}
