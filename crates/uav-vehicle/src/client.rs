use std::net::SocketAddr;

use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tracing::trace;

use crate::api::{ConnectionState, Health, Vehicle};
use crate::error::VehicleError;

/// Vehicle client over the bridge's control port.
///
/// One persistent TCP connection per run, created after the supervisor has
/// confirmed the port is listening. Requests and replies are single JSON
/// lines; calls are serialized over the connection.
pub struct BridgeClient {
    addr: SocketAddr,
    io: Mutex<Io>,
}

struct Io {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[derive(Debug, Deserialize)]
struct Reply {
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    connected: Option<bool>,
    #[serde(default)]
    global_position_ok: Option<bool>,
    #[serde(default)]
    home_position_ok: Option<bool>,
}

impl BridgeClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, VehicleError> {
        let stream = TcpStream::connect(addr).await?;
        let (read, writer) = stream.into_split();
        Ok(Self {
            addr,
            io: Mutex::new(Io {
                reader: BufReader::new(read),
                writer,
            }),
        })
    }

    /// Connects to a bridge on the local host.
    pub async fn connect_local(port: u16) -> Result<Self, VehicleError> {
        Self::connect(SocketAddr::from(([127, 0, 0, 1], port))).await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn call(&self, command: &str, request: serde_json::Value) -> Result<Reply, VehicleError> {
        let frame = serde_json::to_string(&request)
            .map_err(|e| VehicleError::Protocol(format!("encode '{command}': {e}")))?;
        trace!(target: "uav.vehicle", %command, "request");

        let mut io = self.io.lock().await;
        io.writer.write_all(frame.as_bytes()).await?;
        io.writer.write_all(b"\n").await?;
        io.writer.flush().await?;

        let mut line = String::new();
        let n = io.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(VehicleError::Transport(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "bridge closed the control connection",
            )));
        }
        drop(io);

        let reply: Reply = serde_json::from_str(line.trim_end())
            .map_err(|e| VehicleError::Protocol(format!("'{command}' reply: {e}")))?;
        if reply.ok {
            return Ok(reply);
        }

        let reason = reply.error.unwrap_or_else(|| "unspecified".to_string());
        if reply.kind.as_deref() == Some("action") {
            Err(VehicleError::Action {
                command: command.to_string(),
                reason,
            })
        } else {
            Err(VehicleError::Failed {
                command: command.to_string(),
                reason,
            })
        }
    }

    async fn simple(&self, command: &str) -> Result<(), VehicleError> {
        self.call(command, json!({ "cmd": command })).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl Vehicle for BridgeClient {
    async fn arm(&self) -> Result<(), VehicleError> {
        self.simple("arm").await
    }

    async fn disarm(&self) -> Result<(), VehicleError> {
        self.simple("disarm").await
    }

    async fn takeoff(&self) -> Result<(), VehicleError> {
        self.simple("takeoff").await
    }

    async fn land(&self) -> Result<(), VehicleError> {
        self.simple("land").await
    }

    async fn hold(&self) -> Result<(), VehicleError> {
        self.simple("hold").await
    }

    async fn return_to_launch(&self) -> Result<(), VehicleError> {
        self.simple("return_to_launch").await
    }

    async fn terminate(&self) -> Result<(), VehicleError> {
        self.simple("terminate").await
    }

    async fn reboot(&self) -> Result<(), VehicleError> {
        self.simple("reboot").await
    }

    async fn set_takeoff_altitude(&self, altitude: f32) -> Result<(), VehicleError> {
        self.call(
            "set_takeoff_altitude",
            json!({ "cmd": "set_takeoff_altitude", "value": altitude }),
        )
        .await
        .map(|_| ())
    }

    async fn set_param_int(&self, name: &str, value: i32) -> Result<(), VehicleError> {
        self.call(
            "set_param_int",
            json!({ "cmd": "set_param_int", "name": name, "value": value }),
        )
        .await
        .map(|_| ())
    }

    async fn set_param_float(&self, name: &str, value: f32) -> Result<(), VehicleError> {
        self.call(
            "set_param_float",
            json!({ "cmd": "set_param_float", "name": name, "value": value }),
        )
        .await
        .map(|_| ())
    }

    async fn connection(&self) -> Result<ConnectionState, VehicleError> {
        let reply = self
            .call("connection_state", json!({ "cmd": "connection_state" }))
            .await?;
        Ok(ConnectionState {
            connected: reply.connected.unwrap_or(false),
        })
    }

    async fn health(&self) -> Result<Health, VehicleError> {
        let reply = self.call("health", json!({ "cmd": "health" })).await?;
        Ok(Health {
            global_position_ok: reply.global_position_ok.unwrap_or(false),
            home_position_ok: reply.home_position_ok.unwrap_or(false),
        })
    }
}
