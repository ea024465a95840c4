//! mpv JSON IPC client (`mpv --input-ipc-server=<socket>`).
//!
//! Commands go through a single worker task that owns the socket connection,
//! so volume changes are applied in the order they were requested and the
//! caller never blocks on the player.

use crate::error::{MonitorError, Result};
use crate::video::ducking::VideoVolume;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

/// Bound on connecting to mpv and on each reply.
const IPC_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
struct IpcCommand<'a> {
    command: &'a [Value],
    request_id: u64,
}

#[derive(Debug, Deserialize)]
struct IpcReply {
    #[serde(default)]
    request_id: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

struct Request {
    command: Vec<Value>,
    reply: Option<oneshot::Sender<Result<Value>>>,
}

/// Handle to a running mpv instance.
#[derive(Clone)]
pub struct MpvIpc {
    socket: PathBuf,
    max_volume: u32,
    requests: mpsc::UnboundedSender<Request>,
}

impl MpvIpc {
    /// Start the IPC worker. Must be called inside a tokio runtime.
    ///
    /// Connecting is deferred to the first command; an mpv that is not running
    /// yet (or restarts) is reconnected on the next command.
    pub fn spawn(socket: impl Into<PathBuf>, max_volume: u32) -> Self {
        let socket = socket.into();
        let (requests, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(socket.clone(), rx));
        Self {
            socket,
            max_volume,
            requests,
        }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Queue a command without waiting for its reply.
    pub fn send(&self, command: Vec<Value>) -> Result<()> {
        self.requests
            .send(Request {
                command,
                reply: None,
            })
            .map_err(|_| MonitorError::Video {
                message: "mpv IPC worker stopped".to_string(),
            })
    }

    /// Run a command and wait for mpv's answer.
    pub async fn request(&self, command: Vec<Value>) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(Request {
                command,
                reply: Some(tx),
            })
            .map_err(|_| MonitorError::Video {
                message: "mpv IPC worker stopped".to_string(),
            })?;
        rx.await.map_err(|_| MonitorError::Video {
            message: "mpv IPC worker dropped the request".to_string(),
        })?
    }

    /// Replace the playlist with `urls` and loop it forever.
    pub async fn load_playlist(&self, urls: &[String]) -> Result<()> {
        for (index, url) in urls.iter().enumerate() {
            let mode = if index == 0 { "replace" } else { "append" };
            self.request(vec![json!("loadfile"), json!(url), json!(mode)])
                .await?;
        }
        self.request(vec![json!("set_property"), json!("loop-playlist"), json!("inf")])
            .await?;
        Ok(())
    }

    /// Whether mpv answers on the socket at all.
    pub async fn ping(&self) -> Result<()> {
        self.request(vec![json!("get_property"), json!("mpv-version")])
            .await
            .map(|_| ())
    }

    fn scaled_volume(&self, volume: f32) -> f64 {
        (volume.clamp(0.0, 1.0) as f64 * self.max_volume as f64).round()
    }
}

impl VideoVolume for MpvIpc {
    fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(vec![
            json!("set_property"),
            json!("volume"),
            json!(self.scaled_volume(volume)),
        ])
    }
}

type Connection = (BufReader<tokio::net::unix::OwnedReadHalf>, tokio::net::unix::OwnedWriteHalf);

async fn run_worker(socket: PathBuf, mut requests: mpsc::UnboundedReceiver<Request>) {
    let mut connection: Option<Connection> = None;
    let mut next_id: u64 = 1;

    while let Some(request) = requests.recv().await {
        let request_id = next_id;
        next_id += 1;

        let result = execute(&socket, &mut connection, &request.command, request_id).await;
        if result.is_err() {
            // Reconnect on the next command.
            connection = None;
        }

        match request.reply {
            Some(reply) => {
                if reply.send(result).is_err() {
                    tracing::trace!("mpv reply dropped, caller went away");
                }
            }
            None => {
                if let Err(e) = result {
                    tracing::debug!("mpv command {:?} failed: {}", request.command, e);
                }
            }
        }
    }
}

async fn execute(
    socket: &Path,
    connection: &mut Option<Connection>,
    command: &[Value],
    request_id: u64,
) -> Result<Value> {
    if connection.is_none() {
        let stream = timeout(IPC_TIMEOUT, UnixStream::connect(socket))
            .await
            .map_err(|_| video_error(format!("timed out connecting to {}", socket.display())))?
            .map_err(|e| {
                video_error(format!("Failed to connect to {}: {}", socket.display(), e))
            })?;
        let (reader, writer) = stream.into_split();
        *connection = Some((BufReader::new(reader), writer));
    }
    let Some((reader, writer)) = connection.as_mut() else {
        return Err(video_error("not connected".to_string()));
    };

    let mut line = serde_json::to_vec(&IpcCommand {
        command,
        request_id,
    })?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .map_err(|e| video_error(format!("Failed to write command: {}", e)))?;

    timeout(IPC_TIMEOUT, read_reply(reader, request_id))
        .await
        .map_err(|_| video_error("timed out waiting for mpv".to_string()))?
}

/// Read lines until the reply to `request_id`; event lines are skipped.
async fn read_reply(
    reader: &mut BufReader<tokio::net::unix::OwnedReadHalf>,
    request_id: u64,
) -> Result<Value> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| video_error(format!("Failed to read reply: {}", e)))?;
        if read == 0 {
            return Err(video_error("mpv closed the connection".to_string()));
        }

        let Ok(reply) = serde_json::from_str::<IpcReply>(line.trim()) else {
            continue;
        };
        if reply.request_id != Some(request_id) {
            continue;
        }
        return match reply.error.as_deref() {
            None | Some("success") => Ok(reply.data.unwrap_or(Value::Null)),
            Some(error) => Err(video_error(format!("mpv: {}", error))),
        };
    }
}

fn video_error(message: String) -> MonitorError {
    MonitorError::Video { message }
}
