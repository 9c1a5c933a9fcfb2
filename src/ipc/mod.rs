//! Command socket
//!
//! Length-prefixed JSON over a Unix domain socket. The listener thread answers
//! queries from the shared store and forwards commands to the event loop,
//! which owns the overlay service.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::constants::protocol::{MAX_MESSAGE_SIZE, PROTOCOL_VERSION, SOCKET_DIR, SOCKET_FILENAME};
use crate::core::{Command, OverlayStore};

mod messages;
pub use messages::{Envelope, OverlayRequest, OverlayResponse};

/// Socket path under XDG_RUNTIME_DIR, falling back to the cache dir
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(SOCKET_DIR).join(SOCKET_FILENAME));
    }

    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(SOCKET_DIR).join(SOCKET_FILENAME))
}

/// Command handed from the listener thread to the event loop
pub struct ForwardedCommand {
    pub command: Command,
    reply: Sender<OverlayResponse>,
}

impl ForwardedCommand {
    pub fn new(command: Command) -> (Self, mpsc::Receiver<OverlayResponse>) {
        let (reply, rx) = mpsc::channel();
        (Self { command, reply }, rx)
    }

    pub fn respond(self, response: OverlayResponse) {
        // Client may have hung up
        let _ = self.reply.send(response);
    }
}

/// Connection to a running daemon
pub struct OverlayClient {
    pub(crate) stream: UnixStream,
}

impl OverlayClient {
    pub fn connect() -> Result<Self> {
        let path = default_socket_path()?;
        Self::connect_to(&path)
    }

    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to overlay daemon at {}", path.display()))?;
        Ok(Self { stream })
    }

    /// Send one request and block for its response
    pub fn request(&mut self, request: OverlayRequest) -> Result<OverlayResponse> {
        write_message(&mut self.stream, &Envelope::new(request))?;
        read_message(&mut self.stream)
    }
}

pub struct OverlayServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl OverlayServer {
    pub fn bind() -> Result<Self> {
        let socket_path = default_socket_path()?;
        Self::bind_to(socket_path)
    }

    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept connections on a background thread, each served on its own
    /// thread. The socket file stays owned by `self` and is removed on drop.
    pub fn serve(
        &self,
        store: Arc<OverlayStore>,
        commands: Sender<ForwardedCommand>,
    ) -> Result<JoinHandle<()>> {
        let listener = self
            .listener
            .try_clone()
            .context("Failed to clone socket listener")?;
        info!(path = %self.socket_path.display(), "Command socket listening");

        thread::Builder::new()
            .name("overlay-ipc".to_string())
            .spawn(move || {
                for stream in listener.incoming() {
                    match stream {
                        Ok(stream) => spawn_connection(stream, Arc::clone(&store), commands.clone()),
                        Err(e) => warn!(error = %e, "Failed to accept IPC connection"),
                    }
                }
            })
            .context("Failed to spawn IPC thread")
    }
}

impl Drop for OverlayServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

fn spawn_connection(mut stream: UnixStream, store: Arc<OverlayStore>, commands: Sender<ForwardedCommand>) {
    let spawned = thread::Builder::new()
        .name("overlay-ipc-conn".to_string())
        .spawn(move || {
            if let Err(e) = handle_connection(&mut stream, &store, &commands) {
                debug!(error = %e, "IPC connection closed");
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Failed to spawn IPC connection thread");
    }
}

/// Serve requests on one connection until the client hangs up
fn handle_connection(
    stream: &mut UnixStream,
    store: &OverlayStore,
    commands: &Sender<ForwardedCommand>,
) -> Result<()> {
    loop {
        let envelope: Envelope = read_message(stream)?;
        let response = answer(envelope, store, commands);
        write_message(stream, &response)?;
    }
}

/// Response for one envelope. Commands block until the event loop replies.
pub fn answer(
    envelope: Envelope,
    store: &OverlayStore,
    commands: &Sender<ForwardedCommand>,
) -> OverlayResponse {
    if envelope.version != PROTOCOL_VERSION {
        warn!(
            version = envelope.version,
            expected = PROTOCOL_VERSION,
            "Rejecting request with unsupported protocol version"
        );
        return OverlayResponse::Error(format!(
            "Unsupported protocol version {} (expected {})",
            envelope.version, PROTOCOL_VERSION
        ));
    }

    match envelope.request {
        OverlayRequest::Ping => OverlayResponse::Pong,
        OverlayRequest::GetState => OverlayResponse::State(store.snapshot()),
        request => {
            let Some(command) = request.into_command() else {
                return OverlayResponse::Error("Request carries no command".to_string());
            };
            let (forwarded, reply) = ForwardedCommand::new(command);
            if commands.send(forwarded).is_err() {
                return OverlayResponse::Error("Overlay daemon is shutting down".to_string());
            }
            reply
                .recv()
                .unwrap_or_else(|_| OverlayResponse::Error("Event loop dropped the request".to_string()))
        }
    }
}

/// Write length-prefixed message to stream
fn write_message<T: Serialize>(stream: &mut impl Write, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    let len = u32::try_from(json.len()).context("Message length exceeds u32")?;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;
    stream
        .write_all(&json)
        .context("Failed to write message payload")?;
    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream
fn read_message<T: for<'de> Deserialize<'de>>(stream: &mut impl Read) -> Result<T> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}
