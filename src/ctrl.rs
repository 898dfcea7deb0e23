//! hostapd control socket client
//!
//! One request per session: bind a datagram socket at the client path,
//! connect to `<ctrl_interface>/<interface>`, send the directive and wait for
//! the answer under a single deadline.

use crate::error::{SapError, SapResult};
use crate::registry::InternalKey;
use crate::store::{CommentPolicy, ConfigFile};
use crate::validation::validate_interface_name;
use std::fs;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// Reply buffer size
pub const CTRL_REPLY_LEN: usize = 256;

/// Unsolicited event lines read before the exchange counts as acknowledged
pub const MAX_EVENT_REPLIES: usize = 3;

pub const DEFAULT_CTRL_TIMEOUT: Duration = Duration::from_secs(2);

/// Request/response exchange with a running hostapd
#[cfg_attr(test, mockall::automock)]
pub trait HostapdControl: Send {
    /// Send `command` to the control socket at `peer` and return the reply
    fn request(&self, peer: &Path, command: &str) -> SapResult<String>;
}

/// Resolve the peer socket path from `ctrl_interface` and `interface`.
///
/// `ctrl_interface` is either a directory or `DIR=<dir> [GROUP=<group>]`.
pub fn control_socket_path(hostapd: &ConfigFile) -> SapResult<PathBuf> {
    let read = |key: InternalKey| {
        hostapd
            .read_value(key.name(), CommentPolicy::EnabledOnly)?
            .ok_or_else(|| SapError::ParamMissing(key.name().to_string()))
    };

    let ctrl = read(InternalKey::CtrlInterface)?;
    let interface = read(InternalKey::Interface)?;
    validate_interface_name(&interface)?;

    Ok(ctrl_dir(&ctrl).join(interface))
}

fn ctrl_dir(value: &str) -> PathBuf {
    let value = value.trim();
    let dir = value
        .split_whitespace()
        .find_map(|part| part.strip_prefix("DIR="))
        .unwrap_or(value);
    PathBuf::from(dir)
}

struct ClientPathCleanup {
    path: PathBuf,
}

impl Drop for ClientPathCleanup {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Control client over a Unix datagram socket
pub struct UnixControlClient {
    client_path: PathBuf,
    timeout: Duration,
}

impl UnixControlClient {
    pub fn new(client_path: impl Into<PathBuf>) -> Self {
        Self {
            client_path: client_path.into(),
            timeout: DEFAULT_CTRL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl HostapdControl for UnixControlClient {
    fn request(&self, peer: &Path, command: &str) -> SapResult<String> {
        if self.client_path.exists() {
            let _ = fs::remove_file(&self.client_path);
        }

        let socket = UnixDatagram::bind(&self.client_path).map_err(|e| {
            SapError::Control(format!(
                "Failed to bind control client at {:?}: {}",
                self.client_path, e
            ))
        })?;
        let _cleanup = ClientPathCleanup {
            path: self.client_path.clone(),
        };

        socket.connect(peer).map_err(|e| {
            SapError::Control(format!("Failed to connect to {:?}: {}", peer, e))
        })?;

        debug!("ctrl -> {}", command);
        socket
            .send(command.as_bytes())
            .map_err(|e| SapError::Control(format!("Failed to send '{}': {}", command, e)))?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; CTRL_REPLY_LEN];
        let mut events = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SapError::Timeout(format!("No reply to '{}'", command)));
            }
            socket.set_read_timeout(Some(remaining))?;

            let n = match socket.recv(&mut buf) {
                Ok(n) => n,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Err(SapError::Timeout(format!("No reply to '{}'", command)));
                }
                Err(e) => {
                    return Err(SapError::Control(format!("Failed to receive reply: {}", e)));
                }
            };

            let reply = String::from_utf8_lossy(&buf[..n]).trim_end().to_string();
            debug!("ctrl <- {}", reply);

            if reply.starts_with('<') {
                events += 1;
                if events >= MAX_EVENT_REPLIES {
                    debug!("No direct reply to '{}' after {} events", command, events);
                    return Ok(reply);
                }
                continue;
            }

            if reply.starts_with("FAIL") {
                return Err(SapError::Control(format!("'{}' rejected: {}", command, reply)));
            }

            return Ok(reply);
        }
    }
}
