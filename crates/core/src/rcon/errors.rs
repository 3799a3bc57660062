use std::time::Duration;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RconError {
    /// The peer closed the stream in the middle of a frame.
    #[error("stream closed mid-frame")]
    IncompleteRead,
    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },
    #[error("server rejected the rcon password")]
    InvalidPassword,
    #[error("invalid packet: {0}")]
    InvalidPacket(String),
    #[error("request id mismatch: expected {expected}, received {received}")]
    RequestIdMismatch { expected: i32, received: i32 },
    #[error("payload is not valid {encoding}")]
    Encoding { encoding: &'static str },
    #[error("server {0} is not configured")]
    UnknownServer(Uuid),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RconError {
    /// Whether another connect attempt is worth it. Protocol-level failures
    /// are retryable too: an invalid password may be corrected by the
    /// operator, and a restarting server produces transient garbage.
    pub fn is_retryable(&self) -> bool {
        match self {
            RconError::IncompleteRead
            | RconError::ConnectTimeout { .. }
            | RconError::InvalidPassword
            | RconError::InvalidPacket(_)
            | RconError::RequestIdMismatch { .. }
            | RconError::Io(_) => true,
            RconError::Encoding { .. } | RconError::UnknownServer(_) | RconError::Other(_) => false,
        }
    }
}
