use uuid::Uuid;

use crate::pubsub::TopicDescriptor;

/// Connection lifecycle events emitted by the per-server RCON services.
///
/// Within one service lifetime `RconConnected(uid)` precedes any response
/// sourced from `uid`, and `RconDisconnected(uid)` terminates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerStatusMessage {
    RconConnected(Uuid),
    RconDisconnected(Uuid),
}

impl ServerStatusMessage {
    pub fn server_uid(&self) -> Uuid {
        match *self {
            ServerStatusMessage::RconConnected(uid) | ServerStatusMessage::RconDisconnected(uid) => uid,
        }
    }
}

pub fn server_status_topic() -> TopicDescriptor<ServerStatusMessage> {
    TopicDescriptor::new("server_status")
}
