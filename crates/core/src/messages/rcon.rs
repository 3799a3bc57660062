use uuid::Uuid;

use crate::model::ServerKind;
use crate::pubsub::TopicDescriptor;

/// An operator-issued console command bound for one server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RconCommand {
    pub issuing_user: String,
    pub command: String,
}

pub fn rcon_command_topic(server_uid: Uuid) -> TopicDescriptor<RconCommand> {
    TopicDescriptor::new(format!("rcon_command/{server_uid}"))
}

/// The fully reassembled reply to one [`RconCommand`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RconResponse {
    pub issuing_user: String,
    pub server_kind: ServerKind,
    pub command: String,
    pub response: String,
}

pub fn rcon_response_topic(server_uid: Uuid) -> TopicDescriptor<RconResponse> {
    TopicDescriptor::new(format!("rcon_response/{server_uid}"))
}
