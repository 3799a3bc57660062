use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The flavor of game server behind an RCON endpoint.
///
/// The kind decides the payload encoding on the wire (Source speaks ASCII,
/// Minecraft UTF-8) and whether the login handshake is preceded by an empty
/// command response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKind {
    Source,
    Minecraft,
}

/// Immutable descriptor of a configured game server.
///
/// Services hold the `uid` and refetch the rest through a
/// [`crate::repo::ServerRepository`] on every reconnect attempt, so operator
/// edits take effect on the next retry cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub uid: Uuid,
    pub kind: ServerKind,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub rcon_port: u16,
    pub rcon_password: String,
    #[serde(default)]
    pub description: String,
}

impl Server {
    pub fn rcon_addr(&self) -> String {
        format!("{}:{}", self.host, self.rcon_port)
    }
}

/// A user as seen by the authorization gates; credentials stay outside.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub username: String,
    #[serde(default)]
    pub disabled: bool,
}
