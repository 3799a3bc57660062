//! Message types flowing over the bus, one module per concern, each exposing
//! its well-known topic descriptor(s).

mod heartbeat;
mod notifications;
mod rcon;
mod server_status;

pub use heartbeat::{heartbeat_topic, HeartbeatMessage};
pub use notifications::{notification_topic, Audience, NotificationMessage, Severity};
pub use rcon::{rcon_command_topic, rcon_response_topic, RconCommand, RconResponse};
pub use server_status::{server_status_topic, ServerStatusMessage};
