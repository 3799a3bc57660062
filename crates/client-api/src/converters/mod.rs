//! Per-endpoint conversion strategies between wire frames and bus messages.

mod heartbeat;
mod notifications;
mod rcon;
mod server_status;

pub use heartbeat::HeartbeatConverter;
pub use notifications::{audience_filter, NotificationConverter};
pub use rcon::RconConverter;
pub use server_status::ServerStatusConverter;

use serde::de::DeserializeOwned;

/// Converts between one endpoint's wire format and its bus message types.
///
/// `convert_in` turns a decoded client frame into the message to publish;
/// `convert_out` renders a bus message into the HTMX fragment to send.
/// Endpoints without a client→server direction use `()` for `MessageIn`.
pub trait HtmxConverter: Send + Sync {
    type DataIn: DeserializeOwned + Send;
    type MessageIn: Clone + Send + 'static;
    type MessageOut: Clone + Send + 'static;

    fn convert_in(&self, data: Self::DataIn) -> Self::MessageIn;

    fn convert_out(&self, message: &Self::MessageOut) -> anyhow::Result<String>;
}
