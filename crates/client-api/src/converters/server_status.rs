use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use webrcon::messages::ServerStatusMessage;

use crate::renderer::HtmlRenderer;

use super::HtmxConverter;

/// Converts status events into UI updates: for the server list when
/// `server_uid` is `None`, for one server's detail page otherwise.
pub struct ServerStatusConverter {
    renderer: Arc<dyn HtmlRenderer>,
    server_uid: Option<Uuid>,
}

impl ServerStatusConverter {
    pub fn new(renderer: Arc<dyn HtmlRenderer>, server_uid: Option<Uuid>) -> Self {
        Self { renderer, server_uid }
    }

    fn template(&self) -> &'static str {
        if self.server_uid.is_some() {
            "servers/detail_update.html"
        } else {
            "servers/list_update.html"
        }
    }
}

impl HtmxConverter for ServerStatusConverter {
    type DataIn = Value;
    type MessageIn = ();
    type MessageOut = ServerStatusMessage;

    fn convert_in(&self, _data: Value) {}

    fn convert_out(&self, message: &ServerStatusMessage) -> anyhow::Result<String> {
        let rcon_connected = matches!(message, ServerStatusMessage::RconConnected(_));
        self.renderer.render(
            self.template(),
            &json!({
                "server_uid": message.server_uid(),
                "rcon_connected": rcon_connected,
            }),
        )
    }
}
