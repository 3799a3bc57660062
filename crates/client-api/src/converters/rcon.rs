use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use webrcon::messages::{RconCommand, RconResponse};

use crate::renderer::HtmlRenderer;

use super::HtmxConverter;

/// Shape of the client frame on the RCON endpoint.
#[derive(Debug, Deserialize)]
pub struct RconCommandData {
    pub command: String,
}

/// Bi-directional converter for one user's console on one server.
pub struct RconConverter {
    renderer: Arc<dyn HtmlRenderer>,
    username: String,
}

impl RconConverter {
    pub fn new(renderer: Arc<dyn HtmlRenderer>, username: String) -> Self {
        Self { renderer, username }
    }
}

impl HtmxConverter for RconConverter {
    type DataIn = RconCommandData;
    type MessageIn = RconCommand;
    type MessageOut = RconResponse;

    fn convert_in(&self, data: RconCommandData) -> RconCommand {
        RconCommand {
            issuing_user: self.username.clone(),
            command: data.command,
        }
    }

    fn convert_out(&self, message: &RconResponse) -> anyhow::Result<String> {
        self.renderer.render(
            "rcon/response.html",
            &json!({
                "command": message.command,
                "response": message.response,
                "user": message.issuing_user,
                "timestamp": Utc::now().format("%H:%M:%S").to_string(),
            }),
        )
    }
}
