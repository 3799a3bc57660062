use std::sync::Arc;

use serde_json::{json, Value};

use webrcon::messages::HeartbeatMessage;

use crate::renderer::HtmlRenderer;

use super::HtmxConverter;

pub struct HeartbeatConverter {
    renderer: Arc<dyn HtmlRenderer>,
}

impl HeartbeatConverter {
    pub fn new(renderer: Arc<dyn HtmlRenderer>) -> Self {
        Self { renderer }
    }
}

impl HtmxConverter for HeartbeatConverter {
    type DataIn = Value;
    type MessageIn = ();
    type MessageOut = HeartbeatMessage;

    fn convert_in(&self, _data: Value) {}

    fn convert_out(&self, message: &HeartbeatMessage) -> anyhow::Result<String> {
        self.renderer.render(
            "heartbeat.html",
            &json!({ "timestamp": message.timestamp.format("%H:%M:%S").to_string() }),
        )
    }
}
