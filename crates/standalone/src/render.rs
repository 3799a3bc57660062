//! A plain fragment renderer so the standalone binary runs out of the box.
//! Embedders with a real templating stack provide their own
//! [`HtmlRenderer`].

use anyhow::{anyhow, bail};
use serde_json::Value;

use webrcon_client_api::renderer::HtmlRenderer;

pub struct FragmentRenderer;

impl HtmlRenderer for FragmentRenderer {
    fn render(&self, template: &str, context: &Value) -> anyhow::Result<String> {
        let fragment = match template {
            "heartbeat.html" => format!(
                r#"<span id="heartbeat" hx-swap-oob="true">{}</span>"#,
                escape(text(context, "timestamp")?),
            ),
            "notifications/notification.html" => {
                let cls = context.get("cls").and_then(Value::as_str).unwrap_or("plain");
                let remove_after = context
                    .get("remove_after")
                    .and_then(Value::as_u64)
                    .map(|secs| format!(r#" data-remove-after="{secs}""#))
                    .unwrap_or_default();
                format!(
                    r#"<div class="notification {cls}"{remove_after}>{}</div>"#,
                    escape(text(context, "content")?),
                )
            }
            "servers/list_update.html" => format!(
                r#"<span id="status-{}" class="status {}" hx-swap-oob="true"></span>"#,
                text(context, "server_uid")?,
                status_class(context)?,
            ),
            "servers/detail_update.html" => format!(
                r#"<span id="server-status" class="status {}" hx-swap-oob="true"></span>"#,
                status_class(context)?,
            ),
            "rcon/response.html" => format!(
                concat!(
                    r#"<div class="console-line">"#,
                    r#"<span class="time">{}</span> "#,
                    r#"<span class="user">{}</span> "#,
                    r#"<span class="command">{}</span>"#,
                    r#"<pre class="response">{}</pre>"#,
                    r#"</div>"#,
                ),
                escape(text(context, "timestamp")?),
                escape(text(context, "user")?),
                escape(text(context, "command")?),
                escape(text(context, "response")?),
            ),
            other => bail!("unknown template `{other}`"),
        };
        Ok(fragment)
    }
}

fn text<'a>(context: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    context
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("template context is missing `{key}`"))
}

fn status_class(context: &Value) -> anyhow::Result<&'static str> {
    match context.get("rcon_connected").and_then(Value::as_bool) {
        Some(true) => Ok("connected"),
        Some(false) => Ok("disconnected"),
        None => Err(anyhow!("template context is missing `rcon_connected`")),
    }
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
