use std::sync::Arc;

use serde_json::{json, Value};

use webrcon::messages::{Audience, NotificationMessage, Severity};
use webrcon::pubsub::{BoxFilter, FieldContains, FieldEquals, PubSubFilter};

use crate::renderer::HtmlRenderer;

use super::HtmxConverter;

/// Filter for one user's notification stream:
/// `audience == all OR username ∈ audience`.
fn notification_audience(m: &NotificationMessage) -> &Audience {
    &m.audience
}

pub fn audience_filter(username: String) -> BoxFilter<NotificationMessage> {
    FieldEquals::new(notification_audience, Audience::All)
        .or(FieldContains::new(notification_audience, username))
        .boxed()
}

fn severity_class(severity: Severity) -> Option<&'static str> {
    match severity {
        Severity::Plain => Some("plain"),
        Severity::Info => Some("info"),
        Severity::Success => Some("ok"),
        Severity::Warning => Some("warn"),
        Severity::Error => Some("bad"),
    }
}

pub struct NotificationConverter {
    renderer: Arc<dyn HtmlRenderer>,
}

impl NotificationConverter {
    pub fn new(renderer: Arc<dyn HtmlRenderer>) -> Self {
        Self { renderer }
    }
}

impl HtmxConverter for NotificationConverter {
    type DataIn = Value;
    type MessageIn = ();
    type MessageOut = NotificationMessage;

    fn convert_in(&self, _data: Value) {}

    fn convert_out(&self, message: &NotificationMessage) -> anyhow::Result<String> {
        self.renderer.render(
            "notifications/notification.html",
            &json!({
                "content": message.message,
                "cls": severity_class(message.severity),
                "remove_after": message.remove_after,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::test_support::RecordingRenderer;

    #[test]
    fn renders_notification_with_severity_class() {
        let renderer = RecordingRenderer::new();
        let converter = NotificationConverter::new(renderer.clone());

        let mut message = NotificationMessage::broadcast("Connected", Severity::Success);
        message.remove_after = Some(5);
        converter.convert_out(&message).unwrap();

        let (template, context) = renderer.single_call();
        assert_eq!(template, "notifications/notification.html");
        assert_eq!(context["content"], "Connected");
        assert_eq!(context["cls"], "ok");
        assert_eq!(context["remove_after"], 5);
    }

    #[test]
    fn audience_filter_matches_broadcast_and_direct() {
        let filter = audience_filter("alice".to_owned());

        let broadcast = NotificationMessage::broadcast("hi", Severity::Plain);
        assert!(filter.accept(&broadcast));

        let direct = NotificationMessage {
            audience: Audience::users(["alice"]),
            message: "psst".to_owned(),
            severity: Severity::Info,
            remove_after: None,
        };
        assert!(filter.accept(&direct));

        let someone_else = NotificationMessage {
            audience: Audience::users(["bob"]),
            message: "not for you".to_owned(),
            severity: Severity::Info,
            remove_after: None,
        };
        assert!(!filter.accept(&someone_else));
    }
}
