use serde_json::Value;

/// Produces HTMX fragment strings from named templates.
///
/// Implemented by the embedding application; the delivery layer never
/// assembles HTML itself.
pub trait HtmlRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> anyhow::Result<String>;
}
