//! WebSocket delivery layer: bridges browser sessions to the webrcon bus.
//!
//! Each endpoint pairs a [`converters::HtmxConverter`] with a
//! [`ws::WebsocketProcessor`]; rendered HTMX fragments go out as text
//! frames, inbound JSON frames become bus messages. Page routing, identity
//! issuance and template rendering stay with the embedding application,
//! reached through [`ConsoleCtx`].

pub mod auth;
pub mod converters;
pub mod renderer;
pub mod routes;
pub mod ws;

use std::sync::Arc;

use http::HeaderMap;

use renderer::HtmlRenderer;
use webrcon::pubsub::InProcessPubSub;
use webrcon::repo::{ServerRepository, UserRepository};

/// Everything the WebSocket endpoints need from the embedding application.
pub trait ConsoleCtx: Send + Sync + 'static {
    fn pubsub(&self) -> Arc<InProcessPubSub>;

    fn renderer(&self) -> Arc<dyn HtmlRenderer>;

    fn servers(&self) -> Arc<dyn ServerRepository>;

    fn users(&self) -> Arc<dyn UserRepository>;

    /// Username claim for the session, as established by the surrounding
    /// HTTP environment (token validation is its business, not ours).
    fn current_user(&self, headers: &HeaderMap) -> Option<String>;
}
