//! The five WebSocket endpoints.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use http::HeaderMap;
use uuid::Uuid;

use webrcon::messages::{
    heartbeat_topic, notification_topic, rcon_command_topic, rcon_response_topic,
    server_status_topic, ServerStatusMessage,
};
use webrcon::pubsub::{FieldEquals, PubSubFilter};

use crate::auth::{authorize, close_policy_violation};
use crate::converters::{
    audience_filter, HeartbeatConverter, NotificationConverter, RconConverter,
    ServerStatusConverter,
};
use crate::ws::{WebsocketPubSub, WebsocketProcessor};
use crate::ConsoleCtx;

type Ctx = Arc<dyn ConsoleCtx>;

pub fn router(ctx: Ctx) -> Router {
    Router::new()
        .route("/heartbeat", get(heartbeat))
        .route("/notifications", get(notifications))
        .route("/servers/updates", get(server_list_updates))
        .route("/servers/updates/:server_id", get(server_detail_updates))
        .route("/rcon/:server_id", get(rcon))
        .with_state(ctx)
}

async fn heartbeat(State(ctx): State<Ctx>, headers: HeaderMap, ws: WebSocketUpgrade) -> Response {
    let user = authorize(&ctx, &headers).await;
    ws.on_upgrade(move |socket| async move {
        if user.is_none() {
            return close_policy_violation(socket).await;
        }
        let converter = HeartbeatConverter::new(ctx.renderer());
        let channels = WebsocketPubSub {
            pubsub: ctx.pubsub(),
            publish_topic: None,
            subscribe_topic: Some(heartbeat_topic()),
            subscribe_filter: None,
        };
        WebsocketProcessor::new(socket, converter, channels).process().await;
    })
}

async fn notifications(
    State(ctx): State<Ctx>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let user = authorize(&ctx, &headers).await;
    ws.on_upgrade(move |socket| async move {
        let Some(user) = user else {
            return close_policy_violation(socket).await;
        };
        let converter = NotificationConverter::new(ctx.renderer());
        let channels = WebsocketPubSub {
            pubsub: ctx.pubsub(),
            publish_topic: None,
            subscribe_topic: Some(notification_topic()),
            subscribe_filter: Some(audience_filter(user)),
        };
        WebsocketProcessor::new(socket, converter, channels).process().await;
    })
}

async fn server_list_updates(
    State(ctx): State<Ctx>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let user = authorize(&ctx, &headers).await;
    ws.on_upgrade(move |socket| async move {
        if user.is_none() {
            return close_policy_violation(socket).await;
        }
        let converter = ServerStatusConverter::new(ctx.renderer(), None);
        let channels = WebsocketPubSub {
            pubsub: ctx.pubsub(),
            publish_topic: None,
            subscribe_topic: Some(server_status_topic()),
            subscribe_filter: None,
        };
        WebsocketProcessor::new(socket, converter, channels).process().await;
    })
}

async fn server_detail_updates(
    State(ctx): State<Ctx>,
    Path(server_id): Path<Uuid>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let user = authorize(&ctx, &headers).await;
    ws.on_upgrade(move |socket| async move {
        if user.is_none() {
            return close_policy_violation(socket).await;
        }
        fn server_status_uid(m: &ServerStatusMessage) -> &Uuid {
            match m {
                ServerStatusMessage::RconConnected(uid)
                | ServerStatusMessage::RconDisconnected(uid) => uid,
            }
        }
        let converter = ServerStatusConverter::new(ctx.renderer(), Some(server_id));
        let channels = WebsocketPubSub {
            pubsub: ctx.pubsub(),
            publish_topic: None,
            subscribe_topic: Some(server_status_topic()),
            subscribe_filter: Some(FieldEquals::new(server_status_uid, server_id).boxed()),
        };
        WebsocketProcessor::new(socket, converter, channels).process().await;
    })
}

async fn rcon(
    State(ctx): State<Ctx>,
    Path(server_id): Path<Uuid>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let user = authorize(&ctx, &headers).await;
    ws.on_upgrade(move |socket| async move {
        let Some(user) = user else {
            return close_policy_violation(socket).await;
        };
        let converter = RconConverter::new(ctx.renderer(), user);
        let channels = WebsocketPubSub {
            pubsub: ctx.pubsub(),
            publish_topic: Some(rcon_command_topic(server_id)),
            subscribe_topic: Some(rcon_response_topic(server_id)),
            subscribe_filter: None,
        };
        WebsocketProcessor::new(socket, converter, channels).process().await;
    })
}
