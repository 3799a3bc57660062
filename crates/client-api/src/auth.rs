//! Authorization gate for WebSocket endpoints.
//!
//! The processor never authorizes; routes call [`authorize`] before wiring
//! one up, and sessions without a valid user are closed with the
//! policy-violation code.

use std::borrow::Cow;
use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use http::HeaderMap;

use crate::ConsoleCtx;

/// Resolves the session's user: a username claim must be present and the
/// user must exist and not be disabled.
pub async fn authorize(ctx: &Arc<dyn ConsoleCtx>, headers: &HeaderMap) -> Option<String> {
    let username = ctx.current_user(headers)?;
    match ctx.users().get_user(&username).await {
        Ok(Some(user)) if !user.disabled => Some(user.username),
        Ok(_) => None,
        Err(err) => {
            log::error!("user lookup for `{username}` failed: {err:#}");
            None
        }
    }
}

/// Closes an accepted session with close code 1008.
pub async fn close_policy_violation(mut socket: WebSocket) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: Cow::from("policy violation"),
    };
    if let Err(err) = socket.send(Message::Close(Some(frame))).await {
        log::debug!("could not deliver policy-violation close: {err}");
    }
}
