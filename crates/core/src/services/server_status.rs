use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::messages::{server_status_topic, ServerStatusMessage};
use crate::pubsub::InProcessPubSub;

use super::{Service, ServiceError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServerStatus {
    pub rcon_connected: bool,
}

/// Folds the `server_status` topic into the latest known state per server.
///
/// This is the single source of truth behind the HTTP pages that render
/// server lists and details; reads are synchronous and never touch the bus.
pub struct ServerStatusService {
    pubsub: Arc<InProcessPubSub>,
    states: Mutex<HashMap<Uuid, ServerStatus>>,
}

impl ServerStatusService {
    pub fn new(pubsub: Arc<InProcessPubSub>) -> Self {
        Self {
            pubsub,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// State of one server; a server never seen on the bus reads as
    /// disconnected.
    pub fn get_state(&self, server_uid: Uuid) -> ServerStatus {
        self.states.lock().get(&server_uid).copied().unwrap_or_default()
    }

    pub fn get_states(&self, server_uids: impl IntoIterator<Item = Uuid>) -> HashMap<Uuid, ServerStatus> {
        let states = self.states.lock();
        server_uids
            .into_iter()
            .map(|uid| (uid, states.get(&uid).copied().unwrap_or_default()))
            .collect()
    }

    fn apply(&self, message: ServerStatusMessage) {
        let mut states = self.states.lock();
        let state = states.entry(message.server_uid()).or_default();
        state.rcon_connected = matches!(message, ServerStatusMessage::RconConnected(_));
    }
}

#[async_trait]
impl Service for ServerStatusService {
    fn name(&self) -> String {
        "server_status_service".to_owned()
    }

    async fn launch(&self, cancel: CancellationToken) -> Result<(), ServiceError> {
        let mut sub = self
            .pubsub
            .subscribe(&server_status_topic(), None)
            .map_err(anyhow::Error::from)?;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                message = sub.recv() => match message {
                    Some(message) => self.apply(message),
                    None => return Ok(()),
                }
            }
        }
    }
}
