use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::messages::{heartbeat_topic, HeartbeatMessage};
use crate::pubsub::InProcessPubSub;

use super::{Service, ServiceError};

type TimeSource = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Publishes a [`HeartbeatMessage`] on a fixed cadence so connected browsers
/// can show liveness.
pub struct HeartbeatPublisher {
    pubsub: Arc<InProcessPubSub>,
    interval: Duration,
    now: TimeSource,
}

impl HeartbeatPublisher {
    pub fn new(pubsub: Arc<InProcessPubSub>, interval: Duration) -> Self {
        Self::with_time_source(pubsub, interval, Box::new(Utc::now))
    }

    /// The injected time source is authoritative for every published
    /// timestamp; nothing in here reads the wall clock directly.
    pub fn with_time_source(pubsub: Arc<InProcessPubSub>, interval: Duration, now: TimeSource) -> Self {
        Self { pubsub, interval, now }
    }
}

#[async_trait]
impl Service for HeartbeatPublisher {
    fn name(&self) -> String {
        "heartbeat_publisher".to_owned()
    }

    async fn launch(&self, cancel: CancellationToken) -> Result<(), ServiceError> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.interval) => {
                    let beat = HeartbeatMessage { timestamp: (self.now)() };
                    self.pubsub.publish(&heartbeat_topic(), beat);
                }
            }
        }
    }
}
