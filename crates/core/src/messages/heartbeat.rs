use chrono::{DateTime, Utc};

use crate::pubsub::TopicDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeartbeatMessage {
    pub timestamp: DateTime<Utc>,
}

pub fn heartbeat_topic() -> TopicDescriptor<HeartbeatMessage> {
    TopicDescriptor::new("heartbeat")
}
