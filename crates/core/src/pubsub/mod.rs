//! In-process publish/subscribe with typed topics and composable filters.
//!
//! Messaging between the services, the RCON actors and the WebSocket
//! processors all goes through one [`InProcessPubSub`]. Delivery is
//! at-most-once and best-effort: a publish never fails and never waits for
//! consumers.

pub mod filter;
mod inprocess;
mod topic;

pub use filter::{BoxFilter, FieldContains, FieldEquals, FieldLength, LengthMode, PubSubFilter, TypeIs};
pub use inprocess::{InProcessPubSub, Subscription};
pub use topic::TopicDescriptor;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PubSubError {
    #[error("topic name must not be empty")]
    InvalidTopic,
}
