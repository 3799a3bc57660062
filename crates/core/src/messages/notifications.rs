use std::collections::HashSet;

use crate::pubsub::filter::Contains;
use crate::pubsub::TopicDescriptor;

/// Who a notification is meant for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Audience {
    All,
    Users(HashSet<String>),
}

impl Audience {
    pub fn users<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Users(usernames.into_iter().map(Into::into).collect())
    }
}

/// Membership in the explicit recipient set. `All` is matched separately with
/// an equality filter, so it does not claim to contain anyone here.
impl Contains<String> for Audience {
    fn contains_value(&self, username: &String) -> bool {
        match self {
            Audience::All => false,
            Audience::Users(users) => users.contains(username),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Plain,
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible toast pushed over the notifications WebSocket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationMessage {
    pub audience: Audience,
    pub message: String,
    pub severity: Severity,
    /// Seconds after which the client auto-dismisses the toast.
    pub remove_after: Option<u32>,
}

impl NotificationMessage {
    pub fn broadcast(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            audience: Audience::All,
            message: message.into(),
            severity,
            remove_after: None,
        }
    }
}

pub fn notification_topic() -> TopicDescriptor<NotificationMessage> {
    TopicDescriptor::new("notifications")
}
