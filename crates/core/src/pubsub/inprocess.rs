use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::filter::{BoxFilter, PubSubFilter};
use super::topic::TopicDescriptor;
use super::PubSubError;

/// Per-subscription inbound queue bound. When a slow consumer falls this far
/// behind, the oldest pending message is dropped so publishers stay live.
const SUBSCRIPTION_QUEUE_CAPACITY: usize = 256;

struct QueueInner<M> {
    items: VecDeque<M>,
    closed: bool,
    overflow: u64,
}

/// Bounded queue feeding one subscription, with drop-oldest overflow.
struct SubQueue<M> {
    inner: Mutex<QueueInner<M>>,
    notify: Notify,
}

impl<M> SubQueue<M> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                closed: false,
                overflow: 0,
            }),
            notify: Notify::new(),
        })
    }

    fn push(&self, message: M) {
        {
            let mut queue = self.inner.lock();
            if queue.closed {
                return;
            }
            if queue.items.len() == SUBSCRIPTION_QUEUE_CAPACITY {
                queue.items.pop_front();
                queue.overflow += 1;
            }
            queue.items.push_back(message);
        }
        self.notify.notify_one();
    }

    /// Marks the queue closed, releases the backlog and returns the overflow
    /// count accumulated over the queue's lifetime.
    fn close(&self) -> u64 {
        let overflow = {
            let mut queue = self.inner.lock();
            queue.closed = true;
            queue.items.clear();
            queue.overflow
        };
        self.notify.notify_waiters();
        overflow
    }

    async fn pop(&self) -> Option<M> {
        loop {
            // Register for a wakeup before checking the queue, otherwise a
            // push between the check and the await would be lost.
            let notified = self.notify.notified();
            {
                let mut queue = self.inner.lock();
                if let Some(message) = queue.items.pop_front() {
                    return Some(message);
                }
                if queue.closed {
                    return None;
                }
            }
            notified.await;
        }
    }
}

struct SubscriberRecord {
    id: u64,
    deliver: Box<dyn Fn(&dyn Any) + Send + Sync>,
}

/// At-most-once fanout from publishers to matching subscribers within one
/// process.
///
/// The subscription index is keyed by topic name for fanout and each record
/// carries a process-unique id for removal, so a [`Subscription`] only needs
/// its id (and topic name) to unlink itself.
#[derive(Default)]
pub struct InProcessPubSub {
    subscriptions: Mutex<HashMap<String, Vec<SubscriberRecord>>>,
    next_subscription_id: AtomicU64,
}

impl InProcessPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `message` into every open subscription on `topic` whose
    /// filter accepts it. Returns once all queues are fed; never waits for
    /// consumers and never fails. A publish with no matching subscribers is
    /// dropped silently.
    pub fn publish<M>(&self, topic: &TopicDescriptor<M>, message: M)
    where
        M: Clone + Send + 'static,
    {
        let subscriptions = self.subscriptions.lock();
        let Some(records) = subscriptions.get(topic.name()) else {
            return;
        };
        for record in records {
            (record.deliver)(&message);
        }
    }

    /// Registers a subscription on `topic`, optionally filtered. Fails only
    /// when the topic name is empty.
    pub fn subscribe<M>(
        self: &Arc<Self>,
        topic: &TopicDescriptor<M>,
        filter: Option<BoxFilter<M>>,
    ) -> Result<Subscription<M>, PubSubError>
    where
        M: Clone + Send + 'static,
    {
        if topic.name().is_empty() {
            return Err(PubSubError::InvalidTopic);
        }

        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let queue = SubQueue::new();

        let deliver_queue = Arc::clone(&queue);
        let deliver = Box::new(move |message: &dyn Any| {
            let Some(message) = message.downcast_ref::<M>() else {
                return;
            };
            if filter.as_ref().is_some_and(|f| !f.accept(message)) {
                return;
            }
            deliver_queue.push(message.clone());
        });

        self.subscriptions
            .lock()
            .entry(topic.name().to_owned())
            .or_default()
            .push(SubscriberRecord { id, deliver });

        Ok(Subscription {
            id,
            topic: topic.name().to_owned(),
            bus: Arc::clone(self),
            queue,
            closed: false,
        })
    }

    fn unsubscribe(&self, topic: &str, id: u64) {
        let mut subscriptions = self.subscriptions.lock();
        if let Some(records) = subscriptions.get_mut(topic) {
            records.retain(|record| record.id != id);
            if records.is_empty() {
                subscriptions.remove(topic);
            }
        }
    }
}

/// One consumer's handle on one topic. Yields messages in enqueue order;
/// closing (or dropping) unlinks it from the bus and releases the backlog.
pub struct Subscription<M> {
    id: u64,
    topic: String,
    bus: Arc<InProcessPubSub>,
    queue: Arc<SubQueue<M>>,
    closed: bool,
}

impl<M> Subscription<M> {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next message, in the order enqueued for this subscription. Returns
    /// `None` once the subscription is closed and the backlog released.
    pub async fn recv(&mut self) -> Option<M> {
        if self.closed {
            return None;
        }
        self.queue.pop().await
    }

    /// Closes the subscription. Idempotent; after this returns no further
    /// message is delivered.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let overflow = self.queue.close();
        self.bus.unsubscribe(&self.topic, self.id);
        if overflow > 0 {
            log::warn!(
                "subscription on topic `{}` overflowed, dropped {} oldest messages",
                self.topic,
                overflow
            );
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<M> std::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("closed", &self.closed)
            .finish()
    }
}
