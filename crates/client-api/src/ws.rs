//! The typed WebSocket processor: one per accepted session.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};

use webrcon::pubsub::{BoxFilter, InProcessPubSub, Subscription, TopicDescriptor};

use crate::converters::HtmxConverter;

/// How a processor is wired to the bus. Either direction is optional: a
/// server-push endpoint has no publish topic, the RCON endpoint has both.
pub struct WebsocketPubSub<In, Out> {
    pub pubsub: Arc<InProcessPubSub>,
    pub publish_topic: Option<TopicDescriptor<In>>,
    pub subscribe_topic: Option<TopicDescriptor<Out>>,
    pub subscribe_filter: Option<BoxFilter<Out>>,
}

/// Pumps one WebSocket session against the bus until either side ends.
///
/// Inbound JSON text frames are converted and published; bus messages from
/// the scoped subscription are rendered and sent as text frames. The first
/// side to finish (client disconnect, error, subscription close) tears down
/// the other, then the session is closed.
pub struct WebsocketProcessor<C: HtmxConverter> {
    socket: WebSocket,
    converter: C,
    channels: WebsocketPubSub<C::MessageIn, C::MessageOut>,
}

impl<C: HtmxConverter> WebsocketProcessor<C> {
    pub fn new(
        socket: WebSocket,
        converter: C,
        channels: WebsocketPubSub<C::MessageIn, C::MessageOut>,
    ) -> Self {
        Self {
            socket,
            converter,
            channels,
        }
    }

    pub async fn process(self) {
        let Self {
            socket,
            converter,
            channels,
        } = self;
        let WebsocketPubSub {
            pubsub,
            publish_topic,
            subscribe_topic,
            subscribe_filter,
        } = channels;

        let mut subscription = match subscribe_topic {
            Some(topic) => match pubsub.subscribe(&topic, subscribe_filter) {
                Ok(sub) => Some(sub),
                Err(err) => {
                    log::error!("cannot subscribe websocket to `{topic}`: {err}");
                    None
                }
            },
            None => None,
        };

        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let Some(topic) = &publish_topic else { continue };
                        match serde_json::from_str::<C::DataIn>(&text) {
                            Ok(data) => pubsub.publish(topic, converter.convert_in(data)),
                            Err(err) => log::debug!("discarding malformed frame on `{topic}`: {err}"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Pings and pongs are answered by the protocol stack.
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        log::debug!("websocket read failed: {err}");
                        break;
                    }
                },
                outgoing = recv_next(&mut subscription) => match outgoing {
                    Some(message) => match converter.convert_out(&message) {
                        Ok(fragment) => {
                            if sink.send(Message::Text(fragment)).await.is_err() {
                                break;
                            }
                        }
                        // A template failure skips the frame, not the session.
                        Err(err) => log::error!("rendering outgoing frame failed: {err:#}"),
                    },
                    None => break,
                },
            }
        }

        if let Some(sub) = subscription.as_mut() {
            sub.close();
        }
        let _ = sink.send(Message::Close(None)).await;
    }
}

/// Pends forever when there is nothing to subscribe to, so the read side
/// alone drives the select loop.
async fn recv_next<M: Clone + Send + 'static>(subscription: &mut Option<Subscription<M>>) -> Option<M> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}
