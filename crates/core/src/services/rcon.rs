use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::messages::{
    notification_topic, rcon_command_topic, rcon_response_topic, server_status_topic,
    NotificationMessage, RconCommand, ServerStatusMessage, Severity,
};
use crate::pubsub::{FieldLength, InProcessPubSub, LengthMode, PubSubFilter, Subscription};
use crate::rcon::{RconClient, RconClientManager, RconError};
use crate::repo::ServerRepository;
use crate::util::retry::RetryConfig;

use super::{Service, ServiceError};

/// Delay before the supervisor relaunches this service after the server side
/// cut the stream mid-frame.
const RECONNECT_DELAY: Duration = Duration::from_millis(5000);

pub fn rcon_service_name(server_uid: Uuid) -> String {
    format!("rcon_service_{server_uid}")
}

/// Per-server actor: owns one RCON connection and bridges it to the bus.
///
/// Commands arrive on `rcon_command/<uid>`, replies leave on
/// `rcon_response/<uid>`, and connection lifecycle events go out on the
/// status and notification topics.
pub struct RconService {
    pubsub: Arc<InProcessPubSub>,
    server_uid: Uuid,
    servers: Arc<dyn ServerRepository>,
    retry: RetryConfig,
}

impl RconService {
    pub fn new(
        pubsub: Arc<InProcessPubSub>,
        server_uid: Uuid,
        servers: Arc<dyn ServerRepository>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            pubsub,
            server_uid,
            servers,
            retry,
        }
    }

    async fn connect(&self) -> Result<RconClient<TcpStream>, RconError> {
        let uid = self.server_uid;
        let servers = Arc::clone(&self.servers);
        let supplier = move || {
            let servers = Arc::clone(&servers);
            async move {
                servers
                    .get_by_uid(uid)
                    .await
                    .map_err(RconError::Other)?
                    .ok_or(RconError::UnknownServer(uid))
            }
        };

        let pubsub = Arc::clone(&self.pubsub);
        let on_failure = move |err: &RconError| {
            let notification = NotificationMessage::broadcast(
                format!("RCON connection to server {uid} failed: {err}"),
                Severity::Warning,
            );
            let pubsub = Arc::clone(&pubsub);
            async move { pubsub.publish(&notification_topic(), notification) }
        };

        RconClientManager::connect(&self.retry, supplier, Some(on_failure)).await
    }

    async fn process(
        &self,
        client: RconClient<TcpStream>,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        let server = client.server().clone();

        // Subscribe before announcing the connection, so a command issued
        // right after the status flips cannot slip past the write loop.
        fn command_field(m: &RconCommand) -> &String {
            &m.command
        }
        let filter = FieldLength::<_, String>::new(command_field, 1, LengthMode::Min);
        let commands = self
            .pubsub
            .subscribe(&rcon_command_topic(self.server_uid), Some(filter.boxed()))
            .map_err(|err| ServiceError::Fatal(err.into()))?;

        self.pubsub.publish(
            &server_status_topic(),
            ServerStatusMessage::RconConnected(server.uid),
        );
        self.pubsub.publish(
            &notification_topic(),
            NotificationMessage::broadcast(
                format!("Connected to RCON of {}", server.name),
                Severity::Success,
            ),
        );

        // First loop to finish cancels the other; the parent token reaches
        // both through the same child.
        let local = cancel.child_token();
        let write = async {
            let result = self.write_loop(commands, &client, &local).await;
            local.cancel();
            result
        };
        let read = async {
            let result = self.read_loop(&client, &local).await;
            local.cancel();
            result
        };
        let (write_result, read_result) = tokio::join!(write, read);

        client.shutdown().await;
        self.pubsub.publish(
            &server_status_topic(),
            ServerStatusMessage::RconDisconnected(server.uid),
        );
        self.pubsub.publish(
            &notification_topic(),
            NotificationMessage::broadcast(
                format!("Disconnected from RCON of {}", server.name),
                Severity::Error,
            ),
        );

        combine_loop_results(write_result, read_result)
    }

    async fn write_loop(
        &self,
        mut sub: Subscription<RconCommand>,
        client: &RconClient<TcpStream>,
        cancel: &CancellationToken,
    ) -> Result<(), RconError> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                command = sub.recv() => match command {
                    Some(command) => client.send_command(&command).await?,
                    None => return Ok(()),
                }
            }
        }
    }

    async fn read_loop(
        &self,
        client: &RconClient<TcpStream>,
        cancel: &CancellationToken,
    ) -> Result<(), RconError> {
        let response_topic = rcon_response_topic(self.server_uid);
        let read = client.read(
            |response| self.pubsub.publish(&response_topic, response),
            |message| {
                self.pubsub.publish(
                    &notification_topic(),
                    NotificationMessage::broadcast(message, Severity::Warning),
                )
            },
        );
        tokio::select! {
            _ = cancel.cancelled() => Ok(()),
            result = read => result,
        }
    }
}

#[async_trait]
impl Service for RconService {
    fn name(&self) -> String {
        rcon_service_name(self.server_uid)
    }

    async fn launch(&self, cancel: CancellationToken) -> Result<(), ServiceError> {
        let client = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            client = self.connect() => client.map_err(connect_error)?,
        };
        self.process(client, &cancel).await
    }

    async fn stop(&self) {}
}

fn connect_error(err: RconError) -> ServiceError {
    match err {
        RconError::IncompleteRead => {
            ServiceError::recoverable(RconError::IncompleteRead, RECONNECT_DELAY)
        }
        other => ServiceError::Fatal(other.into()),
    }
}

/// Folds the two loop outcomes into one service result. Non-recoverable
/// errors dominate; an `IncompleteRead` asks for a delayed restart.
fn combine_loop_results(
    write: Result<(), RconError>,
    read: Result<(), RconError>,
) -> Result<(), ServiceError> {
    let mut errors: Vec<RconError> = [write, read].into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        return Ok(());
    }
    if let Some(fatal) = errors
        .iter()
        .position(|err| !matches!(err, RconError::IncompleteRead))
    {
        return Err(ServiceError::Fatal(errors.swap_remove(fatal).into()));
    }
    Err(ServiceError::recoverable(errors.swap_remove(0), RECONNECT_DELAY))
}
