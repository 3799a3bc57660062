//! Drives a supervised RCON service against a scripted Minecraft-style RCON
//! server on a local socket: login, a command round-trip over the bus, and
//! the disconnect events when the server cuts the stream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use uuid::Uuid;

use webrcon::messages::{
    notification_topic, rcon_command_topic, rcon_response_topic, server_status_topic, RconCommand,
    ServerStatusMessage, Severity,
};
use webrcon::model::{Server, ServerKind};
use webrcon::pubsub::InProcessPubSub;
use webrcon::repo::ServerRepository;
use webrcon::services::{rcon_service_name, RconService, ServiceSupervisor};
use webrcon::util::RetryConfig;

struct SingleServerRepo {
    server: Server,
}

#[async_trait]
impl ServerRepository for SingleServerRepo {
    async fn get_by_uid(&self, uid: Uuid) -> anyhow::Result<Option<Server>> {
        Ok((uid == self.server.uid).then(|| self.server.clone()))
    }

    async fn get_all(&self) -> anyhow::Result<Vec<Server>> {
        Ok(vec![self.server.clone()])
    }

    async fn get_user_servers(&self, _username: &str) -> anyhow::Result<Vec<Server>> {
        Ok(vec![self.server.clone()])
    }
}

fn response_frame(request_id: i32, packet_type: i32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&request_id.to_le_bytes());
    body.extend_from_slice(&packet_type.to_le_bytes());
    body.extend_from_slice(payload);
    body.extend_from_slice(&[0, 0]);
    let mut out = Vec::new();
    out.extend_from_slice(&(body.len() as i32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

async fn read_client_frame(stream: &mut TcpStream) -> (i32, i32, Vec<u8>) {
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes).await.unwrap();
    let mut body = vec![0u8; i32::from_le_bytes(len_bytes) as usize];
    stream.read_exact(&mut body).await.unwrap();
    let request_id = i32::from_le_bytes(body[0..4].try_into().unwrap());
    let packet_type = i32::from_le_bytes(body[4..8].try_into().unwrap());
    (request_id, packet_type, body[8..body.len() - 2].to_vec())
}

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn login_command_and_disconnect_flow() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let script = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let (login_id, login_type, password) = read_client_frame(&mut stream).await;
        assert_eq!(login_type, 3);
        assert_eq!(password, b"test");
        stream
            .write_all(&response_frame(login_id, 2, b""))
            .await
            .unwrap();

        let (cmd_id, cmd_type, command) = read_client_frame(&mut stream).await;
        assert_eq!(cmd_type, 2);
        assert_eq!(command, b"time set day");
        let (end_id, end_type, _) = read_client_frame(&mut stream).await;
        assert_eq!(end_type, 99);

        stream
            .write_all(&response_frame(cmd_id, 0, b"Set the time to 1000"))
            .await
            .unwrap();
        stream
            .write_all(&response_frame(end_id, 0, b""))
            .await
            .unwrap();
        // Cut the connection; the service should report the disconnect.
        drop(stream);
    });

    let server = Server {
        uid: Uuid::new_v4(),
        kind: ServerKind::Minecraft,
        name: "creative".to_owned(),
        host: "127.0.0.1".to_owned(),
        port: 25565,
        rcon_port: port,
        rcon_password: "test".to_owned(),
        description: String::new(),
    };
    let uid = server.uid;

    let pubsub = Arc::new(InProcessPubSub::new());
    let mut status_events = pubsub.subscribe(&server_status_topic(), None).unwrap();
    let mut notifications = pubsub.subscribe(&notification_topic(), None).unwrap();
    let mut responses = pubsub.subscribe(&rcon_response_topic(uid), None).unwrap();

    let supervisor = ServiceSupervisor::new();
    let retry = RetryConfig {
        base_backoff: Duration::from_millis(1),
        jitter: None,
        max_backoff: Some(Duration::from_millis(10)),
        max_tries: Some(5),
        log_level: log::Level::Debug,
    };
    let service = Arc::new(RconService::new(
        Arc::clone(&pubsub),
        uid,
        Arc::new(SingleServerRepo { server }),
        retry,
    ));
    supervisor.launch(service, true).await;
    assert!(supervisor.is_running(&rcon_service_name(uid)));

    let connected = timeout(WAIT, status_events.recv()).await.unwrap().unwrap();
    assert_eq!(connected, ServerStatusMessage::RconConnected(uid));

    let connected_note = timeout(WAIT, notifications.recv()).await.unwrap().unwrap();
    assert_eq!(connected_note.severity, Severity::Success);
    assert!(connected_note.message.contains("creative"));

    pubsub.publish(
        &rcon_command_topic(uid),
        RconCommand {
            issuing_user: "test".to_owned(),
            command: "time set day".to_owned(),
        },
    );

    let response = timeout(WAIT, responses.recv()).await.unwrap().unwrap();
    assert_eq!(response.issuing_user, "test");
    assert_eq!(response.command, "time set day");
    assert_eq!(response.response, "Set the time to 1000");
    assert_eq!(response.server_kind, ServerKind::Minecraft);

    let disconnected = timeout(WAIT, status_events.recv()).await.unwrap().unwrap();
    assert_eq!(disconnected, ServerStatusMessage::RconDisconnected(uid));

    let disconnected_note = timeout(WAIT, notifications.recv()).await.unwrap().unwrap();
    assert_eq!(disconnected_note.severity, Severity::Error);

    script.await.unwrap();
    supervisor.stop_all().await;
    assert!(!supervisor.is_running(&rcon_service_name(uid)));
}

#[tokio::test]
async fn empty_commands_never_reach_the_wire() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let script = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let (login_id, _, _) = read_client_frame(&mut stream).await;
        stream
            .write_all(&response_frame(login_id, 2, b""))
            .await
            .unwrap();

        // The only command frame we should ever see is the non-empty one.
        let (_, _, command) = read_client_frame(&mut stream).await;
        assert_eq!(command, b"list");
        stream
    });

    let server = Server {
        uid: Uuid::new_v4(),
        kind: ServerKind::Minecraft,
        name: "survival".to_owned(),
        host: "127.0.0.1".to_owned(),
        port: 25565,
        rcon_port: port,
        rcon_password: "test".to_owned(),
        description: String::new(),
    };
    let uid = server.uid;

    let pubsub = Arc::new(InProcessPubSub::new());
    let mut status_events = pubsub.subscribe(&server_status_topic(), None).unwrap();

    let supervisor = ServiceSupervisor::new();
    let retry = RetryConfig {
        base_backoff: Duration::from_millis(1),
        jitter: None,
        max_backoff: Some(Duration::from_millis(10)),
        max_tries: Some(5),
        log_level: log::Level::Debug,
    };
    let service = Arc::new(RconService::new(
        Arc::clone(&pubsub),
        uid,
        Arc::new(SingleServerRepo { server }),
        retry,
    ));
    supervisor.launch(service, true).await;

    let connected = timeout(WAIT, status_events.recv()).await.unwrap().unwrap();
    assert_eq!(connected, ServerStatusMessage::RconConnected(uid));

    pubsub.publish(
        &rcon_command_topic(uid),
        RconCommand {
            issuing_user: "test".to_owned(),
            command: String::new(),
        },
    );
    pubsub.publish(
        &rcon_command_topic(uid),
        RconCommand {
            issuing_user: "test".to_owned(),
            command: "list".to_owned(),
        },
    );

    script.await.unwrap();
    supervisor.stop_all().await;
}
