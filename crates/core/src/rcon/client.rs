use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::messages::{RconCommand, RconResponse};
use crate::model::Server;

use super::encoding::PayloadEncoding;
use super::errors::RconError;
use super::packets::{self, OutgoingRconPacket, ResponseRconPacket};
use super::request_id::RequestIdProvider;

struct RequestMetadata {
    command_request_id: i32,
    issuing_user: String,
    command: String,
}

/// A logged-in RCON connection.
///
/// Commands go out as a command packet followed by a synthetic end marker;
/// the read loop buffers response fragments per command id and completes a
/// request when the end marker's echo arrives. Sending and reading may run
/// concurrently; packet pairs never interleave because the writer is held
/// for the duration of [`RconClient::send_command`].
pub struct RconClient<S> {
    server: Server,
    encoding: PayloadEncoding,
    ids: Arc<RequestIdProvider>,
    reader: tokio::sync::Mutex<ReadHalf<S>>,
    writer: tokio::sync::Mutex<WriteHalf<S>>,
    /// End-marker id -> metadata of the request it fences.
    requests: Mutex<HashMap<i32, RequestMetadata>>,
    /// Command id -> response fragments in arrival order.
    fragments: Mutex<HashMap<i32, Vec<Bytes>>>,
}

impl<S> std::fmt::Debug for RconClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconClient").field("server", &self.server).finish()
    }
}

impl<S> RconClient<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    pub(crate) fn new(stream: S, server: Server, ids: Arc<RequestIdProvider>) -> Self {
        let encoding = PayloadEncoding::for_kind(server.kind);
        let (reader, writer) = tokio::io::split(stream);
        Self {
            server,
            encoding,
            ids,
            reader: tokio::sync::Mutex::new(reader),
            writer: tokio::sync::Mutex::new(writer),
            requests: Mutex::new(HashMap::new()),
            fragments: Mutex::new(HashMap::new()),
        }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Writes `msg` as a command packet plus its end marker.
    pub async fn send_command(&self, msg: &RconCommand) -> Result<(), RconError> {
        let command_id = self.ids.next_id();
        let end_id = self.ids.next_id();
        self.requests.lock().insert(
            end_id,
            RequestMetadata {
                command_request_id: command_id,
                issuing_user: msg.issuing_user.clone(),
                command: msg.command.clone(),
            },
        );

        let command = OutgoingRconPacket::Command {
            request_id: command_id,
            command: msg.command.clone(),
        };
        let end = OutgoingRconPacket::CommandEnd { request_id: end_id };

        let mut writer = self.writer.lock().await;
        packets::write_packet(&mut *writer, &command, self.encoding).await?;
        packets::write_packet(&mut *writer, &end, self.encoding).await?;
        Ok(())
    }

    /// Reads frames until the stream fails or the future is dropped.
    ///
    /// Completed commands are handed to `on_response`; unprocessable frames
    /// are reported through `on_error` without terminating the loop.
    pub async fn read<FR, FE>(&self, mut on_response: FR, mut on_error: FE) -> Result<(), RconError>
    where
        FR: FnMut(RconResponse),
        FE: FnMut(String),
    {
        let mut reader = self.reader.lock().await;
        loop {
            match packets::read_packet(&mut *reader).await? {
                ResponseRconPacket::Command { request_id, payload } => {
                    let completed = self.requests.lock().remove(&request_id);
                    match completed {
                        Some(metadata) => on_response(self.assemble_response(&metadata)?),
                        None => {
                            self.fragments.lock().entry(request_id).or_default().push(payload);
                        }
                    }
                }
                ResponseRconPacket::Unprocessable { request_id, message } => {
                    log::debug!(
                        "unprocessable rcon frame from {} (request id {request_id}): {message}",
                        self.server.name
                    );
                    on_error(message);
                }
                // Login frames past the handshake carry no correlatable state.
                ResponseRconPacket::LoginSuccess { .. } | ResponseRconPacket::LoginFailed => {}
            }
        }
    }

    fn assemble_response(&self, metadata: &RequestMetadata) -> Result<RconResponse, RconError> {
        let parts = self
            .fragments
            .lock()
            .remove(&metadata.command_request_id)
            .unwrap_or_default();
        let mut body = Vec::with_capacity(parts.iter().map(Bytes::len).sum());
        for part in &parts {
            body.extend_from_slice(part);
        }
        Ok(RconResponse {
            issuing_user: metadata.issuing_user.clone(),
            server_kind: self.server.kind,
            command: metadata.command.clone(),
            response: self.encoding.decode(&body)?,
        })
    }

    /// Flushes and closes the write side; the peer sees a clean EOF.
    pub async fn shutdown(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.shutdown().await {
            log::debug!("rcon write side of {} closed uncleanly: {err}", self.server.name);
        }
    }
}
