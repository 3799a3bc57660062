use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::model::{Server, ServerKind};
use crate::util::retry::{retry_with_backoff, RetryConfig};

use super::client::RconClient;
use super::encoding::PayloadEncoding;
use super::errors::RconError;
use super::packets::{self, OutgoingRconPacket, ResponseRconPacket};
use super::request_id::RequestIdProvider;

/// Deadline for establishing the TCP connection. Reads and writes carry no
/// deadline of their own: the server may idle indefinitely and drains are
/// expected to succeed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds logged-in [`RconClient`]s, retrying the whole
/// connect → login → verify sequence with backoff.
///
/// The server descriptor is refetched through `supplier` on every attempt,
/// so an operator fixing a stored password or address takes effect on the
/// next retry cycle.
pub struct RconClientManager;

impl RconClientManager {
    pub async fn connect<Sup, SupFut, Hook, HookFut>(
        retry: &RetryConfig,
        supplier: Sup,
        on_failure: Option<Hook>,
    ) -> Result<RconClient<TcpStream>, RconError>
    where
        Sup: Fn() -> SupFut,
        SupFut: Future<Output = Result<Server, RconError>>,
        Hook: Fn(&RconError) -> HookFut,
        HookFut: Future<Output = ()>,
    {
        let ids = Arc::new(RequestIdProvider::new());
        retry_with_backoff(
            retry,
            || {
                let ids = Arc::clone(&ids);
                let server = supplier();
                async move { Self::connect_once(server.await?, &ids).await }
            },
            RconError::is_retryable,
            on_failure,
        )
        .await
    }

    async fn connect_once(
        server: Server,
        ids: &Arc<RequestIdProvider>,
    ) -> Result<RconClient<TcpStream>, RconError> {
        let addr = server.rcon_addr();
        let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| RconError::ConnectTimeout {
                addr: addr.clone(),
                timeout: CONNECT_TIMEOUT,
            })??;

        let encoding = PayloadEncoding::for_kind(server.kind);
        let login_id = ids.next_id();
        let login = OutgoingRconPacket::Login {
            request_id: login_id,
            password: server.rcon_password.clone(),
        };
        packets::write_packet(&mut stream, &login, encoding).await?;

        if server.kind == ServerKind::Source {
            // Source sends an empty command response ahead of the login ack.
            match packets::read_packet(&mut stream).await? {
                ResponseRconPacket::Command { request_id, .. } if request_id == login_id => {}
                other => {
                    return Err(RconError::InvalidPacket(format!(
                        "expected empty preamble for login {login_id}, got {other:?}"
                    )))
                }
            }
        }

        match packets::read_packet(&mut stream).await? {
            ResponseRconPacket::LoginSuccess { request_id } if request_id == login_id => {}
            ResponseRconPacket::LoginSuccess { request_id } => {
                return Err(RconError::RequestIdMismatch {
                    expected: login_id,
                    received: request_id,
                })
            }
            ResponseRconPacket::LoginFailed => return Err(RconError::InvalidPassword),
            ResponseRconPacket::Unprocessable { message, .. } => {
                return Err(RconError::InvalidPacket(message))
            }
            ResponseRconPacket::Command { .. } => {
                return Err(RconError::InvalidPacket("expected login response".to_owned()))
            }
        }

        log::info!("logged in to rcon of `{}` at {addr}", server.name);
        Ok(RconClient::new(stream, server, Arc::clone(ids)))
    }
}
