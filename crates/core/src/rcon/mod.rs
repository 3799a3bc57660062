//! Source/Minecraft RCON: wire codec, connected client with multi-packet
//! response reassembly, and the connect-with-retry manager.

mod client;
mod encoding;
mod errors;
mod manager;
pub mod packets;
mod request_id;

pub use client::RconClient;
pub use encoding::PayloadEncoding;
pub use errors::RconError;
pub use manager::{RconClientManager, CONNECT_TIMEOUT};
pub use request_id::RequestIdProvider;
