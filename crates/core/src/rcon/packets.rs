//! RCON frame codec.
//!
//! Wire layout, little-endian throughout:
//!
//! ```text
//! int32 length      // counts everything after itself
//! int32 requestId
//! int32 type
//! bytes payload     // null-terminated
//! byte  0x00        // extra pad
//! ```
//!
//! Outgoing types are login (3), command (2) and the synthetic command-end
//! marker (99). The marker is deliberately outside the server's vocabulary:
//! both Source and Paper's Minecraft RCON echo an unknown type back as an
//! empty response carrying the same request id, which acts as a fence behind
//! the (possibly fragmented) command reply.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::encoding::PayloadEncoding;
use super::errors::RconError;

pub const TYPE_LOGIN: i32 = 3;
pub const TYPE_COMMAND: i32 = 2;
pub const TYPE_COMMAND_END: i32 = 99;

const TYPE_RESPONSE: i32 = 0;
const TYPE_LOGIN_ACK: i32 = 2;

/// Frames larger than this are treated as garbage rather than allocated.
const MAX_FRAME_LEN: i32 = 1 << 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutgoingRconPacket {
    Login { request_id: i32, password: String },
    Command { request_id: i32, command: String },
    CommandEnd { request_id: i32 },
}

impl OutgoingRconPacket {
    pub fn request_id(&self) -> i32 {
        match *self {
            OutgoingRconPacket::Login { request_id, .. }
            | OutgoingRconPacket::Command { request_id, .. }
            | OutgoingRconPacket::CommandEnd { request_id } => request_id,
        }
    }

    fn packet_type(&self) -> i32 {
        match self {
            OutgoingRconPacket::Login { .. } => TYPE_LOGIN,
            OutgoingRconPacket::Command { .. } => TYPE_COMMAND,
            OutgoingRconPacket::CommandEnd { .. } => TYPE_COMMAND_END,
        }
    }

    fn payload(&self) -> &str {
        match self {
            OutgoingRconPacket::Login { password, .. } => password,
            OutgoingRconPacket::Command { command, .. } => command,
            OutgoingRconPacket::CommandEnd { .. } => "",
        }
    }

    pub fn encode(&self, encoding: PayloadEncoding) -> Result<Bytes, RconError> {
        let payload = encoding.encode(self.payload())?;
        let body_len = payload.len() + 10;
        let mut frame = BytesMut::with_capacity(body_len + 4);
        frame.put_i32_le(body_len as i32);
        frame.put_i32_le(self.request_id());
        frame.put_i32_le(self.packet_type());
        frame.put_slice(payload);
        frame.put_u8(0);
        frame.put_u8(0);
        Ok(frame.freeze())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseRconPacket {
    LoginSuccess { request_id: i32 },
    LoginFailed,
    Command { request_id: i32, payload: Bytes },
    Unprocessable { request_id: i32, message: String },
}

/// Interprets one frame body (everything after the length prefix).
///
/// Malformed bodies become [`ResponseRconPacket::Unprocessable`] so a single
/// bad frame never tears down the read loop.
pub fn decode_body(body: Bytes) -> ResponseRconPacket {
    if body.len() < 10 {
        return ResponseRconPacket::Unprocessable {
            request_id: 0,
            message: format!("frame body too short: {} bytes", body.len()),
        };
    }
    let mut header = &body[..8];
    let request_id = header.get_i32_le();
    let packet_type = header.get_i32_le();

    if body[body.len() - 2..] != [0, 0] {
        return ResponseRconPacket::Unprocessable {
            request_id,
            message: "padding mismatch".to_owned(),
        };
    }
    let payload = body.slice(8..body.len() - 2);

    match packet_type {
        TYPE_RESPONSE => ResponseRconPacket::Command { request_id, payload },
        TYPE_LOGIN_ACK if request_id == -1 => ResponseRconPacket::LoginFailed,
        TYPE_LOGIN_ACK => ResponseRconPacket::LoginSuccess { request_id },
        other => ResponseRconPacket::Unprocessable {
            request_id,
            message: format!("invalid packet type {other}"),
        },
    }
}

/// Reads exactly one frame. A stream ending mid-frame is
/// [`RconError::IncompleteRead`].
pub async fn read_packet<R>(reader: &mut R) -> Result<ResponseRconPacket, RconError>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    read_exact(reader, &mut len_bytes).await?;
    let length = i32::from_le_bytes(len_bytes);
    if !(0..=MAX_FRAME_LEN).contains(&length) {
        return Err(RconError::InvalidPacket(format!("unreasonable frame length {length}")));
    }
    let mut body = vec![0u8; length as usize];
    read_exact(reader, &mut body).await?;
    Ok(decode_body(Bytes::from(body)))
}

pub async fn write_packet<W>(
    writer: &mut W,
    packet: &OutgoingRconPacket,
    encoding: PayloadEncoding,
) -> Result<(), RconError>
where
    W: AsyncWrite + Unpin,
{
    let frame = packet.encode(encoding)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), RconError>
where
    R: AsyncRead + Unpin,
{
    reader.read_exact(buf).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            RconError::IncompleteRead
        } else {
            RconError::Io(err)
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn frame(request_id: i32, packet_type: i32, payload: &[u8]) -> Vec<u8> {
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

    #[test]
    fn login_packet_encoding() {
        let packet = OutgoingRconPacket::Login {
            request_id: 1,
            password: "pwd".to_owned(),
        };
        let encoded = packet.encode(PayloadEncoding::Utf8).unwrap();
        assert_eq!(encoded.as_ref(), frame(1, 3, b"pwd").as_slice());
    }

    #[test]
    fn command_packet_encoding() {
        let packet = OutgoingRconPacket::Command {
            request_id: 5,
            command: "help".to_owned(),
        };
        let encoded = packet.encode(PayloadEncoding::Utf8).unwrap();
        assert_eq!(encoded.as_ref(), frame(5, 2, b"help").as_slice());
    }

    #[test]
    fn command_end_encoding_uses_synthetic_type() {
        let packet = OutgoingRconPacket::CommandEnd { request_id: 6 };
        let encoded = packet.encode(PayloadEncoding::Utf8).unwrap();
        // Empty payload, type 99, total body of 10 bytes.
        assert_eq!(encoded.as_ref(), frame(6, 99, b"").as_slice());
        assert_eq!(encoded[0], 10);
    }

    #[test]
    fn encode_rejects_unencodable_payload() {
        let packet = OutgoingRconPacket::Command {
            request_id: 1,
            command: "say привет".to_owned(),
        };
        assert!(matches!(
            packet.encode(PayloadEncoding::Ascii),
            Err(RconError::Encoding { .. })
        ));
    }

    #[test]
    fn outgoing_frames_round_trip_structurally() {
        let packets = [
            OutgoingRconPacket::Login {
                request_id: -2147483648,
                password: "hunter2".to_owned(),
            },
            OutgoingRconPacket::Command {
                request_id: 17,
                command: "time set day".to_owned(),
            },
            OutgoingRconPacket::CommandEnd { request_id: 18 },
        ];
        for packet in packets {
            let encoded = packet.encode(PayloadEncoding::Utf8).unwrap();
            let expected = frame(
                packet.request_id(),
                packet.packet_type(),
                packet.payload().as_bytes(),
            );
            assert_eq!(encoded.as_ref(), expected.as_slice());
        }
    }

    #[tokio::test]
    async fn decodes_login_success() {
        let mut stream = Cursor::new(frame(8, 2, b""));
        let packet = read_packet(&mut stream).await.unwrap();
        assert_eq!(packet, ResponseRconPacket::LoginSuccess { request_id: 8 });
    }

    #[tokio::test]
    async fn decodes_login_failure_from_minus_one() {
        let mut stream = Cursor::new(frame(-1, 2, b""));
        let packet = read_packet(&mut stream).await.unwrap();
        assert_eq!(packet, ResponseRconPacket::LoginFailed);
    }

    #[tokio::test]
    async fn decodes_command_response() {
        let mut stream = Cursor::new(frame(7, 0, b"success"));
        let packet = read_packet(&mut stream).await.unwrap();
        assert_eq!(
            packet,
            ResponseRconPacket::Command {
                request_id: 7,
                payload: Bytes::from_static(b"success"),
            }
        );
    }

    #[tokio::test]
    async fn bad_padding_is_unprocessable() {
        let mut raw = frame(9, 0, b"x");
        let len = raw.len();
        raw[len - 1] = 1;
        let packet = read_packet(&mut Cursor::new(raw)).await.unwrap();
        assert_eq!(
            packet,
            ResponseRconPacket::Unprocessable {
                request_id: 9,
                message: "padding mismatch".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn unknown_type_is_unprocessable() {
        let mut stream = Cursor::new(frame(4, 42, b""));
        let packet = read_packet(&mut stream).await.unwrap();
        assert_eq!(
            packet,
            ResponseRconPacket::Unprocessable {
                request_id: 4,
                message: "invalid packet type 42".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn truncated_stream_is_incomplete_read() {
        let full = frame(7, 0, b"success");
        let mut stream = Cursor::new(full[..full.len() - 3].to_vec());
        let err = read_packet(&mut stream).await.unwrap_err();
        assert!(matches!(err, RconError::IncompleteRead));
    }

    #[tokio::test]
    async fn unreasonable_length_is_invalid_packet() {
        let mut stream = Cursor::new((-5i32).to_le_bytes().to_vec());
        let err = read_packet(&mut stream).await.unwrap_err();
        assert!(matches!(err, RconError::InvalidPacket(_)));
    }
}
