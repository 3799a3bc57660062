use crate::model::ServerKind;

use super::errors::RconError;

/// Text encoding of RCON payloads. Source servers speak ASCII, Minecraft
/// servers UTF-8; payloads that do not round-trip under the chosen encoding
/// are rejected rather than mangled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadEncoding {
    Ascii,
    Utf8,
}

impl PayloadEncoding {
    pub fn for_kind(kind: ServerKind) -> Self {
        match kind {
            ServerKind::Source => PayloadEncoding::Ascii,
            ServerKind::Minecraft => PayloadEncoding::Utf8,
        }
    }

    fn name(self) -> &'static str {
        match self {
            PayloadEncoding::Ascii => "ascii",
            PayloadEncoding::Utf8 => "utf-8",
        }
    }

    pub fn encode(self, payload: &str) -> Result<&[u8], RconError> {
        if self == PayloadEncoding::Ascii && !payload.is_ascii() {
            return Err(RconError::Encoding { encoding: self.name() });
        }
        Ok(payload.as_bytes())
    }

    pub fn decode(self, bytes: &[u8]) -> Result<String, RconError> {
        if self == PayloadEncoding::Ascii && !bytes.is_ascii() {
            return Err(RconError::Encoding { encoding: self.name() });
        }
        String::from_utf8(bytes.to_vec()).map_err(|_| RconError::Encoding { encoding: self.name() })
    }
}
