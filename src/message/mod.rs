//! SNMP message envelopes.
//!
//! - [`CommunityMessage`]: v1/v2c, `SEQUENCE { version, community, pdu }`
//! - [`V3Message`]: v3 with USM security parameters and a plaintext or encrypted scoped PDU

mod community;
mod v3;

pub use community::CommunityMessage;
pub(crate) use v3::MAX_MSG_SIZE;
pub use v3::{MsgFlags, MsgGlobalData, ScopedPdu, SecurityModel, V3Message, V3MessageData};

use bytes::Bytes;

use crate::ber::Decoder;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::version::Version;

/// A decoded message of any version.
#[derive(Debug, Clone)]
pub enum Message {
    Community(CommunityMessage),
    V3(V3Message),
}

impl Message {
    pub fn version(&self) -> Version {
        match self {
            Message::Community(m) => m.version,
            Message::V3(_) => Version::V3,
        }
    }

    /// Decode a datagram, dispatching on the version field.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let at = seq.offset();
        let raw = seq.read_integer()?;
        let version = Version::from_i32(raw)
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::UnknownVersion(raw)))?;

        match version {
            Version::V1 | Version::V2c => Ok(Message::Community(
                CommunityMessage::decode_from_sequence(&mut seq, version)?,
            )),
            Version::V3 => Ok(Message::V3(V3Message::decode_from_sequence(&mut seq)?)),
        }
    }
}

impl From<CommunityMessage> for Message {
    fn from(msg: CommunityMessage) -> Self {
        Message::Community(msg)
    }
}

impl From<V3Message> for Message {
    fn from(msg: V3Message) -> Self {
        Message::V3(msg)
    }
}
