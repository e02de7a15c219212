//! SNMPv3 message format (RFC 3412).
//!
//! ```text
//! SEQUENCE {
//!     INTEGER version (3)
//!     SEQUENCE msgGlobalData { msgID, msgMaxSize, msgFlags, msgSecurityModel }
//!     OCTET STRING msgSecurityParameters
//!     msgData: ScopedPDU, or OCTET STRING when encrypted
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::v3::{SecurityLevel, UsmSecurityParams};

/// Largest msgMaxSize we advertise: the largest UDP payload over IPv4.
pub(crate) const MAX_MSG_SIZE: i32 = 65507;

const MIN_MSG_SIZE: i32 = 484;

const FLAG_AUTH: u8 = 0x01;
const FLAG_PRIV: u8 = 0x02;
const FLAG_REPORTABLE: u8 = 0x04;

/// Security model identifiers. Only USM is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SecurityModel {
    Usm = 3,
}

impl SecurityModel {
    pub fn from_i32(value: i32) -> Option<Self> {
        (value == 3).then_some(Self::Usm)
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// msgFlags (RFC 3412 Section 6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgFlags {
    pub security_level: SecurityLevel,
    pub reportable: bool,
}

impl MsgFlags {
    pub fn new(security_level: SecurityLevel, reportable: bool) -> Self {
        Self {
            security_level,
            reportable,
        }
    }

    /// Parse the flags octet. Privacy without authentication is rejected.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let security_level = match (byte & FLAG_AUTH != 0, byte & FLAG_PRIV != 0) {
            (false, false) => SecurityLevel::NoAuthNoPriv,
            (true, false) => SecurityLevel::AuthNoPriv,
            (true, true) => SecurityLevel::AuthPriv,
            (false, true) => return None,
        };
        Some(Self::new(security_level, byte & FLAG_REPORTABLE != 0))
    }

    pub fn to_byte(self) -> u8 {
        let mut byte = match self.security_level {
            SecurityLevel::NoAuthNoPriv => 0,
            SecurityLevel::AuthNoPriv => FLAG_AUTH,
            SecurityLevel::AuthPriv => FLAG_AUTH | FLAG_PRIV,
        };
        if self.reportable {
            byte |= FLAG_REPORTABLE;
        }
        byte
    }
}

/// msgGlobalData header.
#[derive(Debug, Clone, PartialEq)]
pub struct MsgGlobalData {
    pub msg_id: i32,
    pub msg_max_size: i32,
    pub msg_flags: MsgFlags,
    pub msg_security_model: SecurityModel,
}

impl MsgGlobalData {
    pub fn new(msg_id: i32, msg_max_size: i32, msg_flags: MsgFlags) -> Self {
        Self {
            msg_id,
            msg_max_size,
            msg_flags,
            msg_security_model: SecurityModel::Usm,
        }
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            buf.push_integer(self.msg_security_model.as_i32());
            buf.push_octet_string(&[self.msg_flags.to_byte()]);
            buf.push_integer(self.msg_max_size);
            buf.push_integer(self.msg_id);
        });
    }

    /// Decode and range-check the header: msgID must be non-negative, msgMaxSize
    /// at least 484, and the security model USM.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;

        let at = seq.offset();
        let msg_id = seq.read_integer()?;
        if msg_id < 0 {
            return Err(Error::decode(at, DecodeErrorKind::InvalidMsgId(msg_id)));
        }

        let at = seq.offset();
        let msg_max_size = seq.read_integer()?;
        if msg_max_size < MIN_MSG_SIZE {
            return Err(Error::decode(
                at,
                DecodeErrorKind::MsgMaxSizeTooSmall(msg_max_size),
            ));
        }

        let at = seq.offset();
        let flags = seq.read_octet_string()?;
        if flags.len() != 1 {
            return Err(Error::decode(
                at,
                DecodeErrorKind::InvalidMsgFlagsLength(flags.len()),
            ));
        }
        let msg_flags = MsgFlags::from_byte(flags[0])
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::InvalidMsgFlags))?;

        let at = seq.offset();
        let raw_model = seq.read_integer()?;
        let msg_security_model = SecurityModel::from_i32(raw_model)
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::UnknownSecurityModel(raw_model)))?;

        Ok(Self {
            msg_id,
            msg_max_size,
            msg_flags,
            msg_security_model,
        })
    }
}

/// contextEngineID + contextName + PDU.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedPdu {
    pub context_engine_id: Bytes,
    pub context_name: Bytes,
    pub pdu: Pdu,
}

impl ScopedPdu {
    pub fn new(context_engine_id: impl Into<Bytes>, context_name: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            context_engine_id: context_engine_id.into(),
            context_name: context_name.into(),
            pdu,
        }
    }

    pub fn with_empty_context(pdu: Pdu) -> Self {
        Self::new(Bytes::new(), Bytes::new(), pdu)
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.context_name);
            buf.push_octet_string(&self.context_engine_id);
        });
    }

    /// Standalone encoding, used as the plaintext for privacy.
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        self.encode(&mut buf);
        buf.finish()
    }

    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;
        let context_engine_id = seq.read_octet_string()?;
        let context_name = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        Ok(Self {
            context_engine_id,
            context_name,
            pdu,
        })
    }
}

/// msgData payload.
#[derive(Debug, Clone, PartialEq)]
pub enum V3MessageData {
    Plaintext(ScopedPdu),
    /// Ciphertext of an encoded ScopedPdu.
    Encrypted(Bytes),
}

/// A complete SNMPv3 message.
#[derive(Debug, Clone, PartialEq)]
pub struct V3Message {
    pub global_data: MsgGlobalData,
    /// Encoded USM parameters, carried opaquely.
    pub security_params: Bytes,
    pub data: V3MessageData,
}

impl V3Message {
    pub fn new(global_data: MsgGlobalData, security_params: Bytes, scoped_pdu: ScopedPdu) -> Self {
        Self {
            global_data,
            security_params,
            data: V3MessageData::Plaintext(scoped_pdu),
        }
    }

    pub fn new_encrypted(global_data: MsgGlobalData, security_params: Bytes, ciphertext: Bytes) -> Self {
        Self {
            global_data,
            security_params,
            data: V3MessageData::Encrypted(ciphertext),
        }
    }

    pub fn msg_id(&self) -> i32 {
        self.global_data.msg_id
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.global_data.msg_flags.security_level
    }

    pub fn scoped_pdu(&self) -> Option<&ScopedPdu> {
        match &self.data {
            V3MessageData::Plaintext(scoped) => Some(scoped),
            V3MessageData::Encrypted(_) => None,
        }
    }

    /// Encode to BER.
    ///
    /// Authenticated messages are encoded with zeroed auth params; the HMAC is
    /// spliced in afterwards.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            match &self.data {
                V3MessageData::Plaintext(scoped) => scoped.encode(buf),
                V3MessageData::Encrypted(ciphertext) => buf.push_octet_string(ciphertext),
            }
            buf.push_octet_string(&self.security_params);
            self.global_data.encode(buf);
            buf.push_integer(3);
        });
        buf.finish()
    }

    /// Decode a v3 message. Encrypted payloads are left as ciphertext.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let at = seq.offset();
        let version = seq.read_integer()?;
        if version != 3 {
            return Err(Error::decode(at, DecodeErrorKind::UnknownVersion(version)));
        }
        Self::decode_from_sequence(&mut seq)
    }

    pub(crate) fn decode_from_sequence(seq: &mut Decoder) -> Result<Self> {
        let global_data = MsgGlobalData::decode(seq)?;
        let security_params = seq.read_octet_string()?;

        let data = if global_data.msg_flags.security_level == SecurityLevel::AuthPriv {
            V3MessageData::Encrypted(seq.read_octet_string()?)
        } else {
            V3MessageData::Plaintext(ScopedPdu::decode(seq)?)
        };

        Ok(Self {
            global_data,
            security_params,
            data,
        })
    }

    /// Engine discovery request (RFC 3414 Section 4): unauthenticated, reportable,
    /// empty USM parameters and an empty GetRequest.
    pub fn discovery_request(msg_id: i32) -> Self {
        let global_data = MsgGlobalData::new(
            msg_id,
            MAX_MSG_SIZE,
            MsgFlags::new(SecurityLevel::NoAuthNoPriv, true),
        );
        Self::new(
            global_data,
            UsmSecurityParams::empty().encode(),
            ScopedPdu::with_empty_context(Pdu::get_request(msg_id, &[])),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_flags_byte() {
        assert_eq!(MsgFlags::new(SecurityLevel::AuthPriv, true).to_byte(), 0x07);
        assert_eq!(MsgFlags::new(SecurityLevel::AuthNoPriv, false).to_byte(), 0x01);
        assert_eq!(
            MsgFlags::from_byte(0x04),
            Some(MsgFlags::new(SecurityLevel::NoAuthNoPriv, true))
        );
        assert_eq!(MsgFlags::from_byte(0x02), None);
    }

    #[test]
    fn test_global_data_rejects_small_max_size() {
        let mut buf = EncodeBuf::new();
        MsgGlobalData::new(1, 100, MsgFlags::new(SecurityLevel::NoAuthNoPriv, true)).encode(&mut buf);
        let err = MsgGlobalData::decode(&mut Decoder::new(buf.finish())).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::MsgMaxSizeTooSmall(100),
                ..
            }
        ));
    }

    #[test]
    fn test_plaintext_message_roundtrip() {
        let scoped = ScopedPdu::new(
            Bytes::from_static(b"\x80\x00\x1f\x88\x04"),
            Bytes::from_static(b"ctx"),
            Pdu::get_request(42, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]),
        );
        let msg = V3Message::new(
            MsgGlobalData::new(100, 1472, MsgFlags::new(SecurityLevel::AuthNoPriv, true)),
            Bytes::from_static(b"usm"),
            scoped,
        );
        assert_eq!(V3Message::decode(msg.encode()).unwrap(), msg);
    }

    #[test]
    fn test_encrypted_payload_kept_opaque() {
        let msg = V3Message::new_encrypted(
            MsgGlobalData::new(7, 1472, MsgFlags::new(SecurityLevel::AuthPriv, false)),
            Bytes::from_static(b"usm"),
            Bytes::from_static(b"\x01\x02\x03\x04\x05\x06\x07\x08"),
        );
        let decoded = V3Message::decode(msg.encode()).unwrap();
        assert!(decoded.scoped_pdu().is_none());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_discovery_request_shape() {
        let msg = V3Message::discovery_request(99);
        assert_eq!(msg.global_data.msg_max_size, MAX_MSG_SIZE);
        assert!(msg.global_data.msg_flags.reportable);
        assert_eq!(msg.security_level(), SecurityLevel::NoAuthNoPriv);
        let scoped = msg.scoped_pdu().unwrap();
        assert!(scoped.pdu.varbinds.is_empty());
        assert!(scoped.context_engine_id.is_empty());
    }
}
