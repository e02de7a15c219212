//! Community-based messages (v1 and v2c).
//!
//! Both versions share `SEQUENCE { version INTEGER, community OCTET STRING, pdu }`;
//! only the version number differs (0 for v1, 1 for v2c).

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::version::Version;

/// v1/v2c message.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityMessage {
    pub version: Version,
    pub community: Bytes,
    pub pdu: Pdu,
}

impl CommunityMessage {
    pub fn v1(community: impl AsRef<[u8]>, pdu: Pdu) -> Self {
        Self::with_version(Version::V1, community, pdu)
    }

    pub fn v2c(community: impl AsRef<[u8]>, pdu: Pdu) -> Self {
        Self::with_version(Version::V2c, community, pdu)
    }

    pub(crate) fn with_version(version: Version, community: impl AsRef<[u8]>, pdu: Pdu) -> Self {
        debug_assert!(version != Version::V3, "community messages are v1/v2c only");
        Self {
            version,
            community: Bytes::copy_from_slice(community.as_ref()),
            pdu,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });
        buf.finish()
    }

    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let at = seq.offset();
        let raw = seq.read_integer()?;
        let version = Version::from_i32(raw)
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::UnknownVersion(raw)))?;
        Self::decode_from_sequence(&mut seq, version)
    }

    pub(crate) fn decode_from_sequence(seq: &mut Decoder, version: Version) -> Result<Self> {
        if version == Version::V3 {
            return Err(Error::decode(
                seq.offset(),
                DecodeErrorKind::UnknownVersion(version.as_i32()),
            ));
        }
        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(seq)?;
        Ok(Self {
            version,
            community,
            pdu,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_known_v2c_get_bytes() {
        // snmpget -v2c -c public <host> 1.3.6.1.2.1.1.1.0 with request-id 1
        let msg = CommunityMessage::v2c("public", Pdu::get_request(1, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]));
        let expected: &[u8] = &[
            0x30, 0x26, 0x02, 0x01, 0x01, 0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', 0xA0,
            0x19, 0x02, 0x01, 0x01, 0x02, 0x01, 0x00, 0x02, 0x01, 0x00, 0x30, 0x0E, 0x30, 0x0C,
            0x06, 0x08, 0x2B, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00, 0x05, 0x00,
        ];
        assert_eq!(msg.encode().as_ref(), expected);
        assert_eq!(CommunityMessage::decode(Bytes::from_static(expected)).unwrap(), msg);
    }

    #[test]
    fn test_v3_rejected() {
        let msg = CommunityMessage::v1("x", Pdu::get_request(1, &[]));
        let mut bytes = msg.encode().to_vec();
        bytes[4] = 3;
        assert!(CommunityMessage::decode(Bytes::from(bytes)).is_err());
    }
}
