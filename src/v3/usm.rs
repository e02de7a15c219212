//! USM security parameters (RFC 3414 Section 2.4).
//!
//! ```text
//! UsmSecurityParameters ::= SEQUENCE {
//!     msgAuthoritativeEngineID     OCTET STRING,
//!     msgAuthoritativeEngineBoots  INTEGER (0..2147483647),
//!     msgAuthoritativeEngineTime   INTEGER (0..2147483647),
//!     msgUserName                  OCTET STRING (SIZE(0..32)),
//!     msgAuthenticationParameters  OCTET STRING,
//!     msgPrivacyParameters         OCTET STRING
//! }
//! ```

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{AuthErrorKind, DecodeErrorKind, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsmSecurityParams {
    pub engine_id: Bytes,
    pub engine_boots: u32,
    pub engine_time: u32,
    pub username: Bytes,
    pub auth_params: Bytes,
    pub priv_params: Bytes,
}

impl UsmSecurityParams {
    pub fn new(
        engine_id: impl Into<Bytes>,
        engine_boots: u32,
        engine_time: u32,
        username: impl Into<Bytes>,
    ) -> Self {
        Self {
            engine_id: engine_id.into(),
            engine_boots,
            engine_time,
            username: username.into(),
            ..Self::default()
        }
    }

    /// All-empty parameters, as sent in a discovery request.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zeroed auth params of `mac_len` octets, overwritten once the HMAC is known.
    pub fn with_auth_placeholder(mut self, mac_len: usize) -> Self {
        self.auth_params = Bytes::from(vec![0u8; mac_len]);
        self
    }

    pub fn with_priv_params(mut self, priv_params: impl Into<Bytes>) -> Self {
        self.priv_params = priv_params.into();
        self
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::with_capacity(64 + self.engine_id.len() + self.username.len());
        buf.push_sequence(|buf| {
            buf.push_octet_string(&self.priv_params);
            buf.push_octet_string(&self.auth_params);
            buf.push_octet_string(&self.username);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_time);
            buf.push_unsigned32(tag::universal::INTEGER, self.engine_boots);
            buf.push_octet_string(&self.engine_id);
        });
        buf.finish()
    }

    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let engine_id = seq.read_octet_string()?;
        let engine_boots = read_engine_value(&mut seq)?;
        let engine_time = read_engine_value(&mut seq)?;
        let username = seq.read_octet_string()?;
        let auth_params = seq.read_octet_string()?;
        let priv_params = seq.read_octet_string()?;

        Ok(Self {
            engine_id,
            engine_boots,
            engine_time,
            username,
            auth_params,
            priv_params,
        })
    }
}

fn read_engine_value(seq: &mut Decoder) -> Result<u32> {
    let at = seq.offset();
    let raw = seq.read_integer()?;
    u32::try_from(raw).map_err(|_| Error::decode(at, DecodeErrorKind::NegativeEngineValue(raw)))
}

/// Locate msgAuthenticationParameters inside an encoded v3 message.
///
/// Returns `(offset, length)` of the parameter's content octets, relative to
/// the start of `message`.
pub fn find_auth_params_offset(message: &[u8]) -> Result<(usize, usize)> {
    locate_auth_params(message).map_err(|_| Error::auth(AuthErrorKind::AuthParamsNotFound))
}

fn locate_auth_params(message: &[u8]) -> Result<(usize, usize)> {
    let mut outer = Decoder::from_slice(message).read_sequence()?;
    outer.skip_tlv()?; // msgVersion
    outer.skip_tlv()?; // msgGlobalData
    let params_len = outer.expect_tag(tag::universal::OCTET_STRING)?;
    let mut usm = outer.sub_decoder(params_len)?.read_sequence()?;
    for _ in 0..4 {
        usm.skip_tlv()?;
    }
    let auth_len = usm.expect_tag(tag::universal::OCTET_STRING)?;
    Ok((usm.offset(), auth_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MsgFlags, MsgGlobalData, ScopedPdu, V3Message};
    use crate::oid;
    use crate::pdu::Pdu;
    use crate::v3::SecurityLevel;

    #[test]
    fn test_params_roundtrip_large_values() {
        let params = UsmSecurityParams::new(
            Bytes::from_static(b"\x80\x00\x1f\x88\x04engine"),
            2_147_483_647,
            86_400,
            Bytes::from_static(b"admin"),
        )
        .with_auth_placeholder(12)
        .with_priv_params(Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8]));
        assert_eq!(UsmSecurityParams::decode(params.encode()).unwrap(), params);
    }

    #[test]
    fn test_negative_boots_rejected() {
        // SEQUENCE { OCTET STRING "", INTEGER -1, ... }
        let data = Bytes::from_static(&[
            0x30, 0x0E, 0x04, 0x00, 0x02, 0x01, 0xFF, 0x02, 0x01, 0x00, 0x04, 0x00, 0x04, 0x00,
            0x04, 0x00,
        ]);
        assert!(matches!(
            UsmSecurityParams::decode(data),
            Err(Error::Decode {
                kind: DecodeErrorKind::NegativeEngineValue(-1),
                ..
            })
        ));
    }

    #[test]
    fn test_find_auth_params_offset() {
        let usm = UsmSecurityParams::new(
            Bytes::from_static(b"engine-id"),
            1,
            2,
            Bytes::from_static(b"user"),
        )
        .with_auth_placeholder(12);
        let msg = V3Message::new(
            MsgGlobalData::new(1, 1472, MsgFlags::new(SecurityLevel::AuthNoPriv, true)),
            usm.encode(),
            ScopedPdu::with_empty_context(Pdu::get_request(1, &[oid!(1, 3, 6, 1)])),
        )
        .encode();

        let (offset, len) = find_auth_params_offset(&msg).unwrap();
        assert_eq!(len, 12);
        assert_eq!(&msg[offset..offset + len], &[0u8; 12]);
        // The octets before the placeholder are its OCTET STRING header.
        assert_eq!(&msg[offset - 2..offset], &[0x04, 12]);
    }

    #[test]
    fn test_find_auth_params_on_garbage() {
        assert!(matches!(
            find_auth_params_offset(&[0x30, 0x02, 0x02, 0x00]),
            Err(Error::Authentication {
                kind: AuthErrorKind::AuthParamsNotFound
            })
        ));
    }
}
