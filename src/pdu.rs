//! SNMP Protocol Data Units.
//!
//! One [`Pdu`] shape covers every request and response a manager exchanges. For
//! GETBULK the error-status and error-index fields carry non-repeaters and
//! max-repetitions (RFC 3416 Section 4.2.3).

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list, null_varbinds};

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PduType {
    GetRequest = tag::pdu::GET_REQUEST,
    GetNextRequest = tag::pdu::GET_NEXT_REQUEST,
    Response = tag::pdu::RESPONSE,
    SetRequest = tag::pdu::SET_REQUEST,
    GetBulkRequest = tag::pdu::GET_BULK_REQUEST,
    Report = tag::pdu::REPORT,
}

impl PduType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::pdu::GET_REQUEST => Some(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::pdu::RESPONSE => Some(Self::Response),
            tag::pdu::SET_REQUEST => Some(Self::SetRequest),
            tag::pdu::GET_BULK_REQUEST => Some(Self::GetBulkRequest),
            tag::pdu::REPORT => Some(Self::Report),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::GetRequest => "GetRequest",
            Self::GetNextRequest => "GetNextRequest",
            Self::Response => "Response",
            Self::SetRequest => "SetRequest",
            Self::GetBulkRequest => "GetBulkRequest",
            Self::Report => "Report",
        };
        f.write_str(name)
    }
}

/// Request or response PDU.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i32,
    /// Error status, or non-repeaters for GETBULK.
    pub error_status: i32,
    /// 1-based error index, or max-repetitions for GETBULK.
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    fn request(pdu_type: PduType, request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    pub fn get_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduType::GetRequest, request_id, null_varbinds(oids))
    }

    pub fn get_next_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(PduType::GetNextRequest, request_id, null_varbinds(oids))
    }

    pub fn set_request(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self::request(PduType::SetRequest, request_id, varbinds)
    }

    pub fn get_bulk(
        request_id: i32,
        non_repeaters: i32,
        max_repetitions: i32,
        oids: &[Oid],
    ) -> Self {
        Self {
            pdu_type: PduType::GetBulkRequest,
            request_id,
            error_status: non_repeaters,
            error_index: max_repetitions,
            varbinds: null_varbinds(oids),
        }
    }

    /// Copy of this request under a new request id.
    pub fn with_request_id(&self, request_id: i32) -> Self {
        Self {
            request_id,
            ..self.clone()
        }
    }

    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let at = decoder.offset();
        let tag = decoder.read_tag()?;
        let pdu_type = PduType::from_tag(tag)
            .ok_or_else(|| Error::decode(at, DecodeErrorKind::UnknownPduType(tag)))?;
        let len = decoder.read_length()?;
        let mut body = decoder.sub_decoder(len)?;

        let request_id = body.read_integer()?;
        let error_status = body.read_integer()?;
        let error_index = body.read_integer()?;
        let varbinds = decode_varbind_list(&mut body)?;

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    pub fn is_error(&self) -> bool {
        self.pdu_type != PduType::GetBulkRequest && self.error_status != 0
    }

    pub fn error_status_enum(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }

    /// The binding named by a 1-based error index, when it is in range.
    pub fn error_varbind(&self) -> Option<&VarBind> {
        let idx = usize::try_from(self.error_index).ok()?.checked_sub(1)?;
        self.varbinds.get(idx)
    }

    /// Turn a non-zero error status into [`Error::Snmp`].
    pub fn check_error(&self) -> Result<()> {
        if !self.is_error() {
            return Ok(());
        }
        Err(Error::Snmp {
            status: self.error_status_enum(),
            index: self.error_index.max(0) as u32,
            oid: self.error_varbind().map(|vb| vb.oid.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::value::Value;

    fn roundtrip(pdu: &Pdu) -> Pdu {
        let mut buf = EncodeBuf::new();
        pdu.encode(&mut buf);
        Pdu::decode(&mut Decoder::new(buf.finish())).unwrap()
    }

    #[test]
    fn test_request_roundtrips() {
        let oids = [oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)];
        for pdu in [
            Pdu::get_request(7, &oids),
            Pdu::get_next_request(8, &oids),
            Pdu::get_bulk(9, 1, 25, &oids),
            Pdu::set_request(10, vec![VarBind::new(oids[1].clone(), Value::from("core-sw1"))]),
        ] {
            assert_eq!(roundtrip(&pdu), pdu);
        }
    }

    #[test]
    fn test_bulk_fields_are_not_errors() {
        let pdu = Pdu::get_bulk(1, 0, 15, &[oid!(1, 3, 6, 1)]);
        assert_eq!(pdu.error_status, 0);
        assert_eq!(pdu.error_index, 15);
        assert!(!pdu.is_error());
        assert!(pdu.check_error().is_ok());
    }

    #[test]
    fn test_check_error_names_varbind() {
        let mut pdu = Pdu::get_request(1, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), oid!(1, 3, 6, 1, 9)]);
        pdu.pdu_type = PduType::Response;
        pdu.error_status = 2;
        pdu.error_index = 2;
        match pdu.check_error() {
            Err(Error::Snmp { status, index, oid }) => {
                assert_eq!(status, ErrorStatus::NoSuchName);
                assert_eq!(index, 2);
                assert_eq!(oid, Some(oid!(1, 3, 6, 1, 9)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_pdu_tag() {
        // Trap-PDU (0xA4) is not something a manager session accepts.
        let mut dec = Decoder::from_slice(&[0xA4, 0x00]);
        assert!(matches!(
            Pdu::decode(&mut dec),
            Err(Error::Decode {
                kind: DecodeErrorKind::UnknownPduType(0xA4),
                ..
            })
        ));
    }
}
