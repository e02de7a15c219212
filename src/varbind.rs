//! Wire-level variable bindings.
//!
//! A [`VarBind`] is what travels inside a PDU: a numeric OID and a [`Value`]. The
//! caller-facing, name-aware form is [`crate::variable::SnmpVariable`].

use crate::ber::{Decoder, EncodeBuf};
use crate::error::Result;
use crate::oid::Oid;
use crate::value::{SnmpType, Value};

/// An (OID, value) pair as carried in a PDU.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

impl VarBind {
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// Binding with a NULL value, as sent in GET/GETNEXT/GETBULK requests.
    pub fn null(oid: Oid) -> Self {
        Self::new(oid, Value::Null)
    }

    /// The type tag of the value.
    pub fn snmp_type(&self) -> SnmpType {
        self.value.snmp_type()
    }

    /// Whether this binding still belongs to the walk rooted at `root`.
    ///
    /// Sentinel values end a walk even when their OID is inside the subtree.
    pub fn continues_walk(&self, root: &Oid) -> bool {
        !self.value.is_exception() && self.oid.starts_with(root)
    }

    /// Encode as `SEQUENCE { name, value }`.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.value.encode(buf);
            buf.push_oid(&self.oid);
        });
    }

    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;
        let oid = seq.read_oid()?;
        let value = Value::decode(&mut seq)?;
        Ok(VarBind { oid, value })
    }
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}: {}", self.oid, self.snmp_type(), self.value)
    }
}

/// Encode a VarBindList.
pub fn encode_varbind_list(buf: &mut EncodeBuf, varbinds: &[VarBind]) {
    buf.push_sequence(|buf| {
        for vb in varbinds.iter().rev() {
            vb.encode(buf);
        }
    });
}

/// Decode a VarBindList, preserving order.
pub fn decode_varbind_list(decoder: &mut Decoder) -> Result<Vec<VarBind>> {
    let mut seq = decoder.read_sequence()?;
    let mut varbinds = Vec::with_capacity((seq.remaining() / 16).max(1));
    while !seq.is_empty() {
        varbinds.push(VarBind::decode(&mut seq)?);
    }
    Ok(varbinds)
}

/// Build NULL-valued bindings for read requests.
pub fn null_varbinds(oids: &[Oid]) -> Vec<VarBind> {
    oids.iter().cloned().map(VarBind::null).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use bytes::Bytes;

    fn roundtrip_list(varbinds: &[VarBind]) -> Vec<VarBind> {
        let mut buf = EncodeBuf::new();
        encode_varbind_list(&mut buf, varbinds);
        decode_varbind_list(&mut Decoder::new(buf.finish())).unwrap()
    }

    #[test]
    fn test_list_preserves_order_and_sentinels() {
        let varbinds = vec![
            VarBind::new(
                oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
                Value::OctetString(Bytes::from_static(b"Linux router")),
            ),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 99, 0), Value::NoSuchObject),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(123456)),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 100, 0), Value::EndOfMibView),
        ];
        assert_eq!(roundtrip_list(&varbinds), varbinds);
        assert!(roundtrip_list(&[]).is_empty());
    }

    #[test]
    fn test_exact_wire_bytes() {
        // SEQUENCE { SEQUENCE { OID 1.3.6.1, NULL } }
        let mut buf = EncodeBuf::new();
        encode_varbind_list(&mut buf, &null_varbinds(&[oid!(1, 3, 6, 1)]));
        assert_eq!(
            buf.finish_vec(),
            vec![0x30, 0x09, 0x30, 0x07, 0x06, 0x03, 0x2B, 0x06, 0x01, 0x05, 0x00]
        );
    }

    #[test]
    fn test_continues_walk() {
        let root = oid!(1, 3, 6, 1, 2, 1, 2);
        assert!(VarBind::new(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(1)).continues_walk(&root));
        assert!(!VarBind::new(oid!(1, 3, 6, 1, 2, 1, 3, 1), Value::Integer(1)).continues_walk(&root));
        assert!(!VarBind::new(oid!(1, 3, 6, 1, 2, 1, 2, 9), Value::EndOfMibView).continues_walk(&root));
    }

    #[test]
    fn test_display() {
        let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 7, 0), Value::Integer(72));
        assert_eq!(vb.to_string(), "1.3.6.1.2.1.1.7.0 = INTEGER: 72");
    }
}
