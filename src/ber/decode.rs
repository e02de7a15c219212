//! BER decoding.
//!
//! Zero-copy: sub-decoders and octet strings are `Bytes` slices of the original buffer.
//! Offsets in errors are relative to the buffer the decoder was created over.

use bytes::Bytes;

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// BER decoder that reads from a byte buffer.
pub struct Decoder {
    data: Bytes,
    offset: usize,
    /// Position of `data` inside the outermost buffer, for error reporting.
    base: usize,
}

impl Decoder {
    /// Create a new decoder from bytes.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            offset: 0,
            base: 0,
        }
    }

    /// Create a decoder from a byte slice (copies the data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Absolute offset of the read cursor.
    pub fn offset(&self) -> usize {
        self.base + self.offset
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Check if everything has been consumed.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    fn fail<T>(&self, at: usize, kind: DecodeErrorKind) -> Result<T> {
        let offset = self.base + at;
        tracing::debug!(target: "tdsnmp::ber", { snmp.offset = offset, kind = %kind }, "decode failed");
        Err(Error::decode(offset, kind))
    }

    /// Read a tag octet.
    pub fn read_tag(&mut self) -> Result<u8> {
        match self.data.get(self.offset) {
            Some(&tag) => {
                self.offset += 1;
                Ok(tag)
            }
            None => self.fail(self.offset, DecodeErrorKind::TruncatedData),
        }
    }

    /// Read length octets.
    pub fn read_length(&mut self) -> Result<usize> {
        let (len, used) = decode_length(&self.data[self.offset..], self.offset())?;
        self.offset += used;
        Ok(len)
    }

    /// Read `len` raw bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        let end = self.offset.saturating_add(len);
        if end > self.data.len() {
            return self.fail(
                self.offset,
                DecodeErrorKind::InsufficientData {
                    needed: len,
                    available: self.remaining(),
                },
            );
        }
        let bytes = self.data.slice(self.offset..end);
        self.offset = end;
        Ok(bytes)
    }

    /// Read a tag, check it, and return the content length.
    pub fn expect_tag(&mut self, expected: u8) -> Result<usize> {
        let at = self.offset;
        let actual = self.read_tag()?;
        if actual != expected {
            if actual == tag::universal::OCTET_STRING_CONSTRUCTED
                && expected == tag::universal::OCTET_STRING
            {
                return self.fail(at, DecodeErrorKind::ConstructedOctetString);
            }
            return self.fail(at, DecodeErrorKind::UnexpectedTag { expected, actual });
        }
        self.read_length()
    }

    /// Read an INTEGER.
    pub fn read_integer(&mut self) -> Result<i32> {
        let len = self.expect_tag(tag::universal::INTEGER)?;
        self.read_integer_value(len)
    }

    /// Read INTEGER content octets of known length.
    ///
    /// Values wider than 32 bits keep their first four octets, as net-snmp does.
    pub fn read_integer_value(&mut self, len: usize) -> Result<i32> {
        if len == 0 {
            return self.fail(self.offset, DecodeErrorKind::ZeroLengthInteger);
        }
        if len > 4 {
            tracing::warn!(target: "tdsnmp::ber", { snmp.offset = self.offset(), length = len }, "integer too long, truncating to 4 bytes");
        }
        let bytes = self.read_bytes(len)?;
        let seed: i32 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
        Ok(bytes
            .iter()
            .take(4)
            .fold(seed, |acc, &b| (acc << 8) | i32::from(b)))
    }

    /// Read unsigned 32-bit content octets of known length.
    pub fn read_unsigned32_value(&mut self, len: usize) -> Result<u32> {
        if len == 0 {
            return self.fail(self.offset, DecodeErrorKind::ZeroLengthInteger);
        }
        let bytes = self.read_bytes(len)?;
        let significant = if bytes.len() > 4 && bytes[0] == 0 {
            &bytes[1..]
        } else {
            &bytes[..]
        };
        if significant.len() > 4 {
            tracing::warn!(target: "tdsnmp::ber", { snmp.offset = self.offset(), length = len }, "unsigned integer too long, truncating to 4 bytes");
        }
        Ok(significant
            .iter()
            .take(4)
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }

    /// Read unsigned 64-bit content octets of known length.
    pub fn read_unsigned64_value(&mut self, len: usize) -> Result<u64> {
        if len == 0 {
            return self.fail(self.offset, DecodeErrorKind::ZeroLengthInteger);
        }
        if len > 9 {
            return self.fail(self.offset, DecodeErrorKind::Integer64TooLong { length: len });
        }
        let bytes = self.read_bytes(len)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Read an OCTET STRING.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        let len = self.expect_tag(tag::universal::OCTET_STRING)?;
        self.read_bytes(len)
    }

    /// Read a NULL.
    pub fn read_null(&mut self) -> Result<()> {
        let len = self.expect_tag(tag::universal::NULL)?;
        if len != 0 {
            return self.fail(self.offset, DecodeErrorKind::InvalidNull);
        }
        Ok(())
    }

    /// Read an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<Oid> {
        let len = self.expect_tag(tag::universal::OBJECT_IDENTIFIER)?;
        self.read_oid_value(len)
    }

    /// Read OBJECT IDENTIFIER content octets of known length.
    pub fn read_oid_value(&mut self, len: usize) -> Result<Oid> {
        let at = self.offset();
        let bytes = self.read_bytes(len)?;
        Oid::from_ber(&bytes).map_err(|e| match e {
            Error::Decode { offset, kind } => Error::decode(at + offset, kind),
            other => other,
        })
    }

    /// Read a SEQUENCE, returning a decoder over its contents.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read a constructed value with the given tag, returning a decoder over its contents.
    pub fn read_constructed(&mut self, expected_tag: u8) -> Result<Decoder> {
        let len = self.expect_tag(expected_tag)?;
        self.sub_decoder(len)
    }

    /// Split off the next `len` bytes as their own decoder.
    pub fn sub_decoder(&mut self, len: usize) -> Result<Decoder> {
        let base = self.offset();
        let data = self.read_bytes(len)?;
        Ok(Decoder {
            data,
            offset: 0,
            base,
        })
    }

    /// Skip one complete TLV.
    pub fn skip_tlv(&mut self) -> Result<()> {
        self.read_tag()?;
        let len = self.read_length()?;
        self.read_bytes(len).map(|_| ())
    }

    /// Fail if anything is left unread.
    pub fn expect_end(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            self.fail(self.offset, DecodeErrorKind::TrailingData)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_integer_sign_extension() {
        let cases: [(&[u8], i32); 5] = [
            (&[0x02, 0x01, 0x00], 0),
            (&[0x02, 0x01, 0x7F], 127),
            (&[0x02, 0x02, 0x00, 0x80], 128),
            (&[0x02, 0x01, 0xFF], -1),
            (&[0x02, 0x02, 0xFF, 0x7F], -129),
        ];
        for (bytes, expected) in cases {
            assert_eq!(Decoder::from_slice(bytes).read_integer().unwrap(), expected);
        }
    }

    #[test]
    fn test_decode_integer_truncates_oversized() {
        let mut dec = Decoder::from_slice(&[0x02, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(dec.read_integer().unwrap(), 0x01020304);
        assert!(dec.is_empty());
    }

    #[test]
    fn test_decode_unsigned_with_sign_octet() {
        let mut dec = Decoder::from_slice(&[0x00, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(dec.read_unsigned32_value(5).unwrap(), u32::MAX);
    }

    #[test]
    fn test_nested_offsets() {
        // SEQUENCE { INTEGER 1, <truncated INTEGER> }
        let mut dec = Decoder::from_slice(&[0x30, 0x04, 0x02, 0x01, 0x01, 0x02]);
        let mut seq = dec.read_sequence().unwrap();
        assert_eq!(seq.read_integer().unwrap(), 1);
        match seq.read_integer() {
            Err(Error::Decode { offset, .. }) => assert_eq!(offset, 6),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_tag() {
        let mut dec = Decoder::from_slice(&[0x04, 0x00]);
        assert!(matches!(
            dec.read_integer(),
            Err(Error::Decode {
                offset: 0,
                kind: DecodeErrorKind::UnexpectedTag {
                    expected: 0x02,
                    actual: 0x04
                }
            })
        ));
    }

    #[test]
    fn test_constructed_octet_string_rejected() {
        let mut dec = Decoder::from_slice(&[0x24, 0x00]);
        assert!(matches!(
            dec.read_octet_string(),
            Err(Error::Decode {
                kind: DecodeErrorKind::ConstructedOctetString,
                ..
            })
        ));
    }

    #[test]
    fn test_read_bytes_past_end() {
        let mut dec = Decoder::from_slice(&[0x04, 0x82, 0x01, 0x00, 0xAA]);
        assert!(matches!(
            dec.skip_tlv(),
            Err(Error::Decode {
                kind: DecodeErrorKind::InsufficientData {
                    needed: 256,
                    available: 1
                },
                ..
            })
        ));
    }

    #[test]
    fn test_null_with_content() {
        assert!(Decoder::from_slice(&[0x05, 0x01, 0x00]).read_null().is_err());
        assert!(Decoder::from_slice(&[0x05, 0x00]).read_null().is_ok());
    }
}
