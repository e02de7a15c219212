//! BER encoding into a reverse buffer.
//!
//! Content is written back-to-front: the body of a TLV first, then its length,
//! then its tag. [`EncodeBuf::finish`] flips the buffer once at the end. Callers
//! encoding a SEQUENCE therefore push its elements in reverse order.

use bytes::Bytes;

use super::length::encode_length;
use super::tag;
use crate::oid::Oid;

/// Buffer for BER encoding that grows towards the front of the message.
pub struct EncodeBuf {
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create an encode buffer sized for a typical SNMP request.
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    /// Create an encode buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Prepend raw bytes, keeping their order in the final output.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev());
    }

    /// Prepend BER length octets.
    pub fn push_length(&mut self, len: usize) {
        let (octets, n) = encode_length(len);
        self.buf.extend_from_slice(&octets[..n]);
    }

    /// Prepend a tag octet.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Prepend a complete primitive TLV.
    pub fn push_tlv(&mut self, tag: u8, content: &[u8]) {
        self.push_bytes(content);
        self.push_length(content.len());
        self.push_tag(tag);
    }

    /// Encode a constructed value: `f` writes the (reversed) contents, then the
    /// length and tag are prepended.
    pub fn push_constructed<F>(&mut self, tag: u8, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let mark = self.len();
        f(self);
        let content_len = self.len() - mark;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Encode a SEQUENCE.
    pub fn push_sequence<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Encode an INTEGER.
    pub fn push_integer(&mut self, value: i32) {
        let bytes = value.to_be_bytes();
        self.push_tlv(tag::universal::INTEGER, minimal_signed(&bytes));
    }

    /// Encode an unsigned 32-bit value under an application tag
    /// (Counter32, Gauge32, TimeTicks).
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        let mut bytes = [0u8; 5];
        bytes[1..].copy_from_slice(&value.to_be_bytes());
        self.push_tlv(tag, minimal_signed(&bytes));
    }

    /// Encode a Counter64.
    pub fn push_counter64(&mut self, value: u64) {
        let mut bytes = [0u8; 9];
        bytes[1..].copy_from_slice(&value.to_be_bytes());
        self.push_tlv(tag::application::COUNTER64, minimal_signed(&bytes));
    }

    /// Encode an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_tlv(tag::universal::OCTET_STRING, data);
    }

    /// Encode a NULL.
    pub fn push_null(&mut self) {
        self.push_tlv(tag::universal::NULL, &[]);
    }

    /// Encode a zero-length value with an arbitrary tag (exception sentinels).
    pub fn push_empty(&mut self, tag: u8) {
        self.push_tlv(tag, &[]);
    }

    /// Encode an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &Oid) {
        let content = oid.to_ber_smallvec();
        self.push_tlv(tag::universal::OBJECT_IDENTIFIER, &content);
    }

    /// Encode an IpAddress.
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_tlv(tag::application::IP_ADDRESS, &addr);
    }

    /// Finish encoding and return the message in wire order.
    pub fn finish(self) -> Bytes {
        Bytes::from(self.finish_vec())
    }

    /// Finish encoding as a `Vec<u8>` (for in-place HMAC patching).
    pub fn finish_vec(mut self) -> Vec<u8> {
        self.buf.reverse();
        self.buf
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip redundant leading octets from a big-endian two's complement integer.
///
/// A leading 0x00 is redundant when the next octet's high bit is clear, a leading
/// 0xFF when it is set.
fn minimal_signed(bytes: &[u8]) -> &[u8] {
    let mut start = 0;
    while start + 1 < bytes.len() {
        let (head, next) = (bytes[start], bytes[start + 1]);
        let redundant = (head == 0x00 && next & 0x80 == 0) || (head == 0xFF && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    &bytes[start..]
}
