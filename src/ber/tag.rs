//! BER tag octets used by SNMP.
//!
//! Bits 7-6 carry the class, bit 5 the constructed flag, bits 4-0 the number.

/// Constructed bit.
pub const CONSTRUCTED: u8 = 0x20;

/// Context-specific class bits.
pub const CONTEXT_SPECIFIC: u8 = 0x80;

/// Universal types.
pub mod universal {
    pub const INTEGER: u8 = 0x02;
    pub const OCTET_STRING: u8 = 0x04;
    /// Constructed OCTET STRING; never valid in SNMP.
    pub const OCTET_STRING_CONSTRUCTED: u8 = 0x24;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const SEQUENCE: u8 = 0x30;
}

/// SNMP application types (RFC 2578).
pub mod application {
    pub const IP_ADDRESS: u8 = 0x40;
    pub const COUNTER32: u8 = 0x41;
    /// Also Unsigned32.
    pub const GAUGE32: u8 = 0x42;
    pub const TIMETICKS: u8 = 0x43;
    pub const OPAQUE: u8 = 0x44;
    pub const COUNTER64: u8 = 0x46;
}

/// Exception sentinels carried in place of a value (RFC 3416).
pub mod context {
    pub const NO_SUCH_OBJECT: u8 = 0x80;
    pub const NO_SUCH_INSTANCE: u8 = 0x81;
    pub const END_OF_MIB_VIEW: u8 = 0x82;
}

/// PDU tags (context-specific, constructed).
pub mod pdu {
    use super::{CONSTRUCTED, CONTEXT_SPECIFIC};

    pub const GET_REQUEST: u8 = CONTEXT_SPECIFIC | CONSTRUCTED;
    pub const GET_NEXT_REQUEST: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x01;
    pub const RESPONSE: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x02;
    pub const SET_REQUEST: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x03;
    pub const GET_BULK_REQUEST: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x05;
    pub const REPORT: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x08;
}

/// Whether a tag has the constructed bit set.
#[inline]
pub const fn is_constructed(tag: u8) -> bool {
    tag & CONSTRUCTED != 0
}
