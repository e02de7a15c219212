//! BER (Basic Encoding Rules) codec for SNMP.
//!
//! Encoding writes into a reverse buffer so lengths never need to be known up front.
//! Decoding is zero-copy over [`bytes::Bytes`] and permissive in the same places
//! net-snmp is (non-minimal lengths and integers are accepted).

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::Decoder;
pub use encode::EncodeBuf;
pub use length::{MAX_LENGTH, decode_length, encode_length};
