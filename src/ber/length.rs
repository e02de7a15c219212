//! BER length octets (X.690 Section 8.1.3).
//!
//! Short form for 0..=127, long form with up to four length octets otherwise.
//! The indefinite form is rejected, as net-snmp does.

use crate::error::{DecodeErrorKind, Error, Result};

/// Largest content length accepted while decoding (2 MiB).
pub const MAX_LENGTH: usize = 0x20_0000;

/// Encode `len` as BER length octets.
///
/// Returns the octets in REVERSE order (for the prepending encoder) along with
/// how many of them are used.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut out = [0u8; 5];
    if len < 0x80 {
        out[0] = len as u8;
        return (out, 1);
    }

    let mut remaining = len;
    let mut n = 0;
    while remaining > 0 && n < 4 {
        out[n] = (remaining & 0xFF) as u8;
        remaining >>= 8;
        n += 1;
    }
    out[n] = 0x80 | n as u8;
    (out, n + 1)
}

/// Decode length octets at the start of `data`, returning `(length, octets consumed)`.
///
/// `base_offset` is the position of `data` in the enclosing message and is only used
/// to report errors.
pub fn decode_length(data: &[u8], base_offset: usize) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    if first & 0x80 == 0 {
        return Ok((usize::from(first), 1));
    }

    let count = usize::from(first & 0x7F);
    match count {
        0 => return Err(Error::decode(base_offset, DecodeErrorKind::IndefiniteLength)),
        1..=4 => {}
        _ => {
            return Err(Error::decode(
                base_offset,
                DecodeErrorKind::LengthTooLong { octets: count },
            ));
        }
    }

    let octets = data
        .get(1..=count)
        .ok_or_else(|| Error::decode(base_offset, DecodeErrorKind::TruncatedData))?;
    let len = octets
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));

    if len > MAX_LENGTH {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthExceedsMax {
                length: len,
                max: MAX_LENGTH,
            },
        ));
    }

    Ok((len, count + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(len: usize) -> Vec<u8> {
        let (buf, n) = encode_length(len);
        buf[..n].iter().rev().copied().collect()
    }

    #[test]
    fn test_encode_forms() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(127), vec![0x7F]);
        assert_eq!(encoded(128), vec![0x81, 0x80]);
        assert_eq!(encoded(256), vec![0x82, 0x01, 0x00]);
        assert_eq!(encoded(0x01_0000), vec![0x83, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_forms() {
        assert_eq!(decode_length(&[0x05], 0).unwrap(), (5, 1));
        assert_eq!(decode_length(&[0x81, 0xC8], 0).unwrap(), (200, 2));
        assert_eq!(decode_length(&[0x82, 0x01, 0x00], 0).unwrap(), (256, 3));
        // non-minimal long form is legal (X.690 8.1.3.5 note 2)
        assert_eq!(decode_length(&[0x82, 0x00, 0x05], 0).unwrap(), (5, 3));
    }

    #[test]
    fn test_decode_rejects() {
        assert!(matches!(
            decode_length(&[0x80], 7),
            Err(Error::Decode {
                offset: 7,
                kind: DecodeErrorKind::IndefiniteLength
            })
        ));
        assert!(decode_length(&[], 0).is_err());
        assert!(decode_length(&[0x82, 0x01], 0).is_err());
        assert!(decode_length(&[0x85, 1, 1, 1, 1, 1], 0).is_err());
        assert!(matches!(
            decode_length(&[0x84, 0x01, 0x00, 0x00, 0x00], 0),
            Err(Error::Decode {
                kind: DecodeErrorKind::LengthExceedsMax { .. },
                ..
            })
        ));
    }
}
