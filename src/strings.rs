//! Text helpers for rendering agent data.
//!
//! Agents return OCTET STRINGs with no declared character set. These helpers decide how
//! such bytes become displayable text.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

/// Marker appended when non-printable characters were removed.
pub const BINARY_MARKER: &str = "(contains binary)";

/// Whether `c` is in the printable set: ASCII letters, digits, punctuation and
/// whitespace (space, `\t`, `\n`, `\r`, vertical tab, form feed).
pub fn is_printable(c: char) -> bool {
    c.is_ascii_graphic() || matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Remove non-printable characters, flagging the result when anything was removed.
///
/// Idempotent: the marker itself is printable.
///
/// ```
/// use tdsnmp::strings::strip_non_printable;
///
/// assert_eq!(strip_non_printable("eth0"), "eth0");
/// assert_eq!(strip_non_printable("ab\u{1}c"), "abc (contains binary)");
/// assert_eq!(strip_non_printable("\u{0}\u{ff}"), "(contains binary)");
/// ```
pub fn strip_non_printable(value: &str) -> Cow<'_, str> {
    if value.chars().all(is_printable) {
        return Cow::Borrowed(value);
    }
    let mut out: String = value.chars().filter(|&c| is_printable(c)).collect();
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(BINARY_MARKER);
    Cow::Owned(out)
}

/// Decode bytes as ISO-8859-1; every byte maps to the code point of the same value.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Conversion to optional text: `None` stays `None`, strings pass through, numbers are
/// formatted, byte strings are decoded as ISO-8859-1.
pub trait ToText {
    fn to_text(&self) -> Option<String>;
}

impl ToText for str {
    fn to_text(&self) -> Option<String> {
        Some(self.to_owned())
    }
}

impl ToText for String {
    fn to_text(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl ToText for [u8] {
    fn to_text(&self) -> Option<String> {
        Some(latin1(self))
    }
}

impl ToText for Vec<u8> {
    fn to_text(&self) -> Option<String> {
        Some(latin1(self))
    }
}

impl ToText for Bytes {
    fn to_text(&self) -> Option<String> {
        Some(latin1(self))
    }
}

macro_rules! number_to_text {
    ($($t:ty),*) => {
        $(impl ToText for $t {
            fn to_text(&self) -> Option<String> {
                Some(self.to_string())
            }
        })*
    };
}

number_to_text!(i32, i64, u32, u64, usize, f64);

impl<T: ToText + ?Sized> ToText for &T {
    fn to_text(&self) -> Option<String> {
        (**self).to_text()
    }
}

impl<T: ToText> ToText for Option<T> {
    fn to_text(&self) -> Option<String> {
        self.as_ref().and_then(ToText::to_text)
    }
}

/// Free-function form of [`ToText::to_text`].
pub fn to_text<T: ToText + ?Sized>(value: &T) -> Option<String> {
    value.to_text()
}

/// Encode bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    HexBytes(bytes).to_string()
}

/// Decode hex text, ignoring whitespace between digit pairs.
///
/// Returns `None` on odd digit counts or non-hex characters.
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = char::from(pair[0]).to_digit(16)?;
            let lo = char::from(pair[1]).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

/// Lazy hex formatter for logging byte buffers.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_keeps_whitespace() {
        assert_eq!(strip_non_printable("a b\tc\n"), "a b\tc\n");
        assert!(matches!(strip_non_printable("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_marks_binary() {
        assert_eq!(strip_non_printable("up\u{7}"), "up (contains binary)");
        assert_eq!(strip_non_printable("\u{80}"), "(contains binary)");
        assert_eq!(strip_non_printable(""), "");
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(&None::<String>), None);
        assert_eq!(to_text("abc"), Some("abc".into()));
        assert_eq!(to_text(&42i32), Some("42".into()));
        assert_eq!(to_text(&1.5f64), Some("1.5".into()));
        assert_eq!(to_text(&[0x41u8, 0xE9][..]), Some("A\u{e9}".into()));
    }

    #[test]
    fn test_hex() {
        assert_eq!(to_hex(&[0xde, 0xad, 0x00]), "dead00");
        assert_eq!(from_hex("DE AD 00"), Some(vec![0xde, 0xad, 0x00]));
        assert_eq!(from_hex("abc"), None);
        assert_eq!(from_hex("zz"), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn strip_is_idempotent(s in any::<String>()) {
                let once = strip_non_printable(&s).into_owned();
                prop_assert_eq!(strip_non_printable(&once), once.as_str());
                prop_assert!(once.chars().all(is_printable));
            }

            #[test]
            fn latin1_keeps_byte_count(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
                prop_assert_eq!(latin1(&bytes).chars().count(), bytes.len());
            }
        }
    }
}
