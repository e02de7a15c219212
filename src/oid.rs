//! Numeric object identifiers.
//!
//! An [`Oid`] is the resolved, wire-level form of an object identifier: a sequence of
//! non-negative arcs. Ordering is lexicographic over the arcs, which is exactly SNMP's
//! subtree ordering (a parent sorts before all of its descendants).
//!
//! Symbolic names (`sysDescr.0`) live one level up, in [`crate::normalize`] and
//! [`crate::mib`]; this module only deals in numbers.

use std::fmt;

use smallvec::SmallVec;

use crate::error::{DecodeErrorKind, Error, OidErrorKind, Result};

/// Maximum number of arcs allowed in an OID (RFC 2578 Section 3.5).
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
///
/// Arcs live inline for OIDs of up to 16 arcs, which covers nearly everything a
/// walk produces.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create an OID from arc values.
    ///
    /// ```
    /// use tdsnmp::Oid;
    ///
    /// let oid = Oid::new([1, 3, 6, 1]);
    /// assert_eq!(oid.len(), 4);
    /// ```
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse dotted numeric notation. A leading dot is accepted (`.1.3.6.1`).
    ///
    /// Arc constraints are not checked here; see [`validate`](Self::validate).
    ///
    /// ```
    /// use tdsnmp::Oid;
    ///
    /// let oid = Oid::parse(".1.3.6.1.2.1.1.1.0").unwrap();
    /// assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.1.0");
    /// assert!(Oid::parse("1.3.x").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let body = s.strip_prefix('.').unwrap_or(s);
        if body.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();
        for part in body.split('.') {
            let arc = part
                .parse::<u32>()
                .map_err(|_| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;
            arcs.push(arc);
        }
        Ok(Self { arcs })
    }

    /// Whether `s` is dotted numeric notation (optionally with a leading dot).
    pub fn is_numeric_str(s: &str) -> bool {
        let body = s.strip_prefix('.').unwrap_or(s);
        !body.is_empty()
            && body
                .split('.')
                .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Whether `self` lies in the subtree rooted at `root` (or is `root` itself).
    pub fn starts_with(&self, root: &Oid) -> bool {
        self.arcs.len() >= root.arcs.len() && self.arcs[..root.arcs.len()] == root.arcs[..]
    }

    /// All arcs except the last; `None` for the empty OID.
    pub fn parent(&self) -> Option<Oid> {
        let (_, head) = self.arcs.split_last()?;
        Some(Oid::from_slice(head))
    }

    /// Append one arc.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Append several arcs.
    pub fn extend_from(&self, suffix: &[u32]) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.extend_from_slice(suffix);
        Oid { arcs }
    }

    /// The arcs following `root`, when `self` is inside that subtree.
    pub fn suffix_after(&self, root: &Oid) -> Option<&[u32]> {
        self.starts_with(root).then(|| &self.arcs[root.len()..])
    }

    /// Dotted form with a leading dot, as net-snmp prints numeric OIDs.
    pub fn to_dotted(&self) -> String {
        let mut out = String::with_capacity(self.arcs.len() * 3);
        for arc in &self.arcs {
            out.push('.');
            out.push_str(&arc.to_string());
        }
        out
    }

    /// Validate arcs per X.690 Section 8.19.4.
    pub fn validate(&self) -> Result<()> {
        let Some(&first) = self.arcs.first() else {
            return Ok(());
        };
        if first > 2 {
            return Err(Error::invalid_oid(OidErrorKind::InvalidFirstArc(first)));
        }
        if let Some(&second) = self.arcs.get(1)
            && first < 2
            && second >= 40
        {
            return Err(Error::invalid_oid(OidErrorKind::InvalidSecondArc {
                first,
                second,
            }));
        }
        if self.arcs.len() > MAX_OID_LEN {
            return Err(Error::invalid_oid(OidErrorKind::TooManyArcs {
                count: self.arcs.len(),
                max: MAX_OID_LEN,
            }));
        }
        Ok(())
    }

    /// BER content octets (X.690 Section 8.19).
    ///
    /// The first two arcs share one subidentifier (`arc1 * 40 + arc2`); every
    /// subidentifier is base-128 with the high bit marking continuation.
    pub fn to_ber_smallvec(&self) -> SmallVec<[u8; 64]> {
        let mut out = SmallVec::new();
        match self.arcs.as_slice() {
            [] => {}
            [only] => push_subidentifier(&mut out, only.saturating_mul(40)),
            [first, second, rest @ ..] => {
                push_subidentifier(&mut out, first.saturating_mul(40).saturating_add(*second));
                for &arc in rest {
                    push_subidentifier(&mut out, arc);
                }
            }
        }
        out
    }

    /// Decode BER content octets, enforcing [`MAX_OID_LEN`].
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        let mut arcs: SmallVec<[u32; 16]> = SmallVec::new();
        let mut pos = 0;

        while pos < data.len() {
            let (subid, used) = read_subidentifier(&data[pos..], pos)?;
            if arcs.is_empty() {
                let first = (subid / 40).min(2);
                arcs.push(first);
                arcs.push(subid - first * 40);
            } else {
                arcs.push(subid);
            }
            pos += used;

            if arcs.len() > MAX_OID_LEN {
                return Err(Error::invalid_oid(OidErrorKind::TooManyArcs {
                    count: arcs.len(),
                    max: MAX_OID_LEN,
                }));
            }
        }

        Ok(Self { arcs })
    }
}

fn push_subidentifier(out: &mut SmallVec<[u8; 64]>, value: u32) {
    let mut groups = [0u8; 5];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v & 0x7F) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

fn read_subidentifier(data: &[u8], base: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    for (i, &byte) in data.iter().enumerate() {
        // 0x80 as a leading octet is a non-minimal encoding (X.690 8.19.2)
        if i == 0 && byte == 0x80 {
            return Err(Error::decode(base, DecodeErrorKind::InvalidOidEncoding));
        }
        if value > (u32::MAX >> 7) {
            return Err(Error::decode(base + i, DecodeErrorKind::InvalidOidEncoding));
        }
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(Error::decode(base + data.len(), DecodeErrorKind::TruncatedData))
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::new(arcs)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arcs.cmp(&other.arcs)
    }
}

/// Build an [`Oid`] from literal arcs.
///
/// ```
/// use tdsnmp::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert_eq!(sys_descr.len(), 9);
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}
