//! SNMP version enumeration.

use crate::error::{Error, Result};

/// SNMP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Version {
    /// SNMPv1 (RFC 1157)
    V1,
    /// SNMPv2c (RFC 1901)
    V2c,
    /// SNMPv3 (RFC 3411-3418)
    #[default]
    V3,
}

impl Version {
    /// Get the BER-encoded version number.
    pub const fn as_i32(self) -> i32 {
        match self {
            Version::V1 => 0,
            Version::V2c => 1,
            Version::V3 => 3,
        }
    }

    /// Create from BER-encoded version number.
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Version::V1),
            1 => Some(Version::V2c),
            3 => Some(Version::V3),
            _ => None,
        }
    }

    /// Map a user-facing version number (1, 2 or 3) to a version.
    pub fn from_number(number: u8) -> Result<Self> {
        match number {
            1 => Ok(Version::V1),
            2 => Ok(Version::V2c),
            3 => Ok(Version::V3),
            other => Err(Error::UnsupportedVersion {
                version: other,
                reason: "must be one of 1, 2, 3",
            }),
        }
    }

    /// The user-facing version number (1, 2 or 3).
    pub const fn number(self) -> u8 {
        match self {
            Version::V1 => 1,
            Version::V2c => 2,
            Version::V3 => 3,
        }
    }

    /// Whether GETBULK can be carried by this version.
    pub const fn supports_bulk(self) -> bool {
        !matches!(self, Version::V1)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::V1 => write!(f, "SNMPv1"),
            Version::V2c => write!(f, "SNMPv2c"),
            Version::V3 => write!(f, "SNMPv3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_number() {
        assert_eq!(Version::from_number(1).unwrap(), Version::V1);
        assert_eq!(Version::from_number(2).unwrap(), Version::V2c);
        assert_eq!(Version::from_number(3).unwrap(), Version::V3);
        assert!(matches!(
            Version::from_number(4),
            Err(Error::UnsupportedVersion { version: 4, .. })
        ));
        assert!(Version::from_number(0).is_err());
    }

    #[test]
    fn test_wire_numbers() {
        assert_eq!(Version::V2c.as_i32(), 1);
        assert_eq!(Version::from_i32(3), Some(Version::V3));
        assert_eq!(Version::from_i32(2), None);
        assert!(!Version::V1.supports_bulk());
    }
}
