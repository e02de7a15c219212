//! SNMPv3 User-based Security Model (RFC 3414).
//!
//! - USM security parameters encoding/decoding
//! - Password-to-key derivation and key localization
//! - Authentication (HMAC-MD5-96, HMAC-SHA-96, HMAC-SHA-2 per RFC 7860)
//! - Privacy (DES-CBC, AES-128-CFB)
//! - Engine discovery state and report classification

pub mod auth;
mod engine;
mod privacy;
mod usm;

pub use auth::{LocalizedKey, MasterKey};
pub use engine::{
    EngineState, MAX_ENGINE_TIME, ReportKind, TIME_WINDOW, classify_report, report_oids,
};
pub use privacy::{PrivKey, SaltCounter};
pub(crate) use privacy::random_nonzero_u64;
pub use usm::{UsmSecurityParams, find_auth_params_offset};

/// Error returned when a protocol or security level name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProtocolError {
    input: String,
    kind: ProtocolKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProtocolKind {
    Auth,
    Priv,
    Level,
}

impl std::fmt::Display for ParseProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ProtocolKind::Auth => write!(
                f,
                "unknown authentication protocol '{}'; expected one of: DEFAULT, MD5, SHA, SHA-224, SHA-256, SHA-384, SHA-512",
                self.input
            ),
            ProtocolKind::Priv => write!(
                f,
                "unknown privacy protocol '{}'; expected one of: DEFAULT, DES, AES",
                self.input
            ),
            ProtocolKind::Level => write!(
                f,
                "unknown security level '{}'; expected one of: noAuthNoPriv, authNoPriv, authPriv",
                self.input
            ),
        }
    }
}

impl std::error::Error for ParseProtocolError {}

impl From<ParseProtocolError> for crate::error::Error {
    fn from(err: ParseProtocolError) -> Self {
        crate::error::Error::config(err.to_string())
    }
}

fn normalize_name(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// USM security level.
///
/// Ordered from least to most secure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SecurityLevel {
    #[default]
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

impl SecurityLevel {
    pub fn requires_auth(self) -> bool {
        self >= Self::AuthNoPriv
    }

    pub fn requires_priv(self) -> bool {
        self == Self::AuthPriv
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NoAuthNoPriv => "noAuthNoPriv",
            Self::AuthNoPriv => "authNoPriv",
            Self::AuthPriv => "authPriv",
        })
    }
}

/// Accepts the net-snmp names (`noAuthNoPriv`, ...) and the long forms
/// (`no_auth_or_privacy`, `auth_without_privacy`, `auth_with_privacy`).
impl std::str::FromStr for SecurityLevel {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "NOAUTHNOPRIV" | "NOAUTHORPRIVACY" | "1" => Ok(Self::NoAuthNoPriv),
            "AUTHNOPRIV" | "AUTHWITHOUTPRIVACY" | "2" => Ok(Self::AuthNoPriv),
            "AUTHPRIV" | "AUTHWITHPRIVACY" | "3" => Ok(Self::AuthPriv),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: ProtocolKind::Level,
            }),
        }
    }
}

/// Authentication protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthProtocol {
    /// HMAC-MD5-96, also selected by `DEFAULT`.
    #[default]
    Md5,
    /// HMAC-SHA-96
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl std::fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        })
    }
}

impl std::str::FromStr for AuthProtocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "DEFAULT" | "MD5" | "HMACMD5" => Ok(Self::Md5),
            "SHA" | "SHA1" | "HMACSHA" => Ok(Self::Sha1),
            "SHA224" => Ok(Self::Sha224),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: ProtocolKind::Auth,
            }),
        }
    }
}

impl AuthProtocol {
    /// Digest output length, which is also the localized key length.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Truncated MAC length carried in msgAuthenticationParameters.
    pub fn mac_len(self) -> usize {
        match self {
            Self::Md5 | Self::Sha1 => 12,
            Self::Sha224 => 16,
            Self::Sha256 => 24,
            Self::Sha384 => 32,
            Self::Sha512 => 48,
        }
    }
}

/// Privacy protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrivProtocol {
    /// DES-CBC (RFC 3414), also selected by `DEFAULT`.
    #[default]
    Des,
    /// AES-128-CFB (RFC 3826)
    Aes128,
}

impl std::fmt::Display for PrivProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Des => "DES",
            Self::Aes128 => "AES",
        })
    }
}

impl std::str::FromStr for PrivProtocol {
    type Err = ParseProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "DEFAULT" | "DES" | "CBCDES" => Ok(Self::Des),
            "AES" | "AES128" | "CFBAES128" => Ok(Self::Aes128),
            _ => Err(ParseProtocolError {
                input: s.to_string(),
                kind: ProtocolKind::Priv,
            }),
        }
    }
}

impl PrivProtocol {
    /// Bytes of localized key material consumed (DES: 8 key + 8 pre-IV).
    pub fn key_len(self) -> usize {
        16
    }

    /// Length of msgPrivacyParameters.
    pub fn salt_len(self) -> usize {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_protocols() {
        assert_eq!("DEFAULT".parse::<AuthProtocol>().unwrap(), AuthProtocol::Md5);
        assert_eq!("default".parse::<PrivProtocol>().unwrap(), PrivProtocol::Des);
        assert_eq!(AuthProtocol::default(), AuthProtocol::Md5);
        assert_eq!(PrivProtocol::default(), PrivProtocol::Des);
    }

    #[test]
    fn test_auth_protocol_from_str() {
        assert_eq!("sha".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha1);
        assert_eq!("SHA-1".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha1);
        assert_eq!("sha-256".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha256);
        assert_eq!("SHA512".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha512);
        let err = "bogus".parse::<AuthProtocol>().unwrap_err();
        assert!(err.to_string().contains("authentication protocol"));
    }

    #[test]
    fn test_priv_protocol_from_str() {
        assert_eq!("AES-128".parse::<PrivProtocol>().unwrap(), PrivProtocol::Aes128);
        assert_eq!("aes".parse::<PrivProtocol>().unwrap(), PrivProtocol::Aes128);
        assert!("3DES".parse::<PrivProtocol>().is_err());
    }

    #[test]
    fn test_security_level_names() {
        assert_eq!(
            "no_auth_or_privacy".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::NoAuthNoPriv
        );
        assert_eq!(
            "authNoPriv".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::AuthNoPriv
        );
        assert_eq!(
            "AUTH_WITH_PRIVACY".parse::<SecurityLevel>().unwrap(),
            SecurityLevel::AuthPriv
        );
        assert!(SecurityLevel::AuthPriv.requires_auth());
        assert!(!SecurityLevel::AuthNoPriv.requires_priv());
        assert_eq!(SecurityLevel::AuthPriv.to_string(), "authPriv");
    }

    #[test]
    fn test_mac_lengths() {
        assert_eq!(AuthProtocol::Md5.mac_len(), 12);
        assert_eq!(AuthProtocol::Sha256.mac_len(), 24);
        assert_eq!(AuthProtocol::Sha512.digest_len(), 64);
    }
}
