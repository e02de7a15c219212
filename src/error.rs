//! Error types for tdsnmp.
//!
//! All errors are `#[non_exhaustive]` to allow adding new variants without breaking changes.
//! Every failure is reported synchronously to the caller of the operation that triggered it;
//! nothing above the transport's datagram retry is retried automatically.

use std::net::SocketAddr;
use std::time::Duration;

use crate::oid::Oid;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication error kinds (SNMPv3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No authentication key available.
    NoAuthKey,
    /// HMAC verification failed.
    HmacMismatch,
    /// Authentication parameters have the wrong length.
    WrongMacLength { expected: usize, actual: usize },
    /// Could not locate auth params in message.
    AuthParamsNotFound,
    /// Agent rejected the user name.
    UnknownUserName,
    /// Agent rejected the requested security level.
    UnsupportedSecurityLevel,
    /// Agent reported a wrong digest for our request.
    WrongDigest,
    /// Response arrived without the authentication flag we asked for.
    MissingAuthFlag,
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAuthKey => write!(f, "no authentication key available"),
            Self::HmacMismatch => write!(f, "HMAC verification failed"),
            Self::WrongMacLength { expected, actual } => {
                write!(f, "wrong MAC length: expected {}, got {}", expected, actual)
            }
            Self::AuthParamsNotFound => write!(f, "could not locate auth params in message"),
            Self::UnknownUserName => write!(f, "unknown user name"),
            Self::UnsupportedSecurityLevel => write!(f, "unsupported security level"),
            Self::WrongDigest => write!(f, "agent reported wrong digest"),
            Self::MissingAuthFlag => write!(f, "response is not authenticated"),
        }
    }
}

/// Cryptographic error kinds (encryption/decryption).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoErrorKind {
    /// No privacy key available.
    NoPrivKey,
    /// Invalid key length for cipher.
    InvalidKeyLength,
    /// Cipher operation failed.
    CipherError,
    /// Invalid priv params length.
    InvalidPrivParamsLength { expected: usize, actual: usize },
    /// Ciphertext length not a multiple of block size.
    InvalidCiphertextLength { length: usize, block_size: usize },
    /// Agent reported it could not decrypt our request.
    AgentDecryptionError,
}

impl std::fmt::Display for CryptoErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPrivKey => write!(f, "no privacy key available"),
            Self::InvalidKeyLength => write!(f, "invalid key length"),
            Self::CipherError => write!(f, "cipher operation failed"),
            Self::InvalidPrivParamsLength { expected, actual } => write!(
                f,
                "invalid privParameters length: expected {}, got {}",
                expected, actual
            ),
            Self::InvalidCiphertextLength { length, block_size } => write!(
                f,
                "ciphertext length {} not multiple of block size {}",
                length, block_size
            ),
            Self::AgentDecryptionError => write!(f, "agent reported a decryption error"),
        }
    }
}

/// BER decode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Expected different tag.
    UnexpectedTag { expected: u8, actual: u8 },
    /// Data truncated unexpectedly.
    TruncatedData,
    /// Indefinite length not supported.
    IndefiniteLength,
    /// Zero-length integer.
    ZeroLengthInteger,
    /// Invalid OID encoding.
    InvalidOidEncoding,
    /// Unknown SNMP version.
    UnknownVersion(i32),
    /// Unknown PDU type.
    UnknownPduType(u8),
    /// Constructed OCTET STRING not supported.
    ConstructedOctetString,
    /// Invalid msgFlags (priv without auth).
    InvalidMsgFlags,
    /// Unknown security model.
    UnknownSecurityModel(i32),
    /// NULL with non-zero length.
    InvalidNull,
    /// Invalid IP address length.
    InvalidIpAddressLength { length: usize },
    /// Length field too long.
    LengthTooLong { octets: usize },
    /// Length exceeds maximum.
    LengthExceedsMax { length: usize, max: usize },
    /// Integer64 too long.
    Integer64TooLong { length: usize },
    /// Insufficient data for read.
    InsufficientData { needed: usize, available: usize },
    /// Trailing bytes after a complete message.
    TrailingData,
    /// msgID outside 0..2147483647.
    InvalidMsgId(i32),
    /// msgMaxSize below the 484 octet minimum.
    MsgMaxSizeTooSmall(i32),
    /// msgFlags was not exactly one octet.
    InvalidMsgFlagsLength(usize),
    /// USM boots or time was negative.
    NegativeEngineValue(i32),
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag 0x{:02X}, got 0x{:02X}", expected, actual)
            }
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::IndefiniteLength => write!(f, "indefinite length encoding not supported"),
            Self::ZeroLengthInteger => write!(f, "zero-length integer"),
            Self::InvalidOidEncoding => write!(f, "invalid OID encoding"),
            Self::UnknownVersion(v) => write!(f, "unknown SNMP version: {}", v),
            Self::UnknownPduType(t) => write!(f, "unknown PDU type: 0x{:02X}", t),
            Self::ConstructedOctetString => {
                write!(f, "constructed OCTET STRING (0x24) not supported")
            }
            Self::InvalidMsgFlags => write!(f, "invalid msgFlags: privacy without authentication"),
            Self::UnknownSecurityModel(m) => write!(f, "unknown security model: {}", m),
            Self::InvalidNull => write!(f, "NULL with non-zero length"),
            Self::InvalidIpAddressLength { length } => {
                write!(f, "IP address must be 4 bytes, got {}", length)
            }
            Self::LengthTooLong { octets } => {
                write!(f, "length encoding too long ({} octets)", octets)
            }
            Self::LengthExceedsMax { length, max } => {
                write!(f, "length {} exceeds maximum {}", length, max)
            }
            Self::Integer64TooLong { length } => write!(f, "integer64 too long: {} bytes", length),
            Self::InsufficientData { needed, available } => {
                write!(f, "need {} bytes but only {} remaining", needed, available)
            }
            Self::TrailingData => write!(f, "trailing data after message"),
            Self::InvalidMsgId(v) => write!(f, "invalid msgID: {}", v),
            Self::MsgMaxSizeTooSmall(v) => write!(f, "msgMaxSize {} below minimum 484", v),
            Self::InvalidMsgFlagsLength(n) => write!(f, "msgFlags must be 1 octet, got {}", n),
            Self::NegativeEngineValue(v) => write!(f, "negative engine boots/time: {}", v),
        }
    }
}

/// Encode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// Engine not discovered.
    EngineNotDiscovered,
    /// Auth key not available for encoding.
    MissingAuthKey,
    /// Could not locate auth params position in encoded message.
    MissingAuthParams,
    /// Encoded message exceeds the agent's msgMaxSize.
    MessageTooLarge { size: usize, max: u32 },
}

impl std::fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EngineNotDiscovered => write!(f, "engine not discovered"),
            Self::MissingAuthKey => write!(f, "auth key not available for encoding"),
            Self::MissingAuthParams => {
                write!(f, "could not find auth params position in encoded message")
            }
            Self::MessageTooLarge { size, max } => {
                write!(f, "message of {} bytes exceeds agent msgMaxSize {}", size, max)
            }
        }
    }
}

/// OID validation error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidErrorKind {
    /// Invalid arc value.
    InvalidArc,
    /// First arc must be 0, 1, or 2.
    InvalidFirstArc(u32),
    /// Second arc too large for first arc value.
    InvalidSecondArc { first: u32, second: u32 },
    /// OID has too many arcs (exceeds MAX_OID_LEN).
    TooManyArcs { count: usize, max: usize },
}

impl std::fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArc => write!(f, "invalid arc value"),
            Self::InvalidFirstArc(v) => write!(f, "first arc must be 0, 1, or 2, got {}", v),
            Self::InvalidSecondArc { first, second } => {
                write!(f, "second arc {} too large for first arc {}", second, first)
            }
            Self::TooManyArcs { count, max } => {
                write!(f, "OID has {} arcs, exceeds maximum {}", count, max)
            }
        }
    }
}

/// SNMP error status codes (RFC 3416).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// Unknown/future error status code.
    Unknown(i32),
}

const STATUS_NAMES: [(ErrorStatus, &str); 19] = [
    (ErrorStatus::NoError, "noError"),
    (ErrorStatus::TooBig, "tooBig"),
    (ErrorStatus::NoSuchName, "noSuchName"),
    (ErrorStatus::BadValue, "badValue"),
    (ErrorStatus::ReadOnly, "readOnly"),
    (ErrorStatus::GenErr, "genErr"),
    (ErrorStatus::NoAccess, "noAccess"),
    (ErrorStatus::WrongType, "wrongType"),
    (ErrorStatus::WrongLength, "wrongLength"),
    (ErrorStatus::WrongEncoding, "wrongEncoding"),
    (ErrorStatus::WrongValue, "wrongValue"),
    (ErrorStatus::NoCreation, "noCreation"),
    (ErrorStatus::InconsistentValue, "inconsistentValue"),
    (ErrorStatus::ResourceUnavailable, "resourceUnavailable"),
    (ErrorStatus::CommitFailed, "commitFailed"),
    (ErrorStatus::UndoFailed, "undoFailed"),
    (ErrorStatus::AuthorizationError, "authorizationError"),
    (ErrorStatus::NotWritable, "notWritable"),
    (ErrorStatus::InconsistentName, "inconsistentName"),
];

impl ErrorStatus {
    /// Create from raw status code.
    pub fn from_i32(value: i32) -> Self {
        usize::try_from(value)
            .ok()
            .and_then(|idx| STATUS_NAMES.get(idx))
            .map(|(status, _)| *status)
            .unwrap_or(Self::Unknown(value))
    }

    /// Convert to raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Unknown(code) => *code,
            known => STATUS_NAMES
                .iter()
                .position(|(status, _)| status == known)
                .map(|idx| idx as i32)
                .unwrap_or(-1),
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({})", code),
            known => match STATUS_NAMES.iter().find(|(status, _)| status == known) {
                Some((_, name)) => f.write_str(name),
                None => write!(f, "{:?}", known),
            },
        }
    }
}

/// Library error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Contradictory or incomplete session parameters.
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// Version outside {1, 2, 3}, or an operation the version cannot carry.
    #[error("unsupported SNMP version {version}: {reason}")]
    UnsupportedVersion { version: u8, reason: &'static str },

    /// Transport-level failure establishing or using the channel.
    #[error("connection error{}: {source}", target.as_ref().map(|t| format!(" communicating with {}", t)).unwrap_or_default())]
    Connection {
        target: Option<String>,
        #[source]
        source: std::io::Error,
    },

    /// No correlated response within the retry budget.
    #[error("timeout after {elapsed:?}{} (request_id={request_id}, retries={retries})", target.map(|t| format!(" waiting for {}", t)).unwrap_or_default())]
    Timeout {
        target: Option<SocketAddr>,
        elapsed: Duration,
        request_id: i32,
        retries: u32,
    },

    /// The agent returned the noSuchObject sentinel and strict mode was requested.
    #[error("no such object: {oid}")]
    NoSuchObject { oid: String },

    /// The agent returned the noSuchInstance sentinel and strict mode was requested.
    #[error("no such instance: {oid}")]
    NoSuchInstance { oid: String },

    /// A symbolic OID could not be resolved against the name service.
    #[error("unknown object identifier: {name}")]
    UnknownObjectId { name: String },

    /// SET on a numeric OID without an explicit type and no MIB syntax hint.
    #[error("cannot determine type for {oid}; supply an explicit type")]
    UndeterminedType { oid: String },

    /// SET value could not be converted to its declared type.
    #[error("invalid value {value:?} for type {snmp_type}")]
    InvalidValue {
        value: String,
        snmp_type: crate::value::SnmpType,
    },

    /// SNMP protocol error returned by agent.
    #[error("SNMP error: {status} at index {index}{}", oid.as_ref().map(|o| format!(" ({})", o)).unwrap_or_default())]
    Snmp {
        status: ErrorStatus,
        index: u32,
        oid: Option<Oid>,
    },

    /// Invalid OID format.
    #[error("invalid OID: {kind}{}", input.as_ref().map(|i| format!(" ({:?})", i)).unwrap_or_default())]
    InvalidOid {
        kind: OidErrorKind,
        input: Option<Box<str>>,
    },

    /// BER decoding error.
    #[error("decode error at offset {offset}: {kind}")]
    Decode {
        offset: usize,
        kind: DecodeErrorKind,
    },

    /// BER encoding error.
    #[error("encode error: {kind}")]
    Encode { kind: EncodeErrorKind },

    /// Authentication failed (SNMPv3).
    #[error("authentication failed: {kind}")]
    Authentication { kind: AuthErrorKind },

    /// Decryption failed (SNMPv3).
    #[error("decryption failed: {kind}")]
    Decryption { kind: CryptoErrorKind },

    /// Encryption failed (SNMPv3).
    #[error("encryption failed: {kind}")]
    Encryption { kind: CryptoErrorKind },

    /// Response request ID doesn't match.
    #[error("request ID mismatch: expected {expected}, got {actual}")]
    RequestIdMismatch { expected: i32, actual: i32 },

    /// Response version doesn't match the session.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        expected: crate::version::Version,
        actual: crate::version::Version,
    },

    /// Unknown engine ID (SNMPv3).
    #[error("unknown engine ID")]
    UnknownEngineId,

    /// Message outside time window (SNMPv3).
    #[error("message not in time window")]
    NotInTimeWindow,

    /// Walk received an OID that does not advance past the previous one.
    ///
    /// Continuing would loop forever against a non-conformant agent.
    #[error("walk detected non-increasing OID: {previous} >= {current}")]
    NonIncreasingOid { previous: Oid, current: Oid },

    /// The caller cancelled the in-flight exchange.
    #[error("request cancelled")]
    Cancelled,

    /// The session was closed.
    #[error("session is closed")]
    SessionClosed,
}

impl Error {
    /// Create a decode error.
    pub fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Create an encode error.
    pub fn encode(kind: EncodeErrorKind) -> Self {
        Self::Encode { kind }
    }

    /// Create an authentication error.
    pub fn auth(kind: AuthErrorKind) -> Self {
        Self::Authentication { kind }
    }

    /// Create a decryption error.
    pub fn decrypt(kind: CryptoErrorKind) -> Self {
        Self::Decryption { kind }
    }

    /// Create an encryption error.
    pub fn encrypt(kind: CryptoErrorKind) -> Self {
        Self::Encryption { kind }
    }

    /// Create an invalid OID error from a kind (no input string).
    pub fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind, input: None }
    }

    /// Create an invalid OID error with the input string that failed.
    pub fn invalid_oid_with_input(kind: OidErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidOid {
            kind,
            input: Some(input.into()),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ImproperlyConfigured(msg.into())
    }

    /// Create a connection error from an I/O failure.
    pub fn connection(target: Option<String>, source: std::io::Error) -> Self {
        Self::Connection { target, source }
    }

    /// Whether the agent reported the requested object as absent.
    pub fn is_nonexistent(&self) -> bool {
        matches!(
            self,
            Self::NoSuchObject { .. }
                | Self::NoSuchInstance { .. }
                | Self::Snmp {
                    status: ErrorStatus::NoSuchName,
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        for code in 0..=18 {
            assert_eq!(ErrorStatus::from_i32(code).as_i32(), code);
        }
        assert_eq!(ErrorStatus::from_i32(2), ErrorStatus::NoSuchName);
        assert_eq!(ErrorStatus::from_i32(42), ErrorStatus::Unknown(42));
        assert_eq!(ErrorStatus::from_i32(-3), ErrorStatus::Unknown(-3));
    }

    #[test]
    fn test_error_status_display() {
        assert_eq!(ErrorStatus::NoSuchName.to_string(), "noSuchName");
        assert_eq!(ErrorStatus::InconsistentName.to_string(), "inconsistentName");
        assert_eq!(ErrorStatus::Unknown(99).to_string(), "unknown(99)");
    }

    #[test]
    fn test_is_nonexistent() {
        assert!(Error::NoSuchObject { oid: "x".into() }.is_nonexistent());
        assert!(
            Error::Snmp {
                status: ErrorStatus::NoSuchName,
                index: 1,
                oid: None
            }
            .is_nonexistent()
        );
        assert!(!Error::Cancelled.is_nonexistent());
    }
}
