// The Error enum carries OIDs inline for diagnostics.
#![allow(clippy::result_large_err)]

//! # tdsnmp
//!
//! Async SNMP v1/v2c/v3 sessions with GET, GETNEXT, GETBULK, SET and subtree
//! walks.
//!
//! - BER encoding and decoding of v1/v2c community and v3 USM messages
//! - USM authentication (HMAC-MD5/SHA) and privacy (DES-CBC, AES-128-CFB)
//! - UDP transport, or a caller-supplied secure channel for `tls://`,
//!   `dtls://` and `ssh://` hostnames
//! - Symbolic names through a pluggable [`MibResolver`]
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tdsnmp::{Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> tdsnmp::Result<()> {
//!     let config = SessionConfig::builder("192.0.2.1")
//!         .version(2)
//!         .community("public")
//!         .build()?;
//!     let session = Session::new(config);
//!
//!     for var in session.bulkwalk(["system"], 0, 15).await? {
//!         println!("{var}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## SNMPv3
//!
//! ```rust,no_run
//! use tdsnmp::v3::{AuthProtocol, PrivProtocol, SecurityLevel};
//! use tdsnmp::{SessionConfig, snmp_get};
//!
//! # async fn example() -> tdsnmp::Result<()> {
//! let config = SessionConfig::builder("192.0.2.1")
//!     .security_level(SecurityLevel::AuthPriv)
//!     .security_username("admin")
//!     .auth_protocol(AuthProtocol::Sha1)
//!     .auth_password("authpass123")
//!     .privacy_protocol(PrivProtocol::Aes128)
//!     .privacy_password("privpass123")
//!     .build()?;
//! let uptime = snmp_get(config, [("sysUpTime", "0")]).await?;
//! # let _ = uptime;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod ber;
pub mod error;
pub mod message;
pub mod mib;
pub mod normalize;
pub mod oid;
pub mod pdu;
pub mod prelude;
pub mod session;
pub mod strings;
pub mod transport;
pub mod v3;
pub mod validate;
pub mod value;
pub mod varbind;
pub mod variable;
pub mod version;

pub(crate) mod util;

#[cfg(feature = "cli")]
pub mod cli;

pub use api::{
    snmp_bulkwalk, snmp_get, snmp_get_bulk, snmp_get_next, snmp_set, snmp_set_multiple, snmp_walk,
};
pub use error::{
    AuthErrorKind, CryptoErrorKind, DecodeErrorKind, EncodeErrorKind, Error, ErrorStatus,
    OidErrorKind, Result,
};
pub use mib::{MibNode, MibResolver, StaticMib};
pub use normalize::{OidSpec, build_interface_vars, normalize};
pub use oid::Oid;
pub use pdu::{Pdu, PduType};
pub use session::{
    BulkWalk, Credentials, Response, Session, SessionConfig, SessionConfigBuilder, SetRequest,
    Walk,
};
pub use strings::{strip_non_printable, to_text};
pub use transport::{
    AnyTransport, SecureChannel, SecureTransportProvider, Transport, TunnelParams, TunnelScheme,
    UdpTransport,
};
pub use v3::{AuthProtocol, PrivProtocol, SecurityLevel};
pub use validate::validate;
pub use value::{SnmpType, Value};
pub use varbind::VarBind;
pub use variable::{DisplayOptions, SnmpVariable};
pub use version::Version;
