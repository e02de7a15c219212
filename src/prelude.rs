//! Common imports.
//!
//! ```rust,no_run
//! use tdsnmp::prelude::*;
//! ```

pub use crate::error::{Error, Result};
pub use crate::normalize::OidSpec;
pub use crate::oid::Oid;
pub use crate::session::{Response, Session, SessionConfig};
pub use crate::v3::{AuthProtocol, PrivProtocol, SecurityLevel};
pub use crate::value::{SnmpType, Value};
pub use crate::variable::SnmpVariable;
pub use crate::version::Version;

#[doc(no_inline)]
pub use crate::oid;
