//! Session configuration.
//!
//! [`SessionConfig`] is immutable once built. The builder takes one setter per
//! connection parameter and validates the combination in [`build`].
//!
//! [`build`]: SessionConfigBuilder::build

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::mib::{MibResolver, StaticMib};
use crate::strings::{HexBytes, from_hex};
use crate::transport::{SecureTransportProvider, TunnelParams, TunnelScheme};
use crate::v3::auth::MIN_PASSWORD_LENGTH;
use crate::v3::{AuthProtocol, PrivProtocol, SecurityLevel};
use crate::variable::DisplayOptions;
use crate::version::Version;

/// Standard SNMP agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Community string for v1/v2c.
#[derive(Clone, PartialEq, Eq)]
pub struct Community(Bytes);

impl Community {
    pub fn new(community: impl AsRef<[u8]>) -> Self {
        Self(Bytes::copy_from_slice(community.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl fmt::Debug for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Community(<redacted>)")
    }
}

/// USM parameters for v3.
#[derive(Clone)]
pub struct UsmConfig {
    pub security_level: SecurityLevel,
    pub username: Bytes,
    pub auth_protocol: AuthProtocol,
    pub(crate) auth_password: Zeroizing<Vec<u8>>,
    pub privacy_protocol: PrivProtocol,
    pub(crate) privacy_password: Zeroizing<Vec<u8>>,
    /// Empty means "use the discovered engine id".
    pub context_engine_id: Bytes,
    /// Non-empty skips discovery.
    pub security_engine_id: Bytes,
    pub context: Bytes,
    pub engine_boots: u32,
    pub engine_time: u32,
}

impl fmt::Debug for UsmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsmConfig")
            .field("security_level", &self.security_level)
            .field("username", &String::from_utf8_lossy(&self.username))
            .field("auth_protocol", &self.auth_protocol)
            .field("privacy_protocol", &self.privacy_protocol)
            .field("context_engine_id", &HexBytes(&self.context_engine_id))
            .field("security_engine_id", &HexBytes(&self.security_engine_id))
            .field("context", &String::from_utf8_lossy(&self.context))
            .field("engine_boots", &self.engine_boots)
            .field("engine_time", &self.engine_time)
            .finish_non_exhaustive()
    }
}

/// Version-specific credentials.
#[derive(Debug, Clone)]
pub enum Credentials {
    V1(Community),
    V2c(Community),
    V3(UsmConfig),
}

impl Credentials {
    pub fn version(&self) -> Version {
        match self {
            Credentials::V1(_) => Version::V1,
            Credentials::V2c(_) => Version::V2c,
            Credentials::V3(_) => Version::V3,
        }
    }
}

/// Identities handed to the secure transport provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelIdentity {
    pub our_identity: String,
    pub their_identity: String,
    pub their_hostname: String,
    pub trust_cert: String,
}

/// Immutable session parameters.
#[derive(Clone)]
pub struct SessionConfig {
    hostname: String,
    remote_port: u16,
    local_port: u16,
    timeout: Duration,
    retries: u32,
    credentials: Credentials,
    tunnel: TunnelIdentity,
    display: DisplayOptions,
    retry_no_such: bool,
    abort_on_nonexistent: bool,
    resolver: Arc<dyn MibResolver>,
    tunnel_provider: Option<Arc<dyn SecureTransportProvider>>,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("hostname", &self.hostname)
            .field("remote_port", &self.remote_port)
            .field("local_port", &self.local_port)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("credentials", &self.credentials)
            .field("display", &self.display)
            .field("retry_no_such", &self.retry_no_such)
            .field("abort_on_nonexistent", &self.abort_on_nonexistent)
            .finish_non_exhaustive()
    }
}

impl SessionConfig {
    /// Start a builder. `hostname` may carry a port (`router:1161`, `[::1]:161`)
    /// and a tunnel prefix (`dtls://router`).
    pub fn builder(hostname: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder::new(hostname)
    }

    /// Hostname as configured, without any port.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Network host: the hostname without tunnel prefix or IPv6 brackets.
    pub fn host(&self) -> &str {
        let host = TunnelScheme::split(&self.hostname).map_or(self.hostname.as_str(), |(_, h)| h);
        host.strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
    }

    /// Configured remote port; 0 means the default.
    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    /// Port actually contacted.
    pub fn port(&self) -> u16 {
        match (self.remote_port, self.tunnel_scheme()) {
            (0, Some(scheme)) => scheme.default_port(),
            (0, None) => DEFAULT_PORT,
            (port, _) => port,
        }
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn version(&self) -> Version {
        self.credentials.version()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn timeout_micros(&self) -> u64 {
        u64::try_from(self.timeout.as_micros()).unwrap_or(u64::MAX)
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn display(&self) -> &DisplayOptions {
        &self.display
    }

    pub fn retry_no_such(&self) -> bool {
        self.retry_no_such
    }

    pub fn abort_on_nonexistent(&self) -> bool {
        self.abort_on_nonexistent
    }

    pub fn resolver(&self) -> &Arc<dyn MibResolver> {
        &self.resolver
    }

    pub fn tunnel_provider(&self) -> Option<&Arc<dyn SecureTransportProvider>> {
        self.tunnel_provider.as_ref()
    }

    /// `hostname:port` when a remote port was set, else the hostname.
    pub fn connect_hostname(&self) -> String {
        if self.remote_port == 0 {
            self.hostname.clone()
        } else {
            format!("{}:{}", self.hostname, self.remote_port)
        }
    }

    pub fn tunnel_scheme(&self) -> Option<TunnelScheme> {
        TunnelScheme::split(&self.hostname).map(|(scheme, _)| scheme)
    }

    /// Whether the hostname names a tls, dtls or ssh tunnel.
    pub fn is_tunneled(&self) -> bool {
        self.tunnel_scheme().is_some()
    }

    /// Parameters for the tunnel provider, when tunnelled.
    pub fn tunnel_params(&self) -> Option<TunnelParams> {
        let scheme = self.tunnel_scheme()?;
        Some(TunnelParams {
            scheme,
            host: self.host().to_owned(),
            port: self.port(),
            our_identity: self.tunnel.our_identity.clone(),
            their_identity: self.tunnel.their_identity.clone(),
            their_hostname: self.tunnel.their_hostname.clone(),
            trust_cert: self.tunnel.trust_cert.clone(),
        })
    }
}

/// Builder for [`SessionConfig`]. Defaults: v3, community `public`, 1 s
/// timeout, 3 retries, noAuthNoPriv as user `initial`.
#[derive(Clone)]
pub struct SessionConfigBuilder {
    hostname: String,
    version: u8,
    community: Bytes,
    timeout: Duration,
    retries: u32,
    remote_port: u16,
    local_port: u16,
    security_level: SecurityLevel,
    security_username: String,
    auth_protocol: AuthProtocol,
    auth_password: Zeroizing<Vec<u8>>,
    privacy_protocol: PrivProtocol,
    privacy_password: Zeroizing<Vec<u8>>,
    context_engine_id: String,
    security_engine_id: String,
    context: String,
    engine_boots: u32,
    engine_time: u32,
    tunnel: TunnelIdentity,
    display: DisplayOptions,
    retry_no_such: bool,
    abort_on_nonexistent: bool,
    resolver: Option<Arc<dyn MibResolver>>,
    tunnel_provider: Option<Arc<dyn SecureTransportProvider>>,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new("localhost")
    }
}

macro_rules! setter {
    ($(#[$meta:meta])* $name:ident: $ty:ty) => {
        $(#[$meta])*
        pub fn $name(mut self, $name: $ty) -> Self {
            self.$name = $name;
            self
        }
    };
}

macro_rules! display_setter {
    ($(#[$meta:meta])* $name:ident: $ty:ty) => {
        $(#[$meta])*
        pub fn $name(mut self, $name: $ty) -> Self {
            self.display.$name = $name;
            self
        }
    };
}

macro_rules! tunnel_setter {
    ($name:ident) => {
        pub fn $name(mut self, $name: impl Into<String>) -> Self {
            self.tunnel.$name = $name.into();
            self
        }
    };
}

impl SessionConfigBuilder {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            version: 3,
            community: Bytes::from_static(b"public"),
            timeout: Duration::from_secs(1),
            retries: 3,
            remote_port: 0,
            local_port: 0,
            security_level: SecurityLevel::NoAuthNoPriv,
            security_username: "initial".to_owned(),
            auth_protocol: AuthProtocol::default(),
            auth_password: Zeroizing::new(Vec::new()),
            privacy_protocol: PrivProtocol::default(),
            privacy_password: Zeroizing::new(Vec::new()),
            context_engine_id: String::new(),
            security_engine_id: String::new(),
            context: String::new(),
            engine_boots: 0,
            engine_time: 0,
            tunnel: TunnelIdentity::default(),
            display: DisplayOptions::default(),
            retry_no_such: false,
            abort_on_nonexistent: false,
            resolver: None,
            tunnel_provider: None,
        }
    }

    setter!(
        /// SNMP version: 1, 2 (v2c) or 3.
        version: u8
    );
    setter!(timeout: Duration);
    setter!(
        /// Retransmissions after the first attempt.
        retries: u32
    );
    setter!(
        /// Agent port; 0 selects the default. Conflicts with a port in the hostname.
        remote_port: u16
    );
    setter!(
        /// Local port to bind; 0 for ephemeral.
        local_port: u16
    );
    setter!(security_level: SecurityLevel);
    setter!(auth_protocol: AuthProtocol);
    setter!(privacy_protocol: PrivProtocol);
    setter!(engine_boots: u32);
    setter!(engine_time: u32);
    setter!(
        /// On v1, report bindings the agent rejects with noSuchName as missing
        /// and resend the rest.
        retry_no_such: bool
    );
    setter!(
        /// Fail operations that return noSuchObject or noSuchInstance.
        abort_on_nonexistent: bool
    );

    display_setter!(use_long_names: bool);
    display_setter!(use_numeric: bool);
    display_setter!(use_sprint_value: bool);
    display_setter!(use_enums: bool);
    display_setter!(
        /// Non-zero enables loose name matching.
        best_guess: u8
    );

    tunnel_setter!(our_identity);
    tunnel_setter!(their_identity);
    tunnel_setter!(their_hostname);
    tunnel_setter!(trust_cert);

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn community(mut self, community: impl AsRef<[u8]>) -> Self {
        self.community = Bytes::copy_from_slice(community.as_ref());
        self
    }

    pub fn security_username(mut self, username: impl Into<String>) -> Self {
        self.security_username = username.into();
        self
    }

    pub fn auth_password(mut self, password: impl AsRef<[u8]>) -> Self {
        self.auth_password = Zeroizing::new(password.as_ref().to_vec());
        self
    }

    pub fn privacy_password(mut self, password: impl AsRef<[u8]>) -> Self {
        self.privacy_password = Zeroizing::new(password.as_ref().to_vec());
        self
    }

    /// Context engine id as hex (`80001f8880...`).
    pub fn context_engine_id(mut self, hex: impl Into<String>) -> Self {
        self.context_engine_id = hex.into();
        self
    }

    /// Authoritative engine id as hex. Setting it skips discovery.
    pub fn security_engine_id(mut self, hex: impl Into<String>) -> Self {
        self.security_engine_id = hex.into();
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn MibResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn tunnel_provider(mut self, provider: Arc<dyn SecureTransportProvider>) -> Self {
        self.tunnel_provider = Some(provider);
        self
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<SessionConfig> {
        let (hostname, remote_port) = split_host_port(&self.hostname, self.remote_port)?;
        let version = Version::from_number(self.version)?;

        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be greater than zero"));
        }

        let credentials = match version {
            Version::V1 => Credentials::V1(Community(self.community.clone())),
            Version::V2c => Credentials::V2c(Community(self.community.clone())),
            Version::V3 => Credentials::V3(self.usm_config()?),
        };

        Ok(SessionConfig {
            hostname,
            remote_port,
            local_port: self.local_port,
            timeout: self.timeout,
            retries: self.retries,
            credentials,
            tunnel: self.tunnel,
            display: self.display,
            retry_no_such: self.retry_no_such,
            abort_on_nonexistent: self.abort_on_nonexistent,
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(StaticMib::standard())),
            tunnel_provider: self.tunnel_provider,
        })
    }

    fn usm_config(&self) -> Result<UsmConfig> {
        let level = self.security_level;
        if level.requires_auth() {
            if self.security_username.is_empty() {
                return Err(Error::config(format!("security level {} requires a username", level)));
            }
            check_password("auth_password", &self.auth_password)?;
        }
        if level.requires_priv() {
            check_password("privacy_password", &self.privacy_password)?;
        }

        Ok(UsmConfig {
            security_level: level,
            username: Bytes::copy_from_slice(self.security_username.as_bytes()),
            auth_protocol: self.auth_protocol,
            auth_password: self.auth_password.clone(),
            privacy_protocol: self.privacy_protocol,
            privacy_password: self.privacy_password.clone(),
            context_engine_id: parse_engine_id("context_engine_id", &self.context_engine_id)?,
            security_engine_id: parse_engine_id("security_engine_id", &self.security_engine_id)?,
            context: Bytes::copy_from_slice(self.context.as_bytes()),
            engine_boots: self.engine_boots,
            engine_time: self.engine_time,
        })
    }
}

fn check_password(field: &str, password: &[u8]) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::config(format!(
            "{} must be at least {} characters",
            field, MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn parse_engine_id(field: &str, text: &str) -> Result<Bytes> {
    let hex = text.trim();
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    from_hex(hex)
        .map(Bytes::from)
        .ok_or_else(|| Error::config(format!("{} is not valid hex: {:?}", field, text)))
}

/// Split `host:port` off a hostname, rejecting a port given twice.
fn split_host_port(hostname: &str, remote_port: u16) -> Result<(String, u16)> {
    let rest = TunnelScheme::split(hostname).map_or(hostname, |(_, host)| host);
    let prefix = &hostname[..hostname.len() - rest.len()];

    let split = if rest.starts_with('[') {
        // [v6]:port
        rest.split_once("]:")
            .map(|(host, port)| (&rest[..host.len() + 1], port))
    } else if rest.matches(':').count() == 1 {
        rest.split_once(':')
    } else {
        // No port, or a bare IPv6 literal.
        None
    };

    let Some((host, port)) = split else {
        return Ok((hostname.to_owned(), remote_port));
    };
    if remote_port != 0 {
        return Err(Error::config(
            "hostname has a port specification yet remote_port is defined",
        ));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| Error::config(format!("invalid port in hostname {:?}", hostname)))?;
    Ok((format!("{}{}", prefix, host), port))
}
