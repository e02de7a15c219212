//! Tunnelled transports (`tls://`, `dtls://`, `ssh://`).
//!
//! Handshakes and framing belong to an external [`SecureTransportProvider`].
//! The tunnel is used as a message-oriented duplex channel with the same
//! timeout contract as UDP.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_core::future::BoxFuture;
use tokio::time::timeout;

use super::{Connect, Transport};
use crate::error::{Error, Result};
use crate::session::SessionConfig;

/// Tunnel kind named by the hostname prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelScheme {
    Tls,
    Dtls,
    Ssh,
}

impl TunnelScheme {
    /// Split a scheme prefix off `hostname` (`"dtls://router"`, `"tls:router"`).
    pub fn split(hostname: &str) -> Option<(Self, &str)> {
        // The separator is required so hosts like "sshgw" stay plain UDP.
        [("dtls", Self::Dtls), ("tls", Self::Tls), ("ssh", Self::Ssh)]
            .into_iter()
            .find_map(|(prefix, scheme)| {
                let rest = hostname.strip_prefix(prefix)?;
                let host = rest.strip_prefix("://").or_else(|| rest.strip_prefix(':'))?;
                Some((scheme, host))
            })
    }

    /// Default port (RFC 6353 for TLS/DTLS, RFC 5592 for SSH).
    pub fn default_port(self) -> u16 {
        match self {
            Self::Tls | Self::Dtls => 10161,
            Self::Ssh => 5161,
        }
    }
}

impl fmt::Display for TunnelScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tls => "tls",
            Self::Dtls => "dtls",
            Self::Ssh => "ssh",
        })
    }
}

/// What a provider needs to open a tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelParams {
    pub scheme: TunnelScheme,
    pub host: String,
    pub port: u16,
    /// Local certificate or key identity.
    pub our_identity: String,
    /// Expected peer identity (certificate fingerprint or host key).
    pub their_identity: String,
    /// Hostname to verify the peer certificate against.
    pub their_hostname: String,
    /// Trust anchor for the peer certificate.
    pub trust_cert: String,
}

/// An open tunnel. Each `send` carries one complete SNMP message and each
/// `recv` yields one.
pub trait SecureChannel: Send + Sync {
    fn send<'a>(&'a self, message: &'a [u8]) -> BoxFuture<'a, io::Result<()>>;

    fn recv(&self) -> BoxFuture<'_, io::Result<Bytes>>;

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Opens secure tunnels.
pub trait SecureTransportProvider: Send + Sync + fmt::Debug {
    fn connect<'a>(&'a self, params: &'a TunnelParams) -> BoxFuture<'a, io::Result<Box<dyn SecureChannel>>>;
}

/// Transport over a provider-supplied tunnel.
#[derive(Clone)]
pub struct TunnelTransport {
    channel: Arc<dyn SecureChannel>,
    label: String,
}

impl TunnelTransport {
    /// Open a tunnel through `provider`.
    pub async fn open(provider: &dyn SecureTransportProvider, params: &TunnelParams) -> Result<Self> {
        let label = format!("{}://{}:{}", params.scheme, params.host, params.port);
        tracing::debug!(target: "tdsnmp::transport", { snmp.target = %label }, "opening tunnel");
        let channel = provider
            .connect(params)
            .await
            .map_err(|e| Error::connection(Some(label.clone()), e))?;
        Ok(Self {
            channel: Arc::from(channel),
            label,
        })
    }
}

impl Connect for TunnelTransport {
    async fn connect(config: &SessionConfig) -> Result<Self> {
        let params = config
            .tunnel_params()
            .ok_or_else(|| Error::config("hostname does not name a tls, dtls or ssh tunnel"))?;
        let provider = config.tunnel_provider().ok_or_else(|| {
            Error::config(format!(
                "{} transport requested but no secure transport provider is configured",
                params.scheme
            ))
        })?;
        Self::open(provider.as_ref(), &params).await
    }
}

impl Transport for TunnelTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        tracing::trace!(
            target: "tdsnmp::transport",
            { snmp.target = %self.label, snmp.bytes = data.len() },
            "tunnel send"
        );
        self.channel
            .send(data)
            .await
            .map_err(|e| Error::connection(Some(self.label.clone()), e))
    }

    async fn recv(&self, request_id: i32, recv_timeout: Duration) -> Result<Bytes> {
        match timeout(recv_timeout, self.channel.recv()).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(e)) => Err(Error::connection(Some(self.label.clone()), e)),
            Err(_) => Err(Error::Timeout {
                target: self.channel.peer_addr(),
                elapsed: recv_timeout,
                request_id,
                retries: 0,
            }),
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.channel.peer_addr()
    }

    fn target(&self) -> String {
        self.label.clone()
    }
}
