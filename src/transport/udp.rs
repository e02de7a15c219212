//! UDP transport.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use super::{Connect, Transport};
use crate::error::{Error, Result};
use crate::session::SessionConfig;
use crate::util::{bind_udp_socket, resolve_target};

/// Largest datagram we accept.
const MAX_DATAGRAM: usize = 65535;

/// UDP socket connected to one agent.
///
/// Cloning shares the socket.
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    socket: UdpSocket,
    target: SocketAddr,
    local_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind `local_port` (0 for ephemeral) and connect to `target`.
    pub async fn bind(target: SocketAddr, local_port: u16) -> Result<Self> {
        let io_err = |e| Error::connection(Some(target.to_string()), e);

        let socket = bind_udp_socket(target, local_port).map_err(io_err)?;
        socket.connect(target).await.map_err(io_err)?;
        let local_addr = socket.local_addr().map_err(io_err)?;

        tracing::debug!(
            target: "tdsnmp::transport",
            { snmp.target = %target, snmp.local_addr = %local_addr },
            "UDP transport connected"
        );

        Ok(Self {
            inner: Arc::new(UdpTransportInner {
                socket,
                target,
                local_addr,
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }
}

impl Connect for UdpTransport {
    async fn connect(config: &SessionConfig) -> Result<Self> {
        let target = resolve_target(config.host(), config.port()).await?;
        Self::bind(target, config.local_port()).await
    }
}

impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        tracing::trace!(
            target: "tdsnmp::transport",
            { snmp.target = %self.inner.target, snmp.bytes = data.len() },
            "UDP send"
        );
        self.inner
            .socket
            .send(data)
            .await
            .map_err(|e| Error::connection(Some(self.inner.target.to_string()), e))?;
        Ok(())
    }

    async fn recv(&self, request_id: i32, recv_timeout: Duration) -> Result<Bytes> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match timeout(recv_timeout, self.inner.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                buf.truncate(len);
                tracing::trace!(
                    target: "tdsnmp::transport",
                    { snmp.target = %self.inner.target, snmp.bytes = len },
                    "UDP recv"
                );
                Ok(Bytes::from(buf))
            }
            Ok(Err(e)) => Err(Error::connection(Some(self.inner.target.to_string()), e)),
            Err(_) => Err(Error::Timeout {
                target: Some(self.inner.target),
                elapsed: recv_timeout,
                request_id,
                retries: 0,
            }),
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.inner.target)
    }

    fn target(&self) -> String {
        self.inner.target.to_string()
    }
}
