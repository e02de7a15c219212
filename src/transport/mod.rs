//! Transport layer.
//!
//! A [`Transport`] moves whole SNMP messages to one agent. [`exchange`] layers
//! the per-attempt deadline, retransmission and request-id correlation on top,
//! so every transport shares the same timeout/retry contract.

mod tunnel;
mod udp;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use tunnel::{SecureChannel, SecureTransportProvider, TunnelParams, TunnelScheme, TunnelTransport};
pub use udp::UdpTransport;

#[cfg(any(test, feature = "testing"))]
pub use mock::{MockResponse, MockTransport, RecordedRequest, ResponseBuilder};

use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::ber::{Decoder, tag};
use crate::error::{Error, Result};
use crate::session::SessionConfig;

/// Client-side transport to a single agent.
///
/// `recv` waits at most `timeout` for one inbound message and fails with
/// [`Error::Timeout`] when none arrives. Correlation happens in [`exchange`].
pub trait Transport: Send + Sync {
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    fn recv(&self, request_id: i32, timeout: Duration) -> impl Future<Output = Result<Bytes>> + Send;

    /// Resolved agent address, when the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Human-readable target for logs and errors.
    fn target(&self) -> String;
}

/// Transports a session can open on its own from configuration.
pub trait Connect: Transport + Sized {
    fn connect(config: &SessionConfig) -> impl Future<Output = Result<Self>> + Send;
}

/// Any transport the session layer opens itself.
#[derive(Clone)]
pub enum AnyTransport {
    Udp(UdpTransport),
    Tunnel(TunnelTransport),
}

impl Transport for AnyTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        match self {
            AnyTransport::Udp(t) => t.send(data).await,
            AnyTransport::Tunnel(t) => t.send(data).await,
        }
    }

    async fn recv(&self, request_id: i32, timeout: Duration) -> Result<Bytes> {
        match self {
            AnyTransport::Udp(t) => t.recv(request_id, timeout).await,
            AnyTransport::Tunnel(t) => t.recv(request_id, timeout).await,
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        match self {
            AnyTransport::Udp(t) => t.peer_addr(),
            AnyTransport::Tunnel(t) => t.peer_addr(),
        }
    }

    fn target(&self) -> String {
        match self {
            AnyTransport::Udp(t) => t.target(),
            AnyTransport::Tunnel(t) => t.target(),
        }
    }
}

impl Connect for AnyTransport {
    async fn connect(config: &SessionConfig) -> Result<Self> {
        if config.is_tunneled() {
            Ok(AnyTransport::Tunnel(TunnelTransport::connect(config).await?))
        } else {
            Ok(AnyTransport::Udp(UdpTransport::connect(config).await?))
        }
    }
}

/// Retry budget for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for each attempt.
    pub timeout: Duration,
    /// Retransmissions after the first send.
    pub retries: u32,
}

/// Send a request and wait for the response that carries `request_id`.
///
/// `build` produces the datagram for each attempt (v3 re-stamps engine time per
/// attempt; community messages reuse the same bytes). A response with another
/// request id is a late reply to an earlier request and is dropped. After
/// `retries + 1` transmissions without a match the exchange fails with
/// [`Error::Timeout`].
pub async fn exchange<T, F>(
    transport: &T,
    request_id: i32,
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut build: F,
) -> Result<Bytes>
where
    T: Transport,
    F: FnMut(u32) -> Result<Bytes>,
{
    let start = Instant::now();

    for attempt in 0..=policy.retries {
        if attempt > 0 {
            tracing::debug!(
                target: "tdsnmp::transport",
                { snmp.target = %transport.target(), snmp.request_id = request_id, snmp.attempt = attempt },
                "retransmitting"
            );
        }
        let data = build(attempt)?;
        tracing::trace!(
            target: "tdsnmp::transport",
            { snmp.request_id = request_id, snmp.attempt = attempt, snmp.bytes = data.len() },
            "send"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            sent = transport.send(&data) => sent?,
        }

        let deadline = Instant::now() + policy.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                r = transport.recv(request_id, remaining) => r,
            };
            match received {
                Ok(data) => match extract_request_id(&data) {
                    Some(id) if id == request_id => return Ok(data),
                    other => {
                        tracing::debug!(
                            target: "tdsnmp::transport",
                            { snmp.request_id = request_id, received = ?other },
                            "dropping uncorrelated response"
                        );
                    }
                },
                Err(Error::Timeout { .. }) => break,
                Err(e) => return Err(e),
            }
        }
    }

    tracing::debug!(
        target: "tdsnmp::transport",
        { snmp.target = %transport.target(), snmp.request_id = request_id, retries = policy.retries },
        "request timed out"
    );
    Err(Error::Timeout {
        target: transport.peer_addr(),
        elapsed: start.elapsed(),
        request_id,
        retries: policy.retries,
    })
}

/// Pull the correlation id out of a message without decoding all of it.
///
/// For v1/v2c this is the PDU request-id; for v3 it is msgID, which stays
/// readable when the scoped PDU is encrypted.
pub(crate) fn extract_request_id(data: &[u8]) -> Option<i32> {
    let mut outer = Decoder::from_slice(data).read_sequence().ok()?;
    let version = outer.read_integer().ok()?;
    if version == 3 {
        let mut global = outer.read_sequence().ok()?;
        return global.read_integer().ok();
    }
    outer.read_octet_string().ok()?;
    let pdu_tag = outer.read_tag().ok()?;
    if !tag::is_constructed(pdu_tag) {
        return None;
    }
    outer.read_length().ok()?;
    outer.read_integer().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CommunityMessage, V3Message};
    use crate::oid;
    use crate::pdu::Pdu;

    #[test]
    fn test_extract_request_id() {
        let msg = CommunityMessage::v2c("public", Pdu::get_request(0x1234_5678, &[oid!(1, 3, 6, 1)]));
        assert_eq!(extract_request_id(&msg.encode()), Some(0x1234_5678));

        let v1 = CommunityMessage::v1("x", Pdu::get_next_request(-5, &[]));
        assert_eq!(extract_request_id(&v1.encode()), Some(-5));

        assert_eq!(extract_request_id(&V3Message::discovery_request(77).encode()), Some(77));
        assert_eq!(extract_request_id(&[0x30, 0x00]), None);
        assert_eq!(extract_request_id(b"garbage"), None);
    }

    fn response(id: i32) -> Bytes {
        CommunityMessage::v2c("public", Pdu::get_request(id, &[])).encode()
    }

    #[tokio::test]
    async fn test_exchange_counts_transmissions() {
        let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        let policy = RetryPolicy {
            timeout: Duration::from_millis(10),
            retries: 3,
        };
        let err = exchange(&mock, 9, policy, &CancellationToken::new(), |_| Ok(response(9)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { request_id: 9, retries: 3, .. }));
        assert_eq!(mock.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_exchange_skips_stale_replies() {
        let mut mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        mock.queue_raw_response(response(41));
        mock.queue_raw_response(response(42));
        let policy = RetryPolicy {
            timeout: Duration::from_secs(1),
            retries: 0,
        };
        let data = exchange(&mock, 42, policy, &CancellationToken::new(), |_| Ok(response(42)))
            .await
            .unwrap();
        assert_eq!(extract_request_id(&data), Some(42));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_exchange_cancelled() {
        let mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let policy = RetryPolicy {
            timeout: Duration::from_secs(5),
            retries: 3,
        };
        let err = exchange(&mock, 1, policy, &cancel, |_| Ok(response(1))).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
