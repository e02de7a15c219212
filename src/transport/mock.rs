//! Programmable transport for tests.
//!
//! Responses are queued ahead of time or produced by a responder closure that sees
//! each request, which is enough to stand in for a small agent.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;

use super::{Connect, Transport, extract_request_id};
use crate::error::{Error, Result};
use crate::message::{CommunityMessage, Message, MsgFlags, MsgGlobalData, ScopedPdu, V3Message, V3MessageData};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::session::SessionConfig;
use crate::v3::{SecurityLevel, UsmSecurityParams};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;

/// A scripted reply.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Returned with its request id patched to match the last request.
    Data(Bytes),
    /// Returned untouched.
    RawData(Bytes),
    Timeout,
    IoError(String),
}

/// A request seen by the mock.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub data: Bytes,
    pub request_id: Option<i32>,
}

impl RecordedRequest {
    /// Decode the recorded bytes.
    pub fn message(&self) -> Result<Message> {
        Message::decode(self.data.clone())
    }

    /// The PDU of a community or plaintext v3 request.
    pub fn pdu(&self) -> Option<Pdu> {
        match self.message().ok()? {
            Message::Community(msg) => Some(msg.pdu),
            Message::V3(msg) => msg.scoped_pdu().map(|s| s.pdu.clone()),
        }
    }
}

type Responder = Arc<dyn Fn(&Bytes) -> Option<Bytes> + Send + Sync>;

struct MockTransportInner {
    target: SocketAddr,
    responses: VecDeque<MockResponse>,
    requests: Vec<RecordedRequest>,
    responder: Option<Responder>,
}

/// Mock transport; clones share state.
///
/// ```
/// use tdsnmp::transport::{MockTransport, ResponseBuilder};
/// use tdsnmp::{Value, oid};
///
/// let mut mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
/// mock.queue_response(
///     ResponseBuilder::new(1)
///         .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("core-sw1"))
///         .build_v2c(b"public"),
/// );
/// mock.queue_timeout();
/// ```
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

impl MockTransport {
    pub fn new(target: SocketAddr) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockTransportInner {
                target,
                responses: VecDeque::new(),
                requests: Vec::new(),
                responder: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply whose request id is rewritten to match the request.
    pub fn queue_response(&mut self, data: impl Into<Bytes>) {
        self.lock().responses.push_back(MockResponse::Data(data.into()));
    }

    /// Queue a reply returned byte for byte.
    pub fn queue_raw_response(&mut self, data: impl Into<Bytes>) {
        self.lock().responses.push_back(MockResponse::RawData(data.into()));
    }

    pub fn queue_timeout(&mut self) {
        self.lock().responses.push_back(MockResponse::Timeout);
    }

    pub fn queue_io_error(&mut self, msg: impl Into<String>) {
        self.lock().responses.push_back(MockResponse::IoError(msg.into()));
    }

    /// Answer requests with `f` once the queue is empty. `None` means no reply.
    pub fn set_responder<F>(&mut self, f: F)
    where
        F: Fn(&Bytes) -> Option<Bytes> + Send + Sync + 'static,
    {
        self.lock().responder = Some(Arc::new(f));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    pub fn queued_response_count(&self) -> usize {
        self.lock().responses.len()
    }
}

/// Rewrite the correlation id of a community or plaintext v3 message.
fn patch_request_id(data: Bytes, id: i32) -> Bytes {
    match Message::decode(data.clone()) {
        Ok(Message::Community(mut msg)) => {
            msg.pdu.request_id = id;
            msg.encode()
        }
        Ok(Message::V3(mut msg)) if !msg.security_level().requires_auth() => {
            msg.global_data.msg_id = id;
            if let V3MessageData::Plaintext(scoped) = &mut msg.data {
                scoped.pdu.request_id = id;
            }
            msg.encode()
        }
        _ => data,
    }
}

impl Transport for MockTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        let data = Bytes::copy_from_slice(data);
        let request_id = extract_request_id(&data);
        self.lock().requests.push(RecordedRequest { data, request_id });
        Ok(())
    }

    async fn recv(&self, request_id: i32, timeout: Duration) -> Result<Bytes> {
        let (response, target, last, responder) = {
            let mut inner = self.lock();
            let last = inner.requests.last().cloned();
            (inner.responses.pop_front(), inner.target, last, inner.responder.clone())
        };

        let timed_out = || Error::Timeout {
            target: Some(target),
            elapsed: timeout,
            request_id,
            retries: 0,
        };

        match response {
            Some(MockResponse::Data(data)) => {
                let id = last.and_then(|r| r.request_id).unwrap_or(request_id);
                Ok(patch_request_id(data, id))
            }
            Some(MockResponse::RawData(data)) => Ok(data),
            Some(MockResponse::Timeout) => Err(timed_out()),
            Some(MockResponse::IoError(msg)) => Err(Error::connection(
                Some(target.to_string()),
                std::io::Error::other(msg),
            )),
            None => {
                let reply = responder.zip(last).and_then(|(f, req)| f(&req.data));
                reply.ok_or_else(timed_out)
            }
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.lock().target)
    }

    fn target(&self) -> String {
        self.lock().target.to_string()
    }
}

impl Connect for MockTransport {
    async fn connect(_config: &SessionConfig) -> Result<Self> {
        Err(Error::config("mock transports are passed to Session::with_transport"))
    }
}

/// Builds agent replies without hand-written BER.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    pdu: Pdu,
}

impl ResponseBuilder {
    pub fn new(request_id: i32) -> Self {
        Self {
            pdu: Pdu {
                pdu_type: PduType::Response,
                request_id,
                error_status: 0,
                error_index: 0,
                varbinds: Vec::new(),
            },
        }
    }

    /// A Report PDU, as sent for discovery or USM failures.
    pub fn report(request_id: i32) -> Self {
        let mut builder = Self::new(request_id);
        builder.pdu.pdu_type = PduType::Report;
        builder
    }

    pub fn varbind(mut self, oid: Oid, value: Value) -> Self {
        self.pdu.varbinds.push(VarBind::new(oid, value));
        self
    }

    pub fn varbinds(mut self, varbinds: impl IntoIterator<Item = VarBind>) -> Self {
        self.pdu.varbinds.extend(varbinds);
        self
    }

    pub fn error_status(mut self, status: i32) -> Self {
        self.pdu.error_status = status;
        self
    }

    pub fn error_index(mut self, index: i32) -> Self {
        self.pdu.error_index = index;
        self
    }

    pub fn pdu(self) -> Pdu {
        self.pdu
    }

    pub fn build_v1(self, community: &[u8]) -> Bytes {
        CommunityMessage::with_version(Version::V1, community, self.pdu).encode()
    }

    pub fn build_v2c(self, community: &[u8]) -> Bytes {
        CommunityMessage::with_version(Version::V2c, community, self.pdu).encode()
    }

    /// Unauthenticated v3 reply carrying `usm`; msgID follows the PDU request id.
    pub fn build_v3(self, usm: &UsmSecurityParams, engine_id: &[u8]) -> Bytes {
        let global = MsgGlobalData::new(
            self.pdu.request_id,
            crate::message::MAX_MSG_SIZE,
            MsgFlags::new(SecurityLevel::NoAuthNoPriv, false),
        );
        let scoped = ScopedPdu::new(Bytes::copy_from_slice(engine_id), Bytes::new(), self.pdu);
        V3Message::new(global, usm.encode(), scoped).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[tokio::test]
    async fn test_queued_response_is_patched() {
        let mut mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("test"))
                .build_v2c(b"public"),
        );

        let request = CommunityMessage::v2c("public", Pdu::get_request(555, &[oid!(1, 3, 6, 1)]));
        mock.send(&request.encode()).await.unwrap();
        let reply = mock.recv(555, Duration::from_secs(1)).await.unwrap();
        assert_eq!(extract_request_id(&reply), Some(555));
        assert_eq!(mock.requests()[0].request_id, Some(555));
        assert_eq!(mock.queued_response_count(), 0);
    }

    #[tokio::test]
    async fn test_timeouts_and_io_errors() {
        let mut mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        mock.queue_timeout();
        mock.queue_io_error("connection refused");

        let err = mock.recv(3, Duration::from_millis(5)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { request_id: 3, .. }));
        let err = mock.recv(3, Duration::from_millis(5)).await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
        // Empty queue, no responder.
        assert!(mock.recv(3, Duration::from_millis(5)).await.is_err());
    }

    #[tokio::test]
    async fn test_responder_sees_request() {
        let mut mock = MockTransport::new("127.0.0.1:161".parse().unwrap());
        mock.set_responder(|req| {
            let id = extract_request_id(req)?;
            Some(ResponseBuilder::new(id).build_v1(b"public"))
        });
        let request = CommunityMessage::v1("public", Pdu::get_request(9, &[]));
        mock.send(&request.encode()).await.unwrap();
        let reply = mock.recv(9, Duration::from_secs(1)).await.unwrap();
        assert_eq!(extract_request_id(&reply), Some(9));
    }
}
