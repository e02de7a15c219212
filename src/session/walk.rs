//! Walk streams.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use super::Session;
use crate::error::{Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::transport::Connect;
use crate::varbind::VarBind;

type Pending<R> = Pin<Box<dyn Future<Output = Result<R>> + Send>>;

/// Outcome of checking one binding against the walk so far.
enum Step {
    Yield(VarBind),
    End,
    Stalled(Error),
}

/// Subtree and ordering checks shared by both walks.
struct Cursor {
    root: Oid,
    /// The root, then the last OID handed to the caller. Every binding must
    /// move past it or the walk would loop forever.
    current: Oid,
}

impl Cursor {
    fn new(root: Oid) -> Self {
        Self {
            current: root.clone(),
            root,
        }
    }

    fn step(&mut self, vb: VarBind) -> Step {
        if !vb.continues_walk(&self.root) {
            tracing::debug!(
                target: "tdsnmp::walk",
                { snmp.oid = %vb.oid, root = %self.root, value = %vb.value },
                "walk finished"
            );
            return Step::End;
        }
        if vb.oid <= self.current {
            tracing::warn!(
                target: "tdsnmp::walk",
                { previous = %self.current, current = %vb.oid },
                "agent returned non-increasing OID"
            );
            return Step::Stalled(Error::NonIncreasingOid {
                previous: self.current.clone(),
                current: vb.oid,
            });
        }
        self.current = vb.oid.clone();
        Step::Yield(vb)
    }
}

/// Stream walking a subtree with GETNEXT.
///
/// Created by [`Session::walk_stream`]. Ends at the first binding outside the
/// root, at an exception value, or (v1) when the agent answers noSuchName.
pub struct Walk<T> {
    session: Session<T>,
    cursor: Cursor,
    done: bool,
    pending: Option<Pending<Pdu>>,
}

impl<T: Connect + 'static> Walk<T> {
    pub(crate) fn new(session: Session<T>, root: Oid) -> Self {
        Self {
            session,
            cursor: Cursor::new(root),
            done: false,
            pending: None,
        }
    }

    /// Drain the walk. Any error discards what was collected.
    pub async fn collect(mut self) -> Result<Vec<VarBind>> {
        let mut out = Vec::new();
        while let Some(item) = std::future::poll_fn(|cx| Pin::new(&mut self).poll_next(cx)).await {
            out.push(item?);
        }
        Ok(out)
    }

    fn finish(&mut self, response: Result<Pdu>) -> Option<Result<VarBind>> {
        let pdu = match response {
            Ok(pdu) => pdu,
            Err(e) => return Some(Err(e)),
        };
        if pdu.error_status_enum() == ErrorStatus::NoSuchName {
            tracing::debug!(target: "tdsnmp::walk", { root = %self.cursor.root }, "noSuchName ends walk");
            return None;
        }
        if let Err(e) = pdu.check_error() {
            return Some(Err(e));
        }
        let vb = pdu.varbinds.into_iter().next()?;
        match self.cursor.step(vb) {
            Step::Yield(vb) => {
                self.done = false;
                Some(Ok(vb))
            }
            Step::End => None,
            Step::Stalled(e) => Some(Err(e)),
        }
    }
}

impl<T: Connect + 'static> Stream for Walk<T> {
    type Item = Result<VarBind>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        let this = &mut *self;
        let pending = this.pending.get_or_insert_with(|| {
            let session = this.session.clone();
            let oid = this.cursor.current.clone();
            Box::pin(async move { session.next_varbind(&oid).await })
        });

        match pending.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(response) => {
                this.pending = None;
                // Anything other than a yielded binding ends the walk.
                this.done = true;
                Poll::Ready(this.finish(response))
            }
        }
    }
}

/// Stream walking a subtree with GETBULK.
///
/// Created by [`Session::bulkwalk_stream`]. Each response is scanned up to
/// the first binding outside the root; if none is found the next request
/// continues from the last binding.
pub struct BulkWalk<T> {
    session: Session<T>,
    cursor: Cursor,
    max_repetitions: u32,
    done: bool,
    buffer: std::vec::IntoIter<VarBind>,
    pending: Option<Pending<Vec<VarBind>>>,
}

impl<T: Connect + 'static> BulkWalk<T> {
    pub(crate) fn new(session: Session<T>, root: Oid, max_repetitions: u32) -> Self {
        Self {
            session,
            cursor: Cursor::new(root),
            max_repetitions: max_repetitions.max(1),
            done: false,
            buffer: Vec::new().into_iter(),
            pending: None,
        }
    }

    /// Drain the walk. Any error discards what was collected.
    pub async fn collect(mut self) -> Result<Vec<VarBind>> {
        let mut out = Vec::new();
        while let Some(item) = std::future::poll_fn(|cx| Pin::new(&mut self).poll_next(cx)).await {
            out.push(item?);
        }
        Ok(out)
    }
}

impl<T: Connect + 'static> Stream for BulkWalk<T> {
    type Item = Result<VarBind>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.done {
                return Poll::Ready(None);
            }

            if let Some(vb) = this.buffer.next() {
                return match this.cursor.step(vb) {
                    Step::Yield(vb) => Poll::Ready(Some(Ok(vb))),
                    Step::End => {
                        this.done = true;
                        Poll::Ready(None)
                    }
                    Step::Stalled(e) => {
                        this.done = true;
                        Poll::Ready(Some(Err(e)))
                    }
                };
            }

            let pending = this.pending.get_or_insert_with(|| {
                let session = this.session.clone();
                let oid = this.cursor.current.clone();
                let max_repetitions = this.max_repetitions;
                Box::pin(async move {
                    session
                        .bulk_varbinds(std::slice::from_ref(&oid), 0, max_repetitions)
                        .await
                })
            });

            match pending.as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(result) => {
                    this.pending = None;
                    match result {
                        Ok(varbinds) if varbinds.is_empty() => {
                            this.done = true;
                            return Poll::Ready(None);
                        }
                        Ok(varbinds) => this.buffer = varbinds.into_iter(),
                        Err(e) => {
                            this.done = true;
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::session::SessionConfig;
    use crate::transport::{MockTransport, ResponseBuilder};
    use crate::value::Value;
    use std::time::Duration;

    fn session(version: u8, mock: &MockTransport) -> Session<MockTransport> {
        let config = SessionConfig::builder("127.0.0.1")
            .version(version)
            .community("public")
            .timeout(Duration::from_millis(50))
            .retries(0)
            .build()
            .unwrap();
        Session::with_transport(config, mock.clone())
    }

    fn mock() -> MockTransport {
        MockTransport::new("127.0.0.1:161".parse().unwrap())
    }

    #[tokio::test]
    async fn test_walk_terminates_on_end_of_mib_view() {
        let mut mock = mock();
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("Linux router"))
                .build_v2c(b"public"),
        );
        mock.queue_response(
            ResponseBuilder::new(2)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::EndOfMibView)
                .build_v2c(b"public"),
        );

        let walk = Walk::new(session(2, &mock), oid!(1, 3, 6, 1, 2, 1, 1));
        let results = walk.collect().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_walk_terminates_when_leaving_subtree() {
        let mut mock = mock();
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(1))
                .build_v2c(b"public"),
        );
        let walk = Walk::new(session(2, &mock), oid!(1, 3, 6, 1, 2, 1, 1));
        assert!(walk.collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_walk_each_request_continues_from_last_oid() {
        let mut mock = mock();
        for (i, arc) in [1u32, 2, 3].into_iter().enumerate() {
            mock.queue_response(
                ResponseBuilder::new(i as i32)
                    .varbind(oid!(1, 3, 6, 1, 2, 1, 1, arc, 0), Value::Integer(arc as i32))
                    .build_v2c(b"public"),
            );
        }
        mock.queue_response(
            ResponseBuilder::new(9)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(0))
                .build_v2c(b"public"),
        );

        let root = oid!(1, 3, 6, 1, 2, 1, 1);
        let results = Walk::new(session(2, &mock), root.clone()).collect().await.unwrap();
        assert_eq!(results.len(), 3);

        let sent: Vec<Oid> = mock
            .requests()
            .iter()
            .map(|r| r.pdu().unwrap().varbinds[0].oid.clone())
            .collect();
        assert_eq!(
            sent,
            vec![
                root,
                oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
                oid!(1, 3, 6, 1, 2, 1, 1, 2, 0),
                oid!(1, 3, 6, 1, 2, 1, 1, 3, 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_walk_errors_on_same_oid_returned_twice() {
        let mut mock = mock();
        for id in 1..=2 {
            mock.queue_response(
                ResponseBuilder::new(id)
                    .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::Integer(1))
                    .build_v2c(b"public"),
            );
        }
        let err = Walk::new(session(2, &mock), oid!(1, 3, 6, 1, 2, 1, 1))
            .collect()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NonIncreasingOid { .. }));
    }

    #[tokio::test]
    async fn test_walk_propagates_timeout() {
        let mock = mock();
        let err = Walk::new(session(2, &mock), oid!(1, 3, 6, 1, 2, 1, 1))
            .collect()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_v1_walk_ends_on_no_such_name() {
        let mut mock = mock();
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("Linux router"))
                .build_v1(b"public"),
        );
        mock.queue_response(
            ResponseBuilder::new(2)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::Null)
                .error_status(ErrorStatus::NoSuchName.as_i32())
                .error_index(1)
                .build_v1(b"public"),
        );
        let results = Walk::new(session(1, &mock), oid!(1, 3, 6, 1, 2, 1, 1))
            .collect()
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_walk_truncates_at_subtree_boundary() {
        let mut mock = mock();
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 1), Value::from("lo"))
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 2), Value::from("eth0"))
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 3, 1), Value::Integer(24))
                .build_v2c(b"public"),
        );
        let walk = BulkWalk::new(session(2, &mock), oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2), 10);
        let results = walk.collect().await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_walk_continues_from_last_binding() {
        let mut mock = mock();
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 1), Value::from("lo"))
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 2), Value::from("eth0"))
                .build_v2c(b"public"),
        );
        mock.queue_response(
            ResponseBuilder::new(2)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 3), Value::from("eth1"))
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 3, 1), Value::Integer(24))
                .build_v2c(b"public"),
        );
        let walk = BulkWalk::new(session(2, &mock), oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2), 2);
        let results = walk.collect().await.unwrap();
        assert_eq!(results.len(), 3);

        let second = mock.requests()[1].pdu().unwrap();
        assert_eq!(second.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 2));
        assert_eq!(second.error_index, 2);
    }

    #[tokio::test]
    async fn test_bulk_walk_handles_empty_response() {
        let mut mock = mock();
        mock.queue_response(ResponseBuilder::new(1).build_v2c(b"public"));
        let walk = BulkWalk::new(session(2, &mock), oid!(1, 3, 6, 1, 2, 1, 1), 10);
        assert!(walk.collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_walk_errors_on_non_increasing_oid() {
        let mut mock = mock();
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 2, 0), Value::Integer(2))
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::Integer(1))
                .build_v2c(b"public"),
        );
        let err = BulkWalk::new(session(2, &mock), oid!(1, 3, 6, 1, 2, 1, 1), 10)
            .collect()
            .await
            .unwrap_err();
        match err {
            Error::NonIncreasingOid { previous, current } => {
                assert_eq!(previous, oid!(1, 3, 6, 1, 2, 1, 1, 2, 0));
                assert_eq!(current, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_walk_rejects_root_echo() {
        let mut mock = mock();
        let root = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(root.clone(), Value::from("Linux router"))
                .build_v2c(b"public"),
        );
        let err = Walk::new(session(2, &mock), root.clone())
            .collect()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NonIncreasingOid { ref previous, .. } if *previous == root));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_walk_rejects_root_echo() {
        let mut mock = mock();
        let root = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2);
        mock.queue_response(
            ResponseBuilder::new(1)
                .varbind(root.clone(), Value::Null)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 1), Value::from("lo"))
                .build_v2c(b"public"),
        );
        let mut walk = BulkWalk::new(session(2, &mock), root, 10);
        let first = std::future::poll_fn(|cx| Pin::new(&mut walk).poll_next(cx)).await;
        assert!(matches!(first, Some(Err(Error::NonIncreasingOid { .. }))));
        assert!(std::future::poll_fn(|cx| Pin::new(&mut walk).poll_next(cx)).await.is_none());
    }
}
