//! A small in-memory community agent driven through `MockTransport::set_responder`.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tdsnmp::error::ErrorStatus;
use tdsnmp::message::{CommunityMessage, Message};
use tdsnmp::transport::{MockTransport, ResponseBuilder};
use tdsnmp::{Oid, Pdu, PduType, Value, VarBind, Version};

#[derive(Default)]
struct Mib {
    objects: BTreeMap<Oid, Value>,
    read_only: HashSet<Oid>,
}

/// Answers GET, GETNEXT, GETBULK and SET from a sorted table the way a
/// conforming agent would for the request's version.
#[derive(Clone)]
pub struct Agent {
    community: Bytes,
    mib: Arc<Mutex<Mib>>,
}

impl Agent {
    pub fn new(community: &str) -> Self {
        Self {
            community: Bytes::copy_from_slice(community.as_bytes()),
            mib: Arc::default(),
        }
    }

    pub fn with(self, oid: Oid, value: Value) -> Self {
        self.mib.lock().unwrap().objects.insert(oid, value);
        self
    }

    /// Reject SETs on `oid` with notWritable.
    pub fn read_only(self, oid: Oid) -> Self {
        self.mib.lock().unwrap().read_only.insert(oid);
        self
    }

    pub fn value(&self, oid: &Oid) -> Option<Value> {
        self.mib.lock().unwrap().objects.get(oid).cloned()
    }

    /// Answer every request `mock` sees.
    pub fn serve(&self, mock: &mut MockTransport) {
        let agent = self.clone();
        mock.set_responder(move |data| agent.respond(data));
    }

    /// Requests with the wrong community go unanswered.
    pub fn respond(&self, data: &Bytes) -> Option<Bytes> {
        let Message::Community(msg) = Message::decode(data.clone()).ok()? else {
            return None;
        };
        if msg.community != self.community {
            return None;
        }
        let pdu = self.answer(msg.version, msg.pdu);
        Some(
            CommunityMessage {
                version: msg.version,
                community: msg.community,
                pdu,
            }
            .encode(),
        )
    }

    fn answer(&self, version: Version, request: Pdu) -> Pdu {
        let mut mib = self.mib.lock().unwrap();
        let reply = ResponseBuilder::new(request.request_id);
        let v1 = version == Version::V1;
        let fail = |status: ErrorStatus, index: usize| {
            ResponseBuilder::new(request.request_id)
                .error_status(status.as_i32())
                .error_index(index as i32)
                .varbinds(request.varbinds.clone())
                .pdu()
        };

        match request.pdu_type {
            PduType::GetRequest => {
                let mut bindings = Vec::new();
                for (i, vb) in request.varbinds.iter().enumerate() {
                    match mib.objects.get(&vb.oid) {
                        Some(value) => bindings.push(VarBind::new(vb.oid.clone(), value.clone())),
                        None if v1 => return fail(ErrorStatus::NoSuchName, i + 1),
                        None => bindings.push(VarBind::new(vb.oid.clone(), Value::NoSuchObject)),
                    }
                }
                reply.varbinds(bindings).pdu()
            }
            PduType::GetNextRequest => {
                let mut bindings = Vec::new();
                for (i, vb) in request.varbinds.iter().enumerate() {
                    match successor(&mib.objects, &vb.oid) {
                        Some(next) => bindings.push(next),
                        None if v1 => return fail(ErrorStatus::NoSuchName, i + 1),
                        None => bindings.push(VarBind::new(vb.oid.clone(), Value::EndOfMibView)),
                    }
                }
                reply.varbinds(bindings).pdu()
            }
            PduType::GetBulkRequest => {
                let non_repeaters = (request.error_status.max(0) as usize).min(request.varbinds.len());
                let max_repetitions = request.error_index.max(0) as usize;
                let (singles, repeaters) = request.varbinds.split_at(non_repeaters);

                let mut bindings: Vec<VarBind> = singles
                    .iter()
                    .map(|vb| {
                        successor(&mib.objects, &vb.oid)
                            .unwrap_or_else(|| VarBind::new(vb.oid.clone(), Value::EndOfMibView))
                    })
                    .collect();
                let mut cursors: Vec<Oid> = repeaters.iter().map(|vb| vb.oid.clone()).collect();
                for _ in 0..max_repetitions {
                    for cursor in &mut cursors {
                        let next = successor(&mib.objects, cursor)
                            .unwrap_or_else(|| VarBind::new(cursor.clone(), Value::EndOfMibView));
                        *cursor = next.oid.clone();
                        bindings.push(next);
                    }
                }
                reply.varbinds(bindings).pdu()
            }
            PduType::SetRequest => {
                for (i, vb) in request.varbinds.iter().enumerate() {
                    if mib.read_only.contains(&vb.oid) {
                        return fail(ErrorStatus::NotWritable, i + 1);
                    }
                }
                for vb in &request.varbinds {
                    mib.objects.insert(vb.oid.clone(), vb.value.clone());
                }
                reply.varbinds(request.varbinds.clone()).pdu()
            }
            PduType::Response | PduType::Report => fail(ErrorStatus::GenErr, 0),
        }
    }
}

fn successor(objects: &BTreeMap<Oid, Value>, oid: &Oid) -> Option<VarBind> {
    objects
        .range((Bound::Excluded(oid.clone()), Bound::Unbounded))
        .next()
        .map(|(oid, value)| VarBind::new(oid.clone(), value.clone()))
}
