//! Sessions: per-agent state and the caller-facing operations.
//!
//! A [`Session`] starts `Unconnected`. The first request opens the transport and
//! wires version-specific security (a community string, or USM with engine
//! discovery); the session is then `Established` until [`Session::close`].
//!
//! # Example
//!
//! ```rust,no_run
//! use tdsnmp::{Session, SessionConfig};
//!
//! # async fn example() -> tdsnmp::Result<()> {
//! let config = SessionConfig::builder("192.0.2.1")
//!     .version(2)
//!     .community("public")
//!     .build()?;
//! let session = Session::new(config);
//!
//! let descr = session.get(["sysDescr.0"]).await?;
//! for var in session.walk(["ifDescr"]).await? {
//!     println!("{var}");
//! }
//! # let _ = descr;
//! # Ok(())
//! # }
//! ```

mod config;
mod v3;
mod walk;

pub use config::{
    Community, Credentials, DEFAULT_PORT, SessionConfig, SessionConfigBuilder, UsmConfig,
};
pub use walk::{BulkWalk, Walk};

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{Error, ErrorStatus, Result};
use crate::message::{CommunityMessage, Message};
use crate::normalize::{OidSpec, build_interface_vars};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::transport::{AnyTransport, Connect, RetryPolicy, Transport, exchange};
use crate::v3::{SaltCounter, random_nonzero_u64};
use crate::validate::validate;
use crate::value::{SnmpType, Value};
use crate::varbind::VarBind;
use crate::variable::SnmpVariable;
use crate::version::Version;

use self::v3::UsmState;

/// Subtree walked when no root is given (`mib-2`).
pub const DEFAULT_WALK_ROOT: &str = ".1.3.6.1.2.1";

/// Default max-repetitions for GETBULK operations.
pub const DEFAULT_MAX_REPETITIONS: u32 = 15;

/// Result of `get`/`get_next`: one variable when one OID was asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    One(SnmpVariable),
    Many(Vec<SnmpVariable>),
}

impl Response {
    fn from_vars(requested: usize, mut vars: Vec<SnmpVariable>) -> Self {
        if requested == 1
            && vars.len() == 1
            && let Some(var) = vars.pop()
        {
            return Response::One(var);
        }
        Response::Many(vars)
    }

    /// The variables in response order.
    pub fn into_vec(self) -> Vec<SnmpVariable> {
        match self {
            Response::One(var) => vec![var],
            Response::Many(vars) => vars,
        }
    }

    pub fn first(&self) -> Option<&SnmpVariable> {
        match self {
            Response::One(var) => Some(var),
            Response::Many(vars) => vars.first(),
        }
    }
}

/// One binding of a SET: OID, value as text and an optional type.
#[derive(Debug, Clone, PartialEq)]
pub struct SetRequest {
    pub oid: OidSpec,
    pub value: String,
    /// Taken from the MIB when absent.
    pub snmp_type: Option<SnmpType>,
}

impl<S: Into<OidSpec>, V: Into<String>> From<(S, V)> for SetRequest {
    fn from((oid, value): (S, V)) -> Self {
        Self {
            oid: oid.into(),
            value: value.into(),
            snmp_type: None,
        }
    }
}

impl<S: Into<OidSpec>, V: Into<String>> From<(S, V, SnmpType)> for SetRequest {
    fn from((oid, value, snmp_type): (S, V, SnmpType)) -> Self {
        Self {
            oid: oid.into(),
            value: value.into(),
            snmp_type: Some(snmp_type),
        }
    }
}

impl<S: Into<OidSpec>, V: Into<String>> From<(S, V, Option<SnmpType>)> for SetRequest {
    fn from((oid, value, snmp_type): (S, V, Option<SnmpType>)) -> Self {
        Self {
            oid: oid.into(),
            value: value.into(),
            snmp_type,
        }
    }
}

enum Security {
    Community { version: Version, community: Bytes },
    Usm(Box<UsmState>),
}

struct Link<T> {
    transport: T,
    security: Security,
}

enum State<T> {
    /// Holds a transport supplied up front, if any.
    Unconnected(Option<T>),
    Established(Link<T>),
    Closed,
}

struct Inner<T> {
    config: SessionConfig,
    state: Mutex<State<T>>,
    next_request_id: AtomicI32,
    cancel: CancellationToken,
    salt: SaltCounter,
}

/// An SNMP session with one agent.
///
/// Cheap to clone; clones share the connection and request-id sequence.
/// Requests on one session are serialised: a second call waits until the
/// first has its response.
pub struct Session<T = AnyTransport> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("hostname", &self.inner.config.hostname())
            .field("version", &self.inner.config.version())
            .finish_non_exhaustive()
    }
}

impl Session<AnyTransport> {
    /// Session that opens UDP, or a tunnel for `tls://`, `dtls://` and
    /// `ssh://` hostnames, on first use.
    pub fn new(config: SessionConfig) -> Self {
        Self::from_state(config, State::Unconnected(None))
    }
}

impl<T: Connect + 'static> Session<T> {
    /// Session over a transport the caller has already opened.
    pub fn with_transport(config: SessionConfig, transport: T) -> Self {
        Self::from_state(config, State::Unconnected(Some(transport)))
    }

    fn from_state(config: SessionConfig, state: State<T>) -> Self {
        // Request ids stay positive: v3 reuses them as msgID.
        let seed = (random_nonzero_u64() % (i32::MAX as u64 - 1)) as i32 + 1;
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(state),
                next_request_id: AtomicI32::new(seed),
                cancel: CancellationToken::new(),
                salt: SaltCounter::new(),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Token that aborts in-flight and future requests when cancelled.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Whether the session is established.
    pub async fn is_established(&self) -> bool {
        matches!(*self.inner.state.lock().await, State::Established(_))
    }

    /// Establish now instead of on the first request.
    pub async fn connect(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.establish(&mut *state).await.map(|_| ())
    }

    /// Drop the transport. Later requests fail with [`Error::SessionClosed`].
    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        *state = State::Closed;
        tracing::debug!(target: "tdsnmp::session", { snmp.target = %self.inner.config.connect_hostname() }, "session closed");
    }

    fn next_request_id(&self) -> i32 {
        let previous = self
            .inner
            .next_request_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                Some(if id == i32::MAX { 1 } else { id + 1 })
            });
        match previous {
            Ok(id) | Err(id) => id,
        }
    }

    fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: self.inner.config.timeout(),
            retries: self.inner.config.retries(),
        }
    }

    async fn establish<'a>(&self, state: &'a mut State<T>) -> Result<&'a mut Link<T>> {
        if let State::Unconnected(slot) = state {
            let config = &self.inner.config;
            let transport = match slot.take() {
                Some(transport) => transport,
                None => T::connect(config).await?,
            };
            let mut security = match config.credentials() {
                Credentials::V1(community) => Security::Community {
                    version: Version::V1,
                    community: community.to_bytes(),
                },
                Credentials::V2c(community) => Security::Community {
                    version: Version::V2c,
                    community: community.to_bytes(),
                },
                Credentials::V3(usm) => Security::Usm(Box::new(UsmState::new(usm.clone()))),
            };
            if let Security::Usm(usm) = &mut security {
                let msg_id = self.next_request_id();
                if let Err(e) = usm
                    .establish(&transport, msg_id, self.policy(), &self.inner.cancel)
                    .await
                {
                    *slot = Some(transport);
                    return Err(e);
                }
            }
            tracing::debug!(
                target: "tdsnmp::session",
                { snmp.target = %transport.target(), version = %config.version() },
                "session established"
            );
            *state = State::Established(Link { transport, security });
        }
        match state {
            State::Established(link) => Ok(link),
            State::Closed => Err(Error::SessionClosed),
            State::Unconnected(_) => Err(Error::config("session could not be established")),
        }
    }

    /// Send one request PDU and return the agent's response PDU unchecked.
    ///
    /// The request id is assigned here. A v3 notInTimeWindow report is
    /// answered with one resend after the engine clock is resynchronised.
    pub(crate) async fn request(&self, pdu: Pdu) -> Result<Pdu> {
        if self.inner.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let mut state = self.inner.state.lock().await;
        let policy = self.policy();
        let cancel = &self.inner.cancel;
        let Link { transport, security } = self.establish(&mut *state).await?;

        match security {
            Security::Community { version, community } => {
                let id = self.next_request_id();
                let data = CommunityMessage::with_version(*version, &community[..], pdu.with_request_id(id)).encode();
                let reply = exchange(transport, id, policy, cancel, |_| Ok(data.clone())).await?;
                let msg = match Message::decode(reply)? {
                    Message::Community(msg) => msg,
                    Message::V3(_) => {
                        return Err(Error::VersionMismatch {
                            expected: *version,
                            actual: Version::V3,
                        });
                    }
                };
                if msg.version != *version {
                    return Err(Error::VersionMismatch {
                        expected: *version,
                        actual: msg.version,
                    });
                }
                if msg.pdu.request_id != id {
                    return Err(Error::RequestIdMismatch {
                        expected: id,
                        actual: msg.pdu.request_id,
                    });
                }
                Ok(msg.pdu)
            }
            Security::Usm(usm) => {
                let mut resynced = false;
                loop {
                    let id = self.next_request_id();
                    let request = pdu.with_request_id(id);
                    let salt = &self.inner.salt;
                    let usm_ref: &UsmState = usm;
                    let reply =
                        exchange(transport, id, policy, cancel, |_| usm_ref.encode(&request, id, salt)).await?;
                    match usm.decode(reply) {
                        Err(Error::NotInTimeWindow) if !resynced => {
                            tracing::debug!(target: "tdsnmp::session", { snmp.request_id = id }, "resending after time window resync");
                            resynced = true;
                        }
                        Ok(response) if response.request_id != id => {
                            return Err(Error::RequestIdMismatch {
                                expected: id,
                                actual: response.request_id,
                            });
                        }
                        other => return other,
                    }
                }
            }
        }
    }

    /// Numeric OID for a name and optional index.
    ///
    /// Numeric names parse directly; symbolic ones go through the resolver
    /// (loosely when `best_guess` is set). The index must be dotted numbers.
    pub fn resolve(&self, name: &str, index: Option<&str>) -> Result<Oid> {
        let config = &self.inner.config;
        let unknown = || Error::UnknownObjectId {
            name: match index {
                Some(index) => format!("{name}.{index}"),
                None => name.to_owned(),
            },
        };

        let base = if Oid::is_numeric_str(name) {
            Oid::parse(name).map_err(|_| unknown())?
        } else {
            let resolver = config.resolver();
            let found = if config.display().best_guess != 0 {
                resolver.resolve_fuzzy(name)
            } else {
                resolver.resolve(name)
            };
            match found {
                Some(oid) => oid,
                None if name.trim_start_matches('.') == "iso" => Oid::from_slice(&[1]),
                None => return Err(unknown()),
            }
        };

        match index {
            None => Ok(base),
            Some(index) => {
                let arcs = index
                    .trim_start_matches('.')
                    .split('.')
                    .map(str::parse::<u32>)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| unknown())?;
                Ok(base.extend_from(&arcs))
            }
        }
    }

    fn resolve_variable(&self, var: &SnmpVariable) -> Result<Oid> {
        self.resolve(&var.oid, var.oid_index.as_deref())
    }

    fn prepare<I, S>(&self, oids: I) -> Result<Vec<Oid>>
    where
        I: IntoIterator<Item = S>,
        S: Into<OidSpec>,
    {
        let vars = build_interface_vars(oids);
        if vars.is_empty() {
            return Err(Error::config("at least one OID is required"));
        }
        vars.iter().map(|var| self.resolve_variable(var)).collect()
    }

    /// Render wire bindings with this session's resolver and display options.
    pub fn render(&self, varbinds: &[VarBind]) -> Vec<SnmpVariable> {
        let config = &self.inner.config;
        varbinds
            .iter()
            .map(|vb| SnmpVariable::from_varbind(vb, config.resolver().as_ref(), config.display()))
            .collect()
    }

    fn finish(&self, vars: Vec<SnmpVariable>) -> Result<Vec<SnmpVariable>> {
        if self.inner.config.abort_on_nonexistent() {
            validate(&vars)?;
        }
        Ok(vars)
    }

    /// GET or GETNEXT, honouring `retry_no_such` on v1.
    async fn fetch(&self, pdu_type: PduType, oids: Vec<Oid>) -> Result<Vec<VarBind>> {
        let retry_no_such =
            self.inner.config.retry_no_such() && self.inner.config.version() == Version::V1;
        let mut slots: Vec<Option<VarBind>> = vec![None; oids.len()];
        let mut pending: Vec<usize> = (0..oids.len()).collect();

        while !pending.is_empty() {
            let request_oids: Vec<Oid> = pending.iter().map(|&i| oids[i].clone()).collect();
            let pdu = match pdu_type {
                PduType::GetNextRequest => Pdu::get_next_request(0, &request_oids),
                _ => Pdu::get_request(0, &request_oids),
            };
            let response = self.request(pdu).await?;

            if retry_no_such && response.error_status_enum() == ErrorStatus::NoSuchName {
                let position = usize::try_from(response.error_index)
                    .ok()
                    .and_then(|i| i.checked_sub(1))
                    .filter(|&i| i < pending.len());
                if let Some(position) = position {
                    let slot = pending.remove(position);
                    tracing::debug!(
                        target: "tdsnmp::session",
                        { snmp.oid = %oids[slot] },
                        "noSuchName, resending without binding"
                    );
                    slots[slot] = Some(VarBind::new(oids[slot].clone(), Value::NoSuchObject));
                    continue;
                }
            }
            response.check_error()?;

            if response.varbinds.len() != pending.len() {
                tracing::warn!(
                    target: "tdsnmp::session",
                    { expected = pending.len(), actual = response.varbinds.len() },
                    "agent returned a different number of bindings"
                );
                if slots.iter().all(Option::is_none) {
                    return Ok(response.varbinds);
                }
            }
            for (&slot, vb) in pending.iter().zip(response.varbinds) {
                slots[slot] = Some(vb);
            }
            break;
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// GET one or more objects.
    ///
    /// One OID gives [`Response::One`]; see [`Session::get_list`] to always
    /// get a list.
    #[instrument(skip_all, err, fields(snmp.target = %self.inner.config.connect_hostname()))]
    pub async fn get<I, S>(&self, oids: I) -> Result<Response>
    where
        I: IntoIterator<Item = S>,
        S: Into<OidSpec>,
    {
        let oids = self.prepare(oids)?;
        let requested = oids.len();
        let varbinds = self.fetch(PduType::GetRequest, oids).await?;
        Ok(Response::from_vars(requested, self.finish(self.render(&varbinds))?))
    }

    /// GET, always returning a list.
    pub async fn get_list<I, S>(&self, oids: I) -> Result<Vec<SnmpVariable>>
    where
        I: IntoIterator<Item = S>,
        S: Into<OidSpec>,
    {
        self.get(oids).await.map(Response::into_vec)
    }

    /// GETNEXT: the object following each OID.
    #[instrument(skip_all, err, fields(snmp.target = %self.inner.config.connect_hostname()))]
    pub async fn get_next<I, S>(&self, oids: I) -> Result<Response>
    where
        I: IntoIterator<Item = S>,
        S: Into<OidSpec>,
    {
        let oids = self.prepare(oids)?;
        let requested = oids.len();
        let varbinds = self.fetch(PduType::GetNextRequest, oids).await?;
        Ok(Response::from_vars(requested, self.finish(self.render(&varbinds))?))
    }

    fn require_bulk(&self, operation: &'static str) -> Result<()> {
        let version = self.inner.config.version();
        if version.supports_bulk() {
            return Ok(());
        }
        tracing::debug!(target: "tdsnmp::session", { operation }, "bulk operation refused on v1");
        Err(Error::UnsupportedVersion {
            version: version.number(),
            reason: operation,
        })
    }

    /// GETBULK: the first `non_repeaters` OIDs get one successor each, the
    /// rest up to `max_repetitions` successors.
    #[instrument(skip_all, err, fields(
        snmp.target = %self.inner.config.connect_hostname(),
        snmp.non_repeaters = non_repeaters,
        snmp.max_repetitions = max_repetitions
    ))]
    pub async fn get_bulk<I, S>(
        &self,
        oids: I,
        non_repeaters: u32,
        max_repetitions: u32,
    ) -> Result<Vec<SnmpVariable>>
    where
        I: IntoIterator<Item = S>,
        S: Into<OidSpec>,
    {
        self.require_bulk("GETBULK is not available for SNMP version 1")?;
        let oids = self.prepare(oids)?;
        let varbinds = self.bulk_varbinds(&oids, non_repeaters, max_repetitions).await?;
        self.finish(self.render(&varbinds))
    }

    pub(crate) async fn bulk_varbinds(
        &self,
        oids: &[Oid],
        non_repeaters: u32,
        max_repetitions: u32,
    ) -> Result<Vec<VarBind>> {
        let pdu = Pdu::get_bulk(
            0,
            i32::try_from(non_repeaters).unwrap_or(i32::MAX),
            i32::try_from(max_repetitions).unwrap_or(i32::MAX),
            oids,
        );
        let response = self.request(pdu).await?;
        response.check_error()?;
        Ok(response.varbinds)
    }

    pub(crate) async fn next_varbind(&self, oid: &Oid) -> Result<Pdu> {
        self.request(Pdu::get_next_request(0, std::slice::from_ref(oid))).await
    }

    /// SET one object. Returns whether the agent accepted it.
    ///
    /// `value` is text converted by `snmp_type`, or by the type the MIB
    /// declares for the object when `snmp_type` is `None`.
    pub async fn set(
        &self,
        oid: impl Into<OidSpec>,
        value: impl Into<String>,
        snmp_type: Option<SnmpType>,
    ) -> Result<bool> {
        self.set_multiple([(oid.into(), value.into(), snmp_type)]).await
    }

    /// SET several objects in one request. Returns whether the agent
    /// accepted all of them.
    #[instrument(skip_all, err, fields(snmp.target = %self.inner.config.connect_hostname()))]
    pub async fn set_multiple<I, R>(&self, items: I) -> Result<bool>
    where
        I: IntoIterator<Item = R>,
        R: Into<SetRequest>,
    {
        let varbinds = items
            .into_iter()
            .map(|item| self.set_varbind(item.into()))
            .collect::<Result<Vec<_>>>()?;
        if varbinds.is_empty() {
            return Err(Error::config("at least one OID is required"));
        }

        let response = self.request(Pdu::set_request(0, varbinds)).await?;
        if response.is_error() {
            tracing::debug!(
                target: "tdsnmp::session",
                { status = %response.error_status_enum(), index = response.error_index },
                "agent rejected SET"
            );
            return Ok(false);
        }
        Ok(true)
    }

    fn set_varbind(&self, item: SetRequest) -> Result<VarBind> {
        let (name, index) = item.oid.normalize();
        let oid = self.resolve(&name, index.as_deref())?;
        let snmp_type = item
            .snmp_type
            .or_else(|| self.inner.config.resolver().syntax(&oid))
            .ok_or_else(|| Error::UndeterminedType {
                oid: match &index {
                    Some(index) => format!("{name}.{index}"),
                    None => name.clone(),
                },
            })?;

        let value = if snmp_type == SnmpType::ObjectIdentifier && !Oid::is_numeric_str(item.value.trim()) {
            let (value_name, value_index) = crate::normalize::normalize(item.value.trim(), None);
            Value::ObjectIdentifier(self.resolve(&value_name, value_index.as_deref()).map_err(|_| {
                Error::InvalidValue {
                    value: item.value.clone(),
                    snmp_type,
                }
            })?)
        } else {
            snmp_type.parse_value(&item.value)?
        };
        Ok(VarBind::new(oid, value))
    }

    /// GETNEXT walk of one subtree as a stream.
    pub fn walk_stream(&self, root: impl Into<OidSpec>) -> Result<Walk<T>> {
        let (name, index) = root.into().normalize();
        Ok(Walk::new(self.clone(), self.resolve(&name, index.as_deref())?))
    }

    /// GETBULK walk of one subtree as a stream.
    pub fn bulkwalk_stream(&self, root: impl Into<OidSpec>, max_repetitions: u32) -> Result<BulkWalk<T>> {
        self.require_bulk("BULKWALK is not available for SNMP version 1")?;
        let (name, index) = root.into().normalize();
        Ok(BulkWalk::new(
            self.clone(),
            self.resolve(&name, index.as_deref())?,
            max_repetitions,
        ))
    }

    fn roots<I, S>(&self, roots: I) -> Result<Vec<Oid>>
    where
        I: IntoIterator<Item = S>,
        S: Into<OidSpec>,
    {
        let vars = build_interface_vars(roots);
        if vars.is_empty() {
            return Ok(vec![self.resolve(DEFAULT_WALK_ROOT, None)?]);
        }
        vars.iter().map(|var| self.resolve_variable(var)).collect()
    }

    /// Walk each root with GETNEXT. Roots are walked one after another and
    /// their results concatenated; no roots walks `mib-2`.
    ///
    /// Nothing is returned if any root fails.
    #[instrument(skip_all, err, fields(snmp.target = %self.inner.config.connect_hostname()))]
    pub async fn walk<I, S>(&self, roots: I) -> Result<Vec<SnmpVariable>>
    where
        I: IntoIterator<Item = S>,
        S: Into<OidSpec>,
    {
        let mut varbinds = Vec::new();
        for root in self.roots(roots)? {
            varbinds.extend(Walk::new(self.clone(), root).collect().await?);
        }
        self.finish(self.render(&varbinds))
    }

    /// Walk each root with GETBULK.
    ///
    /// The first `non_repeaters` roots contribute only their immediate
    /// successor, if it lies inside the root. Fails on v1 before any I/O.
    #[instrument(skip_all, err, fields(
        snmp.target = %self.inner.config.connect_hostname(),
        snmp.max_repetitions = max_repetitions
    ))]
    pub async fn bulkwalk<I, S>(
        &self,
        roots: I,
        non_repeaters: u32,
        max_repetitions: u32,
    ) -> Result<Vec<SnmpVariable>>
    where
        I: IntoIterator<Item = S>,
        S: Into<OidSpec>,
    {
        self.require_bulk("BULKWALK is not available for SNMP version 1")?;
        let mut varbinds = Vec::new();
        for (i, root) in self.roots(roots)?.into_iter().enumerate() {
            if (i as u64) < u64::from(non_repeaters) {
                let next = self.bulk_varbinds(std::slice::from_ref(&root), 1, 0).await?;
                varbinds.extend(next.into_iter().take(1).filter(|vb| vb.continues_walk(&root)));
                continue;
            }
            varbinds.extend(BulkWalk::new(self.clone(), root, max_repetitions).collect().await?);
        }
        self.finish(self.render(&varbinds))
    }
}
