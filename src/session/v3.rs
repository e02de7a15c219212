//! USM wiring for v3 sessions: engine discovery, message protection and
//! report handling.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use super::config::UsmConfig;
use crate::ber::Decoder;
use crate::error::{AuthErrorKind, CryptoErrorKind, EncodeErrorKind, Error, Result};
use crate::message::{MAX_MSG_SIZE, Message, MsgFlags, MsgGlobalData, ScopedPdu, V3Message, V3MessageData};
use crate::pdu::{Pdu, PduType};
use crate::transport::{RetryPolicy, Transport, exchange};
use crate::v3::auth::{authenticate_message, verify_message};
use crate::v3::{
    EngineState, LocalizedKey, MasterKey, PrivKey, ReportKind, SaltCounter, UsmSecurityParams,
    classify_report, find_auth_params_offset,
};
use crate::version::Version;

/// Per-session USM state, created when the session is established.
pub(crate) struct UsmState {
    config: UsmConfig,
    engine: Option<EngineState>,
    auth_key: Option<LocalizedKey>,
    priv_key: Option<PrivKey>,
}

impl UsmState {
    pub(crate) fn new(config: UsmConfig) -> Self {
        Self {
            config,
            engine: None,
            auth_key: None,
            priv_key: None,
        }
    }

    pub(crate) fn engine(&self) -> Option<&EngineState> {
        self.engine.as_ref()
    }

    /// Learn the authoritative engine, either from configuration or with a
    /// discovery round trip, then localize keys to it.
    pub(crate) async fn establish<T: Transport>(
        &mut self,
        transport: &T,
        msg_id: i32,
        policy: RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let engine = if self.config.security_engine_id.is_empty() {
            let discovery = V3Message::discovery_request(msg_id).encode();
            tracing::debug!(
                target: "tdsnmp::v3",
                { snmp.target = %transport.target(), snmp.request_id = msg_id },
                "discovering engine"
            );
            let reply = exchange(transport, msg_id, policy, cancel, |_| Ok(discovery.clone())).await?;
            let msg = expect_v3(Message::decode(reply)?)?;
            let usm = UsmSecurityParams::decode(msg.security_params.clone())?;
            EngineState::from_discovery(&usm, msg.global_data.msg_max_size)?
        } else {
            EngineState::new(
                self.config.security_engine_id.clone(),
                self.config.engine_boots,
                self.config.engine_time,
            )
        };

        tracing::debug!(
            target: "tdsnmp::v3",
            {
                snmp.engine_id = %crate::strings::HexBytes(&engine.engine_id),
                snmp.engine_boots = engine.engine_boots,
                snmp.engine_time = engine.engine_time,
            },
            "engine established"
        );

        let level = self.config.security_level;
        if level.requires_auth() {
            let master = MasterKey::from_password(self.config.auth_protocol, &self.config.auth_password);
            self.auth_key = Some(master.localize(&engine.engine_id));
            if level.requires_priv() {
                let master = if self.config.privacy_password == self.config.auth_password {
                    master
                } else {
                    MasterKey::from_password(self.config.auth_protocol, &self.config.privacy_password)
                };
                self.priv_key = Some(PrivKey::from_master_key(
                    &master,
                    self.config.privacy_protocol,
                    &engine.engine_id,
                ));
            }
        }
        self.engine = Some(engine);
        Ok(())
    }

    /// Encode and protect one request. Called per attempt so each
    /// retransmission carries a current engine time and fresh salt.
    pub(crate) fn encode(&self, pdu: &Pdu, msg_id: i32, salt: &SaltCounter) -> Result<Bytes> {
        let engine = self
            .engine
            .as_ref()
            .ok_or(Error::encode(EncodeErrorKind::EngineNotDiscovered))?;
        let level = self.config.security_level;
        let boots = engine.engine_boots;
        let time = engine.estimated_time();

        let context_engine_id = if self.config.context_engine_id.is_empty() {
            engine.engine_id.clone()
        } else {
            self.config.context_engine_id.clone()
        };
        let scoped = ScopedPdu::new(context_engine_id, self.config.context.clone(), pdu.clone());
        let global = MsgGlobalData::new(msg_id, MAX_MSG_SIZE, MsgFlags::new(level, true));

        let mut usm = UsmSecurityParams::new(
            engine.engine_id.clone(),
            boots,
            time,
            self.config.username.clone(),
        );
        if let Some(key) = &self.auth_key {
            usm = usm.with_auth_placeholder(key.mac_len());
        }

        let msg = if level.requires_priv() {
            let key = self
                .priv_key
                .as_ref()
                .ok_or(Error::encrypt(CryptoErrorKind::NoPrivKey))?;
            let (ciphertext, priv_params) = key.encrypt(&scoped.encode_to_bytes(), boots, time, salt)?;
            usm = usm.with_priv_params(priv_params);
            V3Message::new_encrypted(global, usm.encode(), ciphertext)
        } else {
            V3Message::new(global, usm.encode(), scoped)
        };

        let encoded = msg.encode();
        if encoded.len() > engine.msg_max_size as usize {
            tracing::debug!(
                target: "tdsnmp::v3",
                { snmp.request_id = msg_id, size = encoded.len(), max = engine.msg_max_size },
                "request larger than agent accepts"
            );
            return Err(Error::encode(EncodeErrorKind::MessageTooLarge {
                size: encoded.len(),
                max: engine.msg_max_size,
            }));
        }
        if !level.requires_auth() {
            return Ok(encoded);
        }
        let key = self
            .auth_key
            .as_ref()
            .ok_or(Error::encode(EncodeErrorKind::MissingAuthKey))?;
        let mut buf = encoded.to_vec();
        let (offset, _) = find_auth_params_offset(&buf)?;
        authenticate_message(key, &mut buf, offset)?;
        Ok(Bytes::from(buf))
    }

    /// Verify, decrypt and unwrap a response. Reports become errors; a
    /// notInTimeWindow report also resynchronises the engine clock.
    pub(crate) fn decode(&mut self, data: Bytes) -> Result<Pdu> {
        let msg = expect_v3(Message::decode(data.clone())?)?;
        let usm = UsmSecurityParams::decode(msg.security_params.clone())?;
        let authenticated = msg.security_level().requires_auth();

        if authenticated {
            let key = self
                .auth_key
                .as_ref()
                .ok_or(Error::auth(AuthErrorKind::NoAuthKey))?;
            let (offset, len) = find_auth_params_offset(&data)?;
            verify_message(key, &data, offset, len)?;
            if let Some(engine) = self.engine.as_mut() {
                if !engine.is_in_time_window(&usm.engine_id, usm.engine_boots, usm.engine_time) {
                    tracing::warn!(
                        target: "tdsnmp::v3",
                        {
                            snmp.engine_id = %crate::strings::HexBytes(&usm.engine_id),
                            snmp.engine_boots = usm.engine_boots,
                            snmp.engine_time = usm.engine_time,
                            latest_boots = engine.engine_boots,
                            latest_time = engine.latest_received_engine_time,
                        },
                        "authenticated message outside time window"
                    );
                    return Err(Error::NotInTimeWindow);
                }
                engine.update_time(usm.engine_boots, usm.engine_time);
            }
        }

        let scoped = match msg.data {
            V3MessageData::Plaintext(scoped) => scoped,
            V3MessageData::Encrypted(ciphertext) => {
                let key = self
                    .priv_key
                    .as_ref()
                    .ok_or(Error::decrypt(CryptoErrorKind::NoPrivKey))?;
                let plain = key.decrypt(&ciphertext, usm.engine_boots, usm.engine_time, &usm.priv_params)?;
                ScopedPdu::decode(&mut Decoder::new(plain))?
            }
        };
        let pdu = scoped.pdu;

        if pdu.pdu_type == PduType::Report {
            let kind = classify_report(&pdu);
            tracing::debug!(
                target: "tdsnmp::v3",
                { snmp.request_id = pdu.request_id, report = ?kind },
                "agent sent report"
            );
            if kind == ReportKind::NotInTimeWindow
                && let Some(engine) = self.engine.as_mut()
            {
                engine.resync(usm.engine_boots, usm.engine_time);
            }
            return Err(kind.into_error(pdu.varbinds.first().map(|vb| &vb.oid)));
        }

        if !authenticated && self.config.security_level.requires_auth() {
            tracing::warn!(target: "tdsnmp::v3", "unauthenticated response to authenticated request");
            return Err(Error::auth(AuthErrorKind::MissingAuthFlag));
        }
        Ok(pdu)
    }
}

fn expect_v3(msg: Message) -> Result<V3Message> {
    match msg {
        Message::V3(msg) => Ok(msg),
        Message::Community(other) => Err(Error::VersionMismatch {
            expected: Version::V3,
            actual: other.version,
        }),
    }
}
