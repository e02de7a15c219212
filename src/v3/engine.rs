//! Authoritative engine state and Report PDU handling (RFC 3414 Section 4).
//!
//! A session learns the agent's engine id, boots and time either from a
//! discovery round trip or from configuration, then tracks time locally so
//! every request lands inside the agent's 150 second window.

use std::time::Instant;

use bytes::Bytes;

use super::UsmSecurityParams;
use crate::error::{AuthErrorKind, CryptoErrorKind, Error, Result};
use crate::oid::Oid;
use crate::pdu::Pdu;

/// Accepted skew between our estimate of engine time and the agent's clock.
pub const TIME_WINDOW: u32 = 150;

/// snmpEngineTime and snmpEngineBoots saturate here.
pub const MAX_ENGINE_TIME: u32 = 2_147_483_647;

/// usmStats counters carried by Report PDUs.
pub mod report_oids {
    use crate::oid;
    use crate::oid::Oid;

    pub fn unsupported_sec_levels() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 1, 0)
    }

    pub fn not_in_time_windows() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 2, 0)
    }

    pub fn unknown_user_names() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 3, 0)
    }

    pub fn unknown_engine_ids() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 4, 0)
    }

    pub fn wrong_digests() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 5, 0)
    }

    pub fn decryption_errors() -> Oid {
        oid!(1, 3, 6, 1, 6, 3, 15, 1, 1, 6, 0)
    }
}

/// Which usmStats counter a Report carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    UnsupportedSecLevel,
    NotInTimeWindow,
    UnknownUserName,
    UnknownEngineId,
    WrongDigest,
    DecryptionError,
    /// A report we do not interpret (e.g. an MPD or VACM counter).
    Other,
}

impl ReportKind {
    /// The error a caller sees when this report ends an exchange.
    pub fn into_error(self, oid: Option<&Oid>) -> Error {
        match self {
            Self::UnsupportedSecLevel => Error::auth(AuthErrorKind::UnsupportedSecurityLevel),
            Self::NotInTimeWindow => Error::NotInTimeWindow,
            Self::UnknownUserName => Error::auth(AuthErrorKind::UnknownUserName),
            Self::UnknownEngineId => Error::UnknownEngineId,
            Self::WrongDigest => Error::auth(AuthErrorKind::WrongDigest),
            Self::DecryptionError => Error::decrypt(CryptoErrorKind::AgentDecryptionError),
            Self::Other => Error::Snmp {
                status: crate::error::ErrorStatus::GenErr,
                index: 0,
                oid: oid.cloned(),
            },
        }
    }
}

/// Classify a Report PDU by its first binding.
pub fn classify_report(pdu: &Pdu) -> ReportKind {
    let Some(vb) = pdu.varbinds.first() else {
        return ReportKind::Other;
    };
    let table = [
        (report_oids::unsupported_sec_levels(), ReportKind::UnsupportedSecLevel),
        (report_oids::not_in_time_windows(), ReportKind::NotInTimeWindow),
        (report_oids::unknown_user_names(), ReportKind::UnknownUserName),
        (report_oids::unknown_engine_ids(), ReportKind::UnknownEngineId),
        (report_oids::wrong_digests(), ReportKind::WrongDigest),
        (report_oids::decryption_errors(), ReportKind::DecryptionError),
    ];
    table
        .into_iter()
        .find(|(oid, _)| *oid == vb.oid)
        .map(|(_, kind)| kind)
        .unwrap_or(ReportKind::Other)
}

/// What we know about the authoritative engine.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub engine_id: Bytes,
    pub engine_boots: u32,
    pub engine_time: u32,
    /// When `engine_time` was last set.
    pub synced_at: Instant,
    /// Highest time seen in this boot cycle.
    pub latest_received_engine_time: u32,
    pub msg_max_size: u32,
}

impl EngineState {
    pub fn new(engine_id: Bytes, engine_boots: u32, engine_time: u32) -> Self {
        Self {
            engine_id,
            engine_boots,
            engine_time,
            synced_at: Instant::now(),
            latest_received_engine_time: engine_time,
            msg_max_size: crate::message::MAX_MSG_SIZE as u32,
        }
    }

    /// Build state from the USM parameters of a discovery Report.
    pub fn from_discovery(usm: &UsmSecurityParams, msg_max_size: i32) -> Result<Self> {
        if usm.engine_id.is_empty() {
            tracing::debug!(target: "tdsnmp::v3", "discovery reply carried no engine id");
            return Err(Error::UnknownEngineId);
        }
        let mut state = Self::new(usm.engine_id.clone(), usm.engine_boots, usm.engine_time);
        state.msg_max_size = u32::try_from(msg_max_size)
            .unwrap_or(state.msg_max_size)
            .min(state.msg_max_size);
        Ok(state)
    }

    /// Engine time advanced by the local clock since the last sync.
    pub fn estimated_time(&self) -> u32 {
        let elapsed = u32::try_from(self.synced_at.elapsed().as_secs()).unwrap_or(u32::MAX);
        self.engine_time.saturating_add(elapsed).min(MAX_ENGINE_TIME)
    }

    /// Accept newer boots/time from an authenticated message (RFC 3414 3.2 step 7b).
    ///
    /// Returns whether anything changed.
    pub fn update_time(&mut self, boots: u32, time: u32) -> bool {
        let newer = boots > self.engine_boots
            || (boots == self.engine_boots && time > self.latest_received_engine_time);
        if newer {
            self.engine_boots = boots;
            self.engine_time = time;
            self.synced_at = Instant::now();
            self.latest_received_engine_time = time;
        }
        newer
    }

    /// Unconditionally adopt the agent's clock, as after a notInTimeWindow report.
    pub fn resync(&mut self, boots: u32, time: u32) {
        self.engine_boots = boots;
        self.engine_time = time;
        self.synced_at = Instant::now();
        self.latest_received_engine_time = time;
    }

    /// Whether an authenticated message claiming this engine's clock is
    /// fresh enough to accept (RFC 3414 3.2 step 7b).
    ///
    /// The engine id must match, boots must not have gone backwards or hit
    /// the ceiling, and within the same boot cycle the time may trail the
    /// latest seen by at most [`TIME_WINDOW`] seconds.
    pub fn is_in_time_window(&self, engine_id: &[u8], boots: u32, time: u32) -> bool {
        if engine_id != self.engine_id.as_ref() {
            return false;
        }
        if boots == MAX_ENGINE_TIME || self.engine_boots == MAX_ENGINE_TIME || boots < self.engine_boots {
            return false;
        }
        boots > self.engine_boots || time.saturating_add(TIME_WINDOW) >= self.latest_received_engine_time
    }
}
