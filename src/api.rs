//! One-shot operations: each call opens a session from `config`, runs one
//! operation and closes it.
//!
//! ```rust,no_run
//! use tdsnmp::{SessionConfig, snmp_get, snmp_walk};
//!
//! # async fn example() -> tdsnmp::Result<()> {
//! let config = SessionConfig::builder("192.0.2.1").version(2).build()?;
//! let contact = snmp_get(config.clone(), ["sysContact.0"]).await?;
//! let interfaces = snmp_walk(config, [("ifDescr", "")]).await?;
//! # let _ = (contact, interfaces);
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::normalize::OidSpec;
use crate::session::{Response, Session, SessionConfig, SetRequest};
use crate::value::SnmpType;
use crate::variable::SnmpVariable;

async fn with_session<F, Fut, R>(config: SessionConfig, op: F) -> Result<R>
where
    F: FnOnce(Session) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let session = Session::new(config);
    let result = op(session.clone()).await;
    session.close().await;
    result
}

/// GET one or more objects.
pub async fn snmp_get<I, S>(config: SessionConfig, oids: I) -> Result<Response>
where
    I: IntoIterator<Item = S>,
    S: Into<OidSpec>,
{
    with_session(config, |s| async move { s.get(oids).await }).await
}

/// SET one object; `true` when the agent accepted it.
pub async fn snmp_set(
    config: SessionConfig,
    oid: impl Into<OidSpec>,
    value: impl Into<String>,
    snmp_type: Option<SnmpType>,
) -> Result<bool> {
    let (oid, value) = (oid.into(), value.into());
    with_session(config, |s| async move { s.set(oid, value, snmp_type).await }).await
}

/// SET several objects in one request.
pub async fn snmp_set_multiple<I, R>(config: SessionConfig, items: I) -> Result<bool>
where
    I: IntoIterator<Item = R>,
    R: Into<SetRequest>,
{
    with_session(config, |s| async move { s.set_multiple(items).await }).await
}

/// GETNEXT for one or more objects.
pub async fn snmp_get_next<I, S>(config: SessionConfig, oids: I) -> Result<Response>
where
    I: IntoIterator<Item = S>,
    S: Into<OidSpec>,
{
    with_session(config, |s| async move { s.get_next(oids).await }).await
}

/// GETBULK. Fails on v1 before any network I/O.
pub async fn snmp_get_bulk<I, S>(
    config: SessionConfig,
    oids: I,
    non_repeaters: u32,
    max_repetitions: u32,
) -> Result<Vec<SnmpVariable>>
where
    I: IntoIterator<Item = S>,
    S: Into<OidSpec>,
{
    with_session(config, |s| async move {
        s.get_bulk(oids, non_repeaters, max_repetitions).await
    })
    .await
}

/// GETNEXT walk of each root.
pub async fn snmp_walk<I, S>(config: SessionConfig, oids: I) -> Result<Vec<SnmpVariable>>
where
    I: IntoIterator<Item = S>,
    S: Into<OidSpec>,
{
    with_session(config, |s| async move { s.walk(oids).await }).await
}

/// GETBULK walk of each root. Fails on v1 before any network I/O.
pub async fn snmp_bulkwalk<I, S>(
    config: SessionConfig,
    oids: I,
    non_repeaters: u32,
    max_repetitions: u32,
) -> Result<Vec<SnmpVariable>>
where
    I: IntoIterator<Item = S>,
    S: Into<OidSpec>,
{
    with_session(config, |s| async move {
        s.bulkwalk(oids, non_repeaters, max_repetitions).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn v1_config() -> SessionConfig {
        // Port 9 (discard) on loopback: nothing answers, but nothing is sent
        // either when the version check fails first.
        SessionConfig::builder("127.0.0.1:9")
            .version(1)
            .community("public")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_bulk_operations_refused_on_v1() {
        let err = snmp_get_bulk(v1_config(), ["sysDescr"], 0, 10).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 1, .. }));

        let err = snmp_bulkwalk(v1_config(), ["system"], 0, 10).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 1, .. }));
    }

    #[tokio::test]
    async fn test_unknown_name_fails_before_io() {
        let config = SessionConfig::builder("127.0.0.1:9").version(2).build().unwrap();
        let err = snmp_get(config, ["noSuchLabelAnywhere.0"]).await.unwrap_err();
        assert!(matches!(err, Error::UnknownObjectId { name } if name == "noSuchLabelAnywhere.0"));
    }
}
