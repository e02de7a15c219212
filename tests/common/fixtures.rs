//! Common OIDs, configurations and sessions.

use std::time::Duration;

use tdsnmp::transport::MockTransport;
use tdsnmp::{Oid, Session, SessionConfig, SessionConfigBuilder, Value, oid};

use super::Agent;

pub fn sys_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)
}
pub fn sys_object_id() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 2, 0)
}
pub fn sys_uptime() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}
pub fn sys_contact() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 4, 0)
}
pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}
pub fn sys_location() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 6, 0)
}

pub fn if_descr(index: u32) -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, index)
}
pub fn if_oper_status(index: u32) -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8, index)
}

/// Under `enterprises`, after everything in `mib-2`.
pub fn enterprise_leaf() -> Oid {
    oid!(1, 3, 6, 1, 4, 1, 9999, 1, 0)
}

/// A small router: the `system` group, two interfaces and one enterprise leaf.
pub fn router(community: &str) -> Agent {
    Agent::new(community)
        .with(sys_descr(), Value::from("Linux core-sw1 6.1.0"))
        .with(sys_object_id(), Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1, 8072, 3, 2, 10)))
        .with(sys_uptime(), Value::TimeTicks(123_456))
        .with(sys_contact(), Value::from("noc@example.net"))
        .with(sys_name(), Value::from("core-sw1"))
        .with(sys_location(), Value::from("rack 4"))
        .with(if_descr(1), Value::from("lo"))
        .with(if_descr(2), Value::from("eth0"))
        .with(if_oper_status(1), Value::Integer(1))
        .with(if_oper_status(2), Value::Integer(2))
        .with(enterprise_leaf(), Value::Integer(7))
        .read_only(sys_descr())
}

/// Send library logs to the test harness. `RUST_LOG=tdsnmp=trace` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short timeout and no retransmissions; tests opt into retries.
pub fn config(version: u8) -> SessionConfigBuilder {
    SessionConfig::builder("127.0.0.1")
        .version(version)
        .community("public")
        .timeout(Duration::from_millis(50))
        .retries(0)
}

pub fn mock() -> MockTransport {
    MockTransport::new("127.0.0.1:161".parse().unwrap())
}

/// A session over a mock answered by [`router`].
pub fn router_session(builder: SessionConfigBuilder) -> (Session<MockTransport>, MockTransport) {
    init_tracing();
    let mut mock = mock();
    router("public").serve(&mut mock);
    let session = Session::with_transport(builder.build().unwrap(), mock.clone());
    (session, mock)
}
