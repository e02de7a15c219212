//! Sentinel checks for sessions that abort on nonexistent objects.

use crate::error::{Error, Result};
use crate::value::SnmpType;
use crate::variable::SnmpVariable;

/// Fail on the first noSuchObject or noSuchInstance binding, in order.
///
/// endOfMibView is left alone; it marks the end of a traversal rather than a
/// missing object.
pub fn validate(variables: &[SnmpVariable]) -> Result<()> {
    for var in variables {
        match var.snmp_type {
            Some(SnmpType::NoSuchObject) => {
                tracing::debug!(target: "tdsnmp::session", { snmp.oid = %var.full_name() }, "no such object");
                return Err(Error::NoSuchObject { oid: var.to_string() });
            }
            Some(SnmpType::NoSuchInstance) => {
                tracing::debug!(target: "tdsnmp::session", { snmp.oid = %var.full_name() }, "no such instance");
                return Err(Error::NoSuchInstance { oid: var.to_string() });
            }
            _ => {}
        }
    }
    Ok(())
}
