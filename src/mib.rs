//! Name service: symbolic names to numeric OIDs and back.
//!
//! Sessions consult a [`MibResolver`] only to translate names for the wire and
//! numbers for display. No MIB files are parsed here; [`StaticMib`] is an
//! in-memory table that callers fill (or take [`StaticMib::standard`]).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::oid::Oid;
use crate::value::SnmpType;

/// A registered node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MibNode {
    pub label: String,
    pub oid: Oid,
}

/// Two-way name lookup consumed by the session.
pub trait MibResolver: Send + Sync + fmt::Debug {
    /// Numeric OID of a label (`sysDescr`), module-qualified label
    /// (`SNMPv2-MIB::sysDescr`) or dotted label path (`.iso.org.dod`).
    fn resolve(&self, name: &str) -> Option<Oid>;

    /// Deepest registered node that `oid` is inside.
    fn describe(&self, oid: &Oid) -> Option<MibNode>;

    /// Declared syntax of the object at `oid`, used to type SET values.
    fn syntax(&self, _oid: &Oid) -> Option<SnmpType> {
        None
    }

    /// Enumeration label of an INTEGER value.
    fn enum_label(&self, _oid: &Oid, _value: i32) -> Option<String> {
        None
    }

    /// Looser lookup used when best-guess matching is enabled.
    fn resolve_fuzzy(&self, name: &str) -> Option<Oid> {
        self.resolve(name)
    }

    /// Dotted label path from the root, numbers where no label is known
    /// (`iso.org.dod.internet.mgmt.mib-2.system.sysDescr`).
    fn long_name(&self, oid: &Oid) -> Option<String> {
        let node = self.describe(oid)?;
        let arcs = node.oid.arcs();
        let mut parts = Vec::with_capacity(arcs.len());
        for len in 1..=arcs.len() {
            let prefix = Oid::from_slice(&arcs[..len]);
            match self.describe(&prefix) {
                Some(n) if n.oid == prefix => parts.push(n.label),
                _ => parts.push(arcs[len - 1].to_string()),
            }
        }
        Some(parts.join("."))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    label: String,
    syntax: Option<SnmpType>,
    enums: Vec<(i32, String)>,
}

/// In-memory table of nodes.
#[derive(Debug, Clone, Default)]
pub struct StaticMib {
    by_oid: BTreeMap<Oid, Entry>,
    by_label: HashMap<String, Oid>,
}

impl StaticMib {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. A later registration of the same label wins.
    pub fn insert(&mut self, label: &str, oid: Oid, syntax: Option<SnmpType>) -> &mut Self {
        self.by_label.insert(label.to_owned(), oid.clone());
        self.by_oid.insert(
            oid,
            Entry {
                label: label.to_owned(),
                syntax,
                enums: Vec::new(),
            },
        );
        self
    }

    /// Attach INTEGER enumeration labels to an already registered node.
    pub fn insert_enums(&mut self, label: &str, enums: &[(i32, &str)]) -> &mut Self {
        if let Some(entry) = self
            .by_label
            .get(label)
            .and_then(|oid| self.by_oid.get_mut(oid))
        {
            entry.enums = enums.iter().map(|(v, l)| (*v, (*l).to_owned())).collect();
        }
        self
    }

    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }

    fn entry_for(&self, oid: &Oid) -> Option<(&Oid, &Entry)> {
        let arcs = oid.arcs();
        (1..=arcs.len()).rev().find_map(|len| {
            self.by_oid
                .get_key_value(&Oid::from_slice(&arcs[..len]))
        })
    }

    /// The root of the tree plus SNMPv2-MIB `system` and IF-MIB `interfaces`.
    pub fn standard() -> Self {
        use SnmpType::*;

        let mut mib = Self::new();
        let mib2 = [1, 3, 6, 1, 2, 1];
        let under = |suffix: &[u32]| Oid::from_slice(&mib2).extend_from(suffix);

        mib.insert("iso", Oid::from_slice(&[1]), None)
            .insert("org", Oid::from_slice(&[1, 3]), None)
            .insert("dod", Oid::from_slice(&[1, 3, 6]), None)
            .insert("internet", Oid::from_slice(&[1, 3, 6, 1]), None)
            .insert("mgmt", Oid::from_slice(&[1, 3, 6, 1, 2]), None)
            .insert("mib-2", Oid::from_slice(&mib2), None)
            .insert("private", Oid::from_slice(&[1, 3, 6, 1, 4]), None)
            .insert("enterprises", Oid::from_slice(&[1, 3, 6, 1, 4, 1]), None)
            .insert("snmpV2", Oid::from_slice(&[1, 3, 6, 1, 6]), None);

        mib.insert("system", under(&[1]), None)
            .insert("sysDescr", under(&[1, 1]), Some(OctetString))
            .insert("sysObjectID", under(&[1, 2]), Some(ObjectIdentifier))
            .insert("sysUpTime", under(&[1, 3]), Some(TimeTicks))
            .insert("sysContact", under(&[1, 4]), Some(OctetString))
            .insert("sysName", under(&[1, 5]), Some(OctetString))
            .insert("sysLocation", under(&[1, 6]), Some(OctetString))
            .insert("sysServices", under(&[1, 7]), Some(Integer))
            .insert("sysORLastChange", under(&[1, 8]), Some(TimeTicks));

        mib.insert("interfaces", under(&[2]), None)
            .insert("ifNumber", under(&[2, 1]), Some(Integer))
            .insert("ifTable", under(&[2, 2]), None)
            .insert("ifEntry", under(&[2, 2, 1]), None)
            .insert("ifIndex", under(&[2, 2, 1, 1]), Some(Integer))
            .insert("ifDescr", under(&[2, 2, 1, 2]), Some(OctetString))
            .insert("ifType", under(&[2, 2, 1, 3]), Some(Integer))
            .insert("ifMtu", under(&[2, 2, 1, 4]), Some(Integer))
            .insert("ifSpeed", under(&[2, 2, 1, 5]), Some(Gauge32))
            .insert("ifPhysAddress", under(&[2, 2, 1, 6]), Some(OctetString))
            .insert("ifAdminStatus", under(&[2, 2, 1, 7]), Some(Integer))
            .insert("ifOperStatus", under(&[2, 2, 1, 8]), Some(Integer))
            .insert("ifLastChange", under(&[2, 2, 1, 9]), Some(TimeTicks))
            .insert("ifInOctets", under(&[2, 2, 1, 10]), Some(Counter32))
            .insert("ifOutOctets", under(&[2, 2, 1, 16]), Some(Counter32));

        let status = [(1, "up"), (2, "down"), (3, "testing")];
        mib.insert_enums("ifAdminStatus", &status)
            .insert_enums("ifOperStatus", &status);
        mib
    }
}

/// Drop a `MODULE::` qualifier.
fn strip_module(name: &str) -> &str {
    name.rsplit_once("::").map_or(name, |(_, label)| label)
}

impl MibResolver for StaticMib {
    fn resolve(&self, name: &str) -> Option<Oid> {
        let name = strip_module(name).trim_start_matches('.');
        if name.is_empty() {
            return None;
        }
        if Oid::is_numeric_str(name) {
            return Oid::parse(name).ok();
        }

        // The last label anchors the lookup; numeric arcs after it are appended.
        let parts: Vec<&str> = name.split('.').collect();
        let anchor = parts
            .iter()
            .rposition(|p| !p.bytes().all(|b| b.is_ascii_digit()))?;
        let base = self.by_label.get(parts[anchor])?;
        let mut arcs = Vec::with_capacity(parts.len() - anchor - 1);
        for part in &parts[anchor + 1..] {
            arcs.push(part.parse::<u32>().ok()?);
        }
        Some(base.extend_from(&arcs))
    }

    fn describe(&self, oid: &Oid) -> Option<MibNode> {
        self.entry_for(oid).map(|(node_oid, entry)| MibNode {
            label: entry.label.clone(),
            oid: node_oid.clone(),
        })
    }

    fn syntax(&self, oid: &Oid) -> Option<SnmpType> {
        self.entry_for(oid).and_then(|(_, entry)| entry.syntax)
    }

    fn enum_label(&self, oid: &Oid, value: i32) -> Option<String> {
        let (_, entry) = self.entry_for(oid)?;
        entry
            .enums
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, label)| label.clone())
    }

    fn resolve_fuzzy(&self, name: &str) -> Option<Oid> {
        if let Some(oid) = self.resolve(name) {
            return Some(oid);
        }
        let wanted = strip_module(name).trim_start_matches('.').to_ascii_lowercase();
        let mut candidates: Vec<(&String, &Oid)> = self
            .by_label
            .iter()
            .filter(|(label, _)| label.to_ascii_lowercase().contains(&wanted))
            .collect();
        // Prefer the shortest (closest) label, then the lowest OID.
        candidates.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.1.cmp(b.1)));
        candidates.first().map(|(_, oid)| (*oid).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_resolve_forms() {
        let mib = StaticMib::standard();
        assert_eq!(mib.resolve("sysDescr"), Some(oid!(1, 3, 6, 1, 2, 1, 1, 1)));
        assert_eq!(mib.resolve("SNMPv2-MIB::sysContact"), Some(oid!(1, 3, 6, 1, 2, 1, 1, 4)));
        assert_eq!(
            mib.resolve(".iso.org.dod.internet.mgmt.mib-2.system"),
            Some(oid!(1, 3, 6, 1, 2, 1, 1))
        );
        assert_eq!(mib.resolve("iso.3.6.1"), Some(oid!(1, 3, 6, 1)));
        assert_eq!(mib.resolve(".1.3.6.1.2.1"), Some(oid!(1, 3, 6, 1, 2, 1)));
        assert_eq!(mib.resolve("notAnObject"), None);
    }

    #[test]
    fn test_describe_longest_prefix() {
        let mib = StaticMib::standard();
        let node = mib.describe(&oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 3)).unwrap();
        assert_eq!(node.label, "ifDescr");
        assert_eq!(node.oid, oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2));
        assert!(mib.describe(&oid!(2, 5)).is_none());
    }

    #[test]
    fn test_long_name() {
        let mib = StaticMib::standard();
        assert_eq!(
            mib.long_name(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).as_deref(),
            Some("iso.org.dod.internet.mgmt.mib-2.system.sysDescr")
        );
    }

    #[test]
    fn test_syntax_and_enums() {
        let mib = StaticMib::standard();
        let oper = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8, 1);
        assert_eq!(mib.syntax(&oper), Some(SnmpType::Integer));
        assert_eq!(mib.enum_label(&oper, 2).as_deref(), Some("down"));
        assert_eq!(mib.enum_label(&oper, 9), None);
    }

    #[test]
    fn test_fuzzy() {
        let mib = StaticMib::standard();
        assert_eq!(mib.resolve_fuzzy("sysdescr"), Some(oid!(1, 3, 6, 1, 2, 1, 1, 1)));
        assert_eq!(mib.resolve_fuzzy("OperStat"), Some(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8)));
    }
}
