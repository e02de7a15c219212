//! Splitting caller OID text into a name and an instance index.
//!
//! Callers name objects three ways: a string with an optional index suffix
//! (`"sysDescr.0"`), a `(name, index)` pair, or `"."` for the whole tree.

use std::fmt;

use crate::oid::Oid;
use crate::variable::SnmpVariable;

/// Caller-supplied object specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OidSpec {
    /// Name with any index still attached.
    Text(String),
    /// Name and index given separately.
    Indexed(String, String),
}

impl OidSpec {
    /// Split into `(name, index)`.
    pub fn normalize(&self) -> (String, Option<String>) {
        match self {
            OidSpec::Text(text) => normalize(text, None),
            OidSpec::Indexed(name, index) => normalize(name, Some(index)),
        }
    }
}

impl fmt::Display for OidSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OidSpec::Text(text) => f.write_str(text),
            OidSpec::Indexed(name, index) if index.is_empty() => f.write_str(name),
            OidSpec::Indexed(name, index) => write!(f, "{}.{}", name, index),
        }
    }
}

impl From<&str> for OidSpec {
    fn from(s: &str) -> Self {
        OidSpec::Text(s.to_owned())
    }
}

impl From<String> for OidSpec {
    fn from(s: String) -> Self {
        OidSpec::Text(s)
    }
}

impl From<&String> for OidSpec {
    fn from(s: &String) -> Self {
        OidSpec::Text(s.clone())
    }
}

impl From<Oid> for OidSpec {
    fn from(oid: Oid) -> Self {
        OidSpec::Text(oid.to_dotted())
    }
}

impl From<&Oid> for OidSpec {
    fn from(oid: &Oid) -> Self {
        OidSpec::Text(oid.to_dotted())
    }
}

impl<N: Into<String>> From<(N, &str)> for OidSpec {
    fn from((name, index): (N, &str)) -> Self {
        OidSpec::Indexed(name.into(), index.to_owned())
    }
}

impl<N: Into<String>> From<(N, String)> for OidSpec {
    fn from((name, index): (N, String)) -> Self {
        OidSpec::Indexed(name.into(), index)
    }
}

impl<N: Into<String>> From<(N, u32)> for OidSpec {
    fn from((name, index): (N, u32)) -> Self {
        OidSpec::Indexed(name.into(), index.to_string())
    }
}

/// Whether `label` is a symbolic OID component: word characters with `-` or
/// `:` allowed inside (`mib-2`, `SNMPv2-MIB::sysDescr`).
fn is_label(label: &str) -> bool {
    let word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last)) => {
            word(first)
                && word(last)
                && bytes.iter().all(|&b| word(b) || b == b'-' || b == b':')
                && !bytes.iter().all(u8::is_ascii_digit)
        }
        _ => false,
    }
}

fn non_empty(index: &str) -> Option<String> {
    (!index.is_empty()).then(|| index.to_owned())
}

/// Split an OID string into name and index.
///
/// - An explicit index wins and the name is taken as given. An empty
///   explicit index means no index at all.
/// - `"."` is the root: `("iso", None)`.
/// - Numeric OIDs keep everything but the last arc as the name.
/// - Symbolic OIDs keep the leading run of labels as the name; the rest,
///   after the separating dot, is the index.
/// - Anything else passes through unchanged with no index.
///
/// ```
/// use tdsnmp::normalize::normalize;
///
/// assert_eq!(normalize("sysContact.0", None), ("sysContact".into(), Some("0".into())));
/// assert_eq!(normalize(".", None), ("iso".into(), None));
/// assert_eq!(normalize("ifDescr", Some("3")), ("ifDescr".into(), Some("3".into())));
/// ```
pub fn normalize(oid: &str, explicit_index: Option<&str>) -> (String, Option<String>) {
    if let Some(index) = explicit_index {
        return (oid.to_owned(), non_empty(index));
    }
    if oid == "." {
        return ("iso".to_owned(), None);
    }

    if Oid::is_numeric_str(oid) {
        return match oid.rsplit_once('.') {
            Some((name, index)) if !name.is_empty() => (name.to_owned(), Some(index.to_owned())),
            _ => (oid.to_owned(), None),
        };
    }

    let (lead, body) = match oid.strip_prefix('.') {
        Some(rest) => (".", rest),
        None => ("", oid),
    };

    let mut name_len = 0;
    for part in body.split('.') {
        if !is_label(part) {
            break;
        }
        name_len += part.len() + 1;
    }
    if name_len == 0 {
        return (oid.to_owned(), None);
    }

    let name = &body[..name_len - 1];
    let index = body.get(name_len..).unwrap_or("");
    (format!("{}{}", lead, name), non_empty(index))
}

/// Build request variables from caller specifications, in order.
pub fn build_interface_vars<I, S>(oids: I) -> Vec<SnmpVariable>
where
    I: IntoIterator<Item = S>,
    S: Into<OidSpec>,
{
    oids.into_iter()
        .map(|spec| {
            let (oid, index) = spec.into().normalize();
            SnmpVariable::new(oid, index)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn split(s: &str) -> (String, Option<String>) {
        normalize(s, None)
    }

    #[test]
    fn test_symbolic() {
        assert_eq!(split("sysContact.0"), ("sysContact".into(), Some("0".into())));
        assert_eq!(split("ifDescr.1.2"), ("ifDescr".into(), Some("1.2".into())));
        assert_eq!(split("sysDescr"), ("sysDescr".into(), None));
        assert_eq!(
            split("SNMPv2-MIB::sysDescr.0"),
            ("SNMPv2-MIB::sysDescr".into(), Some("0".into()))
        );
        assert_eq!(split("iso.3.6.1"), ("iso".into(), Some("3.6.1".into())));
    }

    #[test]
    fn test_fully_qualified() {
        assert_eq!(
            split(".iso.org.dod.internet.mgmt.mib-2.system.sysContact.0"),
            (
                ".iso.org.dod.internet.mgmt.mib-2.system.sysContact".into(),
                Some("0".into())
            )
        );
    }

    #[test]
    fn test_numeric() {
        assert_eq!(
            split(".1.3.6.1.2.1.1.1.0"),
            (".1.3.6.1.2.1.1.1".into(), Some("0".into()))
        );
        assert_eq!(split("1.3.6.1"), ("1.3.6".into(), Some("1".into())));
        assert_eq!(split("1"), ("1".into(), None));
        assert_eq!(split(".1"), (".1".into(), None));
    }

    #[test]
    fn test_root_and_malformed() {
        assert_eq!(split("."), ("iso".into(), None));
        assert_eq!(split("!!bad"), ("!!bad".into(), None));
        assert_eq!(split(""), ("".into(), None));
        assert_eq!(split("sysDescr."), ("sysDescr".into(), None));
    }

    #[test]
    fn test_explicit_index_wins() {
        assert_eq!(normalize("sysDescr.0", Some("5")), ("sysDescr.0".into(), Some("5".into())));
    }

    #[test]
    fn test_empty_explicit_index_is_none() {
        assert_eq!(normalize("ifDescr", Some("")), ("ifDescr".into(), None));
        assert_eq!(OidSpec::from(("ifDescr", "")).normalize(), ("ifDescr".into(), None));
    }

    #[test]
    fn test_build_interface_vars() {
        let vars = build_interface_vars([OidSpec::from("sysContact.0"), OidSpec::from(("sysDescr", "0"))]);
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].oid, "sysContact");
        assert_eq!(vars[0].oid_index.as_deref(), Some("0"));
        assert_eq!(vars[1].oid, "sysDescr");
        assert_eq!(vars[1].oid_index.as_deref(), Some("0"));

        let root = build_interface_vars(["."]);
        assert_eq!(root[0].oid, "iso");
        assert_eq!(root[0].oid_index, None);
    }

    proptest! {
        #[test]
        fn prop_numeric_split_rejoins(arcs in prop::collection::vec(0u32..100_000, 2..20), dot in any::<bool>()) {
            let text = format!(
                "{}{}",
                if dot { "." } else { "" },
                arcs.iter().map(u32::to_string).collect::<Vec<_>>().join(".")
            );
            let (name, index) = normalize(&text, None);
            prop_assert_eq!(format!("{}.{}", name, index.unwrap()), text);
        }

        #[test]
        fn prop_symbolic_split_rejoins(label in "[a-z][a-zA-Z0-9]{1,12}", index in prop::collection::vec(0u32..1000, 1..5)) {
            let index = index.iter().map(u32::to_string).collect::<Vec<_>>().join(".");
            let text = format!("{}.{}", label, index);
            let (name, got) = normalize(&text, None);
            prop_assert_eq!(format!("{}.{}", name, got.unwrap()), text);
        }
    }
}
