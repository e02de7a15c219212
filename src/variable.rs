//! Caller-facing variable bindings.
//!
//! [`SnmpVariable`] is what operations return: a display name, the instance
//! index, the value as text and its type. The decoded [`Value`] is kept
//! alongside for callers that want it typed.

use std::fmt;

use crate::mib::MibResolver;
use crate::oid::Oid;
use crate::strings::{is_printable, latin1, strip_non_printable};
use crate::value::{SnmpType, Value, format_timeticks};
use crate::varbind::VarBind;

/// Rendering toggles. None of these change what goes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayOptions {
    /// Full label path from the root instead of the last label.
    pub use_long_names: bool,
    /// Numeric OIDs only; no name lookups.
    pub use_numeric: bool,
    /// Format values the way `snmpget` prints them.
    pub use_sprint_value: bool,
    /// Replace enumerated INTEGERs with their labels.
    pub use_enums: bool,
    /// Non-zero allows loose name matching when resolving symbolic OIDs.
    pub best_guess: u8,
}

/// A variable binding as returned to callers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnmpVariable {
    /// Object name without the index (`sysDescr`, `.1.3.6.1.2.1.1.1`).
    pub oid: String,
    /// Instance index (`0`, `2.1`), if any.
    pub oid_index: Option<String>,
    /// Text form of the value. Sentinels and NULL carry none.
    pub value: Option<String>,
    pub snmp_type: Option<SnmpType>,
    /// Numeric OID the agent answered with.
    pub numeric_oid: Option<Oid>,
    /// Decoded value.
    pub raw: Option<Value>,
}

impl SnmpVariable {
    pub fn new(oid: impl Into<String>, oid_index: Option<String>) -> Self {
        Self {
            oid: oid.into(),
            oid_index,
            ..Self::default()
        }
    }

    /// Name and index joined with a dot.
    pub fn full_name(&self) -> String {
        match &self.oid_index {
            Some(index) => format!("{}.{}", self.oid, index),
            None => self.oid.clone(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.snmp_type.is_some_and(SnmpType::is_sentinel)
    }

    /// Render a wire binding.
    pub fn from_varbind(vb: &VarBind, resolver: &dyn MibResolver, display: &DisplayOptions) -> Self {
        let (oid, oid_index) = render_name(&vb.oid, resolver, display);
        Self {
            oid,
            oid_index,
            value: render_value(vb, resolver, display),
            snmp_type: Some(vb.snmp_type()),
            numeric_oid: Some(vb.oid.clone()),
            raw: Some(vb.value.clone()),
        }
    }
}

fn split_numeric(oid: &Oid) -> (String, Option<String>) {
    match oid.arcs().split_last() {
        Some((last, rest)) if !rest.is_empty() => {
            (Oid::from_slice(rest).to_dotted(), Some(last.to_string()))
        }
        _ => (oid.to_dotted(), None),
    }
}

fn join_arcs(arcs: &[u32]) -> Option<String> {
    if arcs.is_empty() {
        return None;
    }
    Some(arcs.iter().map(u32::to_string).collect::<Vec<_>>().join("."))
}

fn render_name(oid: &Oid, resolver: &dyn MibResolver, display: &DisplayOptions) -> (String, Option<String>) {
    if display.use_numeric {
        return split_numeric(oid);
    }
    let Some(node) = resolver.describe(oid) else {
        return split_numeric(oid);
    };
    let index = oid.suffix_after(&node.oid).and_then(join_arcs);
    let name = if display.use_long_names {
        resolver.long_name(oid).unwrap_or(node.label)
    } else {
        node.label
    };
    (name, index)
}

/// Hex in the `Hex-STRING` style: uppercase pairs separated by spaces.
fn spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_value(vb: &VarBind, resolver: &dyn MibResolver, display: &DisplayOptions) -> Option<String> {
    let sprint = display.use_sprint_value;
    let text = match &vb.value {
        Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => return None,
        Value::Integer(v) => match resolver.enum_label(&vb.oid, *v) {
            Some(label) if display.use_enums && sprint => format!("{}({})", label, v),
            Some(label) if display.use_enums => label,
            _ => v.to_string(),
        },
        Value::OctetString(data) if sprint => {
            let text = latin1(data);
            if text.chars().all(is_printable) {
                text
            } else {
                spaced_hex(data)
            }
        }
        Value::TimeTicks(t) if sprint => format_timeticks(*t),
        Value::ObjectIdentifier(oid) if sprint && !display.use_numeric => {
            let (name, index) = render_name(oid, resolver, display);
            match index {
                Some(index) => format!("{}.{}", name, index),
                None => name,
            }
        }
        other => other.to_text(),
    };
    Some(text)
}

/// Single-quoted literal with backslash escapes.
fn quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

impl fmt::Display for SnmpVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<oid={}", quoted(&self.oid))?;
        if let Some(index) = self.oid_index.as_deref().filter(|i| !i.is_empty()) {
            write!(f, ", oid_index={}", quoted(index))?;
        }
        if let Some(value) = self.value.as_deref() {
            let printable = strip_non_printable(value);
            if !printable.is_empty() {
                write!(f, ", value={}", quoted(&printable))?;
            }
        }
        if let Some(ty) = self.snmp_type {
            write!(f, ", snmp_type={}", quoted(ty.name()))?;
        }
        f.write_str(">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mib::StaticMib;
    use crate::oid;
    use bytes::Bytes;

    fn render(vb: VarBind, display: DisplayOptions) -> SnmpVariable {
        SnmpVariable::from_varbind(&vb, &StaticMib::standard(), &display)
    }

    #[test]
    fn test_symbolic_name_and_index() {
        let var = render(
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 3), Value::from("eth0")),
            DisplayOptions::default(),
        );
        assert_eq!(var.oid, "ifDescr");
        assert_eq!(var.oid_index.as_deref(), Some("3"));
        assert_eq!(var.value.as_deref(), Some("eth0"));
        assert_eq!(var.snmp_type, Some(SnmpType::OctetString));
        assert_eq!(var.full_name(), "ifDescr.3");
    }

    #[test]
    fn test_numeric_and_long_names() {
        let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("core"));
        let numeric = render(
            vb.clone(),
            DisplayOptions {
                use_numeric: true,
                ..Default::default()
            },
        );
        assert_eq!(numeric.oid, ".1.3.6.1.2.1.1.5");
        assert_eq!(numeric.oid_index.as_deref(), Some("0"));

        let long = render(
            vb,
            DisplayOptions {
                use_long_names: true,
                ..Default::default()
            },
        );
        assert_eq!(long.oid, "iso.org.dod.internet.mgmt.mib-2.system.sysName");

        // Nothing registered under 1.3.6.1.4.1.9: fall back to numbers.
        let unknown = render(
            VarBind::new(oid!(1, 3, 6, 1, 4, 1, 9, 9, 1), Value::Integer(1)),
            DisplayOptions::default(),
        );
        assert_eq!(unknown.oid, "enterprises");
        assert_eq!(unknown.oid_index.as_deref(), Some("9.9.1"));
    }

    #[test]
    fn test_enums_and_sprint() {
        let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 8, 1), Value::Integer(1));
        let plain = render(vb.clone(), DisplayOptions::default());
        assert_eq!(plain.value.as_deref(), Some("1"));

        let enums = DisplayOptions {
            use_enums: true,
            ..Default::default()
        };
        assert_eq!(render(vb.clone(), enums).value.as_deref(), Some("up"));

        let sprint = DisplayOptions {
            use_enums: true,
            use_sprint_value: true,
            ..Default::default()
        };
        assert_eq!(render(vb, sprint).value.as_deref(), Some("up(1)"));

        let mac = VarBind::new(
            oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 6, 1),
            Value::OctetString(Bytes::from_static(&[0x00, 0x1b, 0x21, 0xff])),
        );
        assert_eq!(render(mac, sprint).value.as_deref(), Some("00 1B 21 FF"));

        let uptime = VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(8_640_123));
        assert_eq!(render(uptime, sprint).value.as_deref(), Some("(8640123) 1:00:00:01.23"));
    }

    #[test]
    fn test_sentinels_carry_no_value() {
        let var = render(
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 99, 0), Value::NoSuchObject),
            DisplayOptions::default(),
        );
        assert_eq!(var.value, None);
        assert_eq!(var.snmp_type, Some(SnmpType::NoSuchObject));
        assert!(var.is_sentinel());
    }

    #[test]
    fn test_display() {
        let var = SnmpVariable {
            value: Some("Linux\u{1}".into()),
            snmp_type: Some(SnmpType::OctetString),
            ..SnmpVariable::new("sysDescr", Some("0".into()))
        };
        assert_eq!(
            var.to_string(),
            "<oid='sysDescr', oid_index='0', value='Linux (contains binary)', snmp_type='OCTETSTR'>"
        );
        assert_eq!(SnmpVariable::new("iso", None).to_string(), "<oid='iso'>");
    }
}
