//! SNMP value types.
//!
//! [`Value`] is the wire payload of a variable binding, including the three exception
//! sentinels. [`SnmpType`] names a value's type the way net-snmp does and converts
//! caller-supplied text into a [`Value`] for SET requests.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::strings::{from_hex, latin1, to_hex};

/// SNMP value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// INTEGER (signed 32-bit)
    Integer(i32),
    /// OCTET STRING
    OctetString(Bytes),
    /// NULL
    Null,
    /// OBJECT IDENTIFIER
    ObjectIdentifier(Oid),
    /// IpAddress (4 bytes, network order)
    IpAddress([u8; 4]),
    /// Counter32
    Counter32(u32),
    /// Gauge32 / Unsigned32
    Gauge32(u32),
    /// TimeTicks (hundredths of a second)
    TimeTicks(u32),
    /// Opaque
    Opaque(Bytes),
    /// Counter64 (not carried by SNMPv1)
    Counter64(u64),
    /// The object is not known to the agent.
    NoSuchObject,
    /// The object is known but this instance does not exist.
    NoSuchInstance,
    /// Nothing lexicographically follows the requested OID.
    EndOfMibView,
    /// Tag this crate does not interpret; kept as-is.
    Unknown { tag: u8, data: Bytes },
}

impl Value {
    /// Try to get as i32.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u64 (any unsigned type, or a non-negative INTEGER).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Counter64(v) => Some(*v),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(u64::from(*v)),
            Value::Integer(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Raw bytes of an OCTET STRING or Opaque.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(v) | Value::Opaque(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as OID.
    pub fn as_oid(&self) -> Option<&Oid> {
        match self {
            Value::ObjectIdentifier(oid) => Some(oid),
            _ => None,
        }
    }

    /// Try to get as IPv4 address.
    pub fn as_ip(&self) -> Option<Ipv4Addr> {
        match self {
            Value::IpAddress(bytes) => Some(Ipv4Addr::from(*bytes)),
            _ => None,
        }
    }

    /// Check if this is one of the exception sentinels.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// The type tag of this value.
    pub fn snmp_type(&self) -> SnmpType {
        match self {
            Value::Integer(_) => SnmpType::Integer,
            Value::OctetString(_) => SnmpType::OctetString,
            Value::Null => SnmpType::Null,
            Value::ObjectIdentifier(_) => SnmpType::ObjectIdentifier,
            Value::IpAddress(_) => SnmpType::IpAddress,
            Value::Counter32(_) => SnmpType::Counter32,
            Value::Gauge32(_) => SnmpType::Gauge32,
            Value::TimeTicks(_) => SnmpType::TimeTicks,
            Value::Opaque(_) => SnmpType::Opaque,
            Value::Counter64(_) => SnmpType::Counter64,
            Value::NoSuchObject => SnmpType::NoSuchObject,
            Value::NoSuchInstance => SnmpType::NoSuchInstance,
            Value::EndOfMibView => SnmpType::EndOfMibView,
            Value::Unknown { .. } => SnmpType::Other,
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(data) => buf.push_octet_string(data),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(data) => buf.push_tlv(tag::application::OPAQUE, data),
            Value::Counter64(v) => buf.push_counter64(*v),
            Value::NoSuchObject => buf.push_empty(tag::context::NO_SUCH_OBJECT),
            Value::NoSuchInstance => buf.push_empty(tag::context::NO_SUCH_INSTANCE),
            Value::EndOfMibView => buf.push_empty(tag::context::END_OF_MIB_VIEW),
            Value::Unknown { tag: t, data } => buf.push_tlv(*t, data),
        }
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let at = decoder.offset();
        let tag = decoder.read_tag()?;
        let len = decoder.read_length()?;

        let value = match tag {
            tag::universal::INTEGER => Value::Integer(decoder.read_integer_value(len)?),
            tag::universal::OCTET_STRING => Value::OctetString(decoder.read_bytes(len)?),
            tag::universal::NULL => {
                if len != 0 {
                    return Err(Error::decode(at, DecodeErrorKind::InvalidNull));
                }
                Value::Null
            }
            tag::universal::OBJECT_IDENTIFIER => {
                Value::ObjectIdentifier(decoder.read_oid_value(len)?)
            }
            tag::application::IP_ADDRESS => {
                if len != 4 {
                    return Err(Error::decode(
                        at,
                        DecodeErrorKind::InvalidIpAddressLength { length: len },
                    ));
                }
                let data = decoder.read_bytes(4)?;
                Value::IpAddress([data[0], data[1], data[2], data[3]])
            }
            tag::application::COUNTER32 => Value::Counter32(decoder.read_unsigned32_value(len)?),
            tag::application::GAUGE32 => Value::Gauge32(decoder.read_unsigned32_value(len)?),
            tag::application::TIMETICKS => Value::TimeTicks(decoder.read_unsigned32_value(len)?),
            tag::application::OPAQUE => Value::Opaque(decoder.read_bytes(len)?),
            tag::application::COUNTER64 => Value::Counter64(decoder.read_unsigned64_value(len)?),
            tag::context::NO_SUCH_OBJECT => {
                decoder.read_bytes(len)?;
                Value::NoSuchObject
            }
            tag::context::NO_SUCH_INSTANCE => {
                decoder.read_bytes(len)?;
                Value::NoSuchInstance
            }
            tag::context::END_OF_MIB_VIEW => {
                decoder.read_bytes(len)?;
                Value::EndOfMibView
            }
            tag::universal::OCTET_STRING_CONSTRUCTED => {
                return Err(Error::decode(at, DecodeErrorKind::ConstructedOctetString));
            }
            _ => Value::Unknown {
                tag,
                data: decoder.read_bytes(len)?,
            },
        };
        Ok(value)
    }

    /// Plain text form of the value, as the session reports it to callers.
    ///
    /// OCTET STRINGs are decoded as ISO-8859-1, OIDs use the leading-dot numeric form,
    /// sentinels render as their type name.
    pub fn to_text(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::OctetString(data) => latin1(data),
            Value::Null => String::new(),
            Value::ObjectIdentifier(oid) => oid.to_dotted(),
            Value::IpAddress(addr) => Ipv4Addr::from(*addr).to_string(),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => v.to_string(),
            Value::Opaque(data) => to_hex(data),
            Value::Counter64(v) => v.to_string(),
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
                self.snmp_type().name().to_owned()
            }
            Value::Unknown { data, .. } => to_hex(data),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::OctetString(data) => match std::str::from_utf8(data) {
                Ok(s) => f.write_str(s),
                Err(_) => write!(f, "0x{}", to_hex(data)),
            },
            Value::Null => f.write_str("NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::TimeTicks(v) => f.write_str(&format_timeticks(*v)),
            Value::Opaque(data) => write!(f, "Opaque(0x{})", to_hex(data)),
            Value::Unknown { tag, data } => {
                write!(f, "Unknown(tag=0x{:02X}, data=0x{})", tag, to_hex(data))
            }
            other => f.write_str(&other.to_text()),
        }
    }
}

/// Render TimeTicks the way net-snmp's sprint value does: `(n) d:hh:mm:ss.cc`.
pub fn format_timeticks(ticks: u32) -> String {
    let centis = ticks % 100;
    let secs = ticks / 100;
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let mins = (secs % 3600) / 60;
    format!(
        "({}) {}:{:02}:{:02}:{:02}.{:02}",
        ticks,
        days,
        hours,
        mins,
        secs % 60,
        centis
    )
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::ObjectIdentifier(oid)
    }
}

impl From<Ipv4Addr> for Value {
    fn from(addr: Ipv4Addr) -> Self {
        Value::IpAddress(addr.octets())
    }
}

/// The type of a variable binding, named as net-snmp names it.
///
/// Parsing accepts the long names (`INTEGER`, `OCTETSTR`, `OBJECTID`, ...) and the
/// one-letter codes `snmpset` uses (`i u s x o a c t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum SnmpType {
    Integer,
    OctetString,
    /// OCTET STRING whose text form is hex digits (`x`).
    HexString,
    ObjectIdentifier,
    IpAddress,
    Counter32,
    Gauge32,
    TimeTicks,
    Counter64,
    Opaque,
    Null,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// A tag outside the SMIv2 set.
    Other,
}

impl SnmpType {
    /// The net-snmp name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            SnmpType::Integer => "INTEGER",
            SnmpType::OctetString | SnmpType::HexString => "OCTETSTR",
            SnmpType::ObjectIdentifier => "OBJECTID",
            SnmpType::IpAddress => "IPADDR",
            SnmpType::Counter32 => "COUNTER",
            SnmpType::Gauge32 => "GAUGE",
            SnmpType::TimeTicks => "TICKS",
            SnmpType::Counter64 => "COUNTER64",
            SnmpType::Opaque => "OPAQUE",
            SnmpType::Null => "NULL",
            SnmpType::NoSuchObject => "NOSUCHOBJECT",
            SnmpType::NoSuchInstance => "NOSUCHINSTANCE",
            SnmpType::EndOfMibView => "ENDOFMIBVIEW",
            SnmpType::Other => "OTHER",
        }
    }

    /// Whether this is one of the exception sentinels.
    pub const fn is_sentinel(self) -> bool {
        matches!(
            self,
            SnmpType::NoSuchObject | SnmpType::NoSuchInstance | SnmpType::EndOfMibView
        )
    }

    /// Convert caller text into a value of this type.
    ///
    /// OBJECTID text must already be numeric; symbolic names are resolved by the session
    /// before this is called. Sentinels cannot be set.
    pub fn parse_value(self, text: &str) -> Result<Value> {
        let invalid = || Error::InvalidValue {
            value: text.to_owned(),
            snmp_type: self,
        };
        let trimmed = text.trim();
        let value = match self {
            SnmpType::Integer => Value::Integer(trimmed.parse().map_err(|_| invalid())?),
            SnmpType::OctetString => Value::OctetString(Bytes::copy_from_slice(text.as_bytes())),
            SnmpType::HexString => Value::OctetString(from_hex(text).ok_or_else(invalid)?.into()),
            SnmpType::ObjectIdentifier => {
                Value::ObjectIdentifier(Oid::parse(trimmed).map_err(|_| invalid())?)
            }
            SnmpType::IpAddress => {
                let addr: Ipv4Addr = trimmed.parse().map_err(|_| invalid())?;
                Value::IpAddress(addr.octets())
            }
            SnmpType::Counter32 => Value::Counter32(trimmed.parse().map_err(|_| invalid())?),
            SnmpType::Gauge32 => Value::Gauge32(trimmed.parse().map_err(|_| invalid())?),
            SnmpType::TimeTicks => Value::TimeTicks(trimmed.parse().map_err(|_| invalid())?),
            SnmpType::Counter64 => Value::Counter64(trimmed.parse().map_err(|_| invalid())?),
            SnmpType::Opaque => Value::Opaque(Bytes::copy_from_slice(text.as_bytes())),
            SnmpType::Null => Value::Null,
            SnmpType::NoSuchObject
            | SnmpType::NoSuchInstance
            | SnmpType::EndOfMibView
            | SnmpType::Other => return Err(invalid()),
        };
        Ok(value)
    }
}

impl fmt::Display for SnmpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SnmpType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let ty = match s.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INTEGER32" | "I" => SnmpType::Integer,
            "OCTETSTR" | "OCTET STRING" | "STRING" | "S" => SnmpType::OctetString,
            "X" => SnmpType::HexString,
            "OBJECTID" | "OBJECT IDENTIFIER" | "O" => SnmpType::ObjectIdentifier,
            "IPADDR" | "IPADDRESS" | "A" => SnmpType::IpAddress,
            "COUNTER" | "COUNTER32" | "C" => SnmpType::Counter32,
            "GAUGE" | "GAUGE32" | "UNSIGNED32" | "UINTEGER" | "U" => SnmpType::Gauge32,
            "TICKS" | "TIMETICKS" | "T" => SnmpType::TimeTicks,
            "COUNTER64" => SnmpType::Counter64,
            "OPAQUE" => SnmpType::Opaque,
            "NULL" => SnmpType::Null,
            _ => return Err(Error::config(format!("unknown SNMP type {:?}", s))),
        };
        Ok(ty)
    }
}
