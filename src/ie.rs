//! Information Element registry and typed field values.
//!
//! IPFIX Templates describe records in terms of Information Elements (IEs):
//! enterprise-qualified numeric field identifiers with a name and a data
//! type. Templates carry the numeric id and wire length; the Collecting
//! Process needs a registry mapping those ids back to names and types to
//! produce anything more useful than raw bytes.
//!
//! This module is a deliberately partial stand-in for the real IANA IE
//! registry (a full registry is out of scope — see `DESIGN.md`): it carries
//! a representative subset of commonly exported IEs plus an API for
//! registering enterprise-specific fields.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::error::{DecodeError, Overflow};

/// The parsed representation of an IE's value, typed per its [`FieldDataType`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Float64(f64),
    Boolean(bool),
    String(String),
    Ipv4Addr(Ipv4Addr),
    Ipv6Addr(Ipv6Addr),
    MacAddr([u8; 6]),
    DateTimeSeconds(SystemTime),
    DateTimeMillis(SystemTime),
    DateTimeMicros(SystemTime),
    DateTimeNanos(SystemTime),
    Octets(Vec<u8>),
}

/// How to interpret and how many octets a fixed-length IE occupies by
/// default (Templates may still request a shorter, reduced-length encoding
/// for the numeric kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldDataType {
    Unsigned,
    Signed,
    Float64,
    Boolean,
    String,
    Ipv4Addr,
    Ipv6Addr,
    MacAddr,
    DateTimeSeconds,
    DateTimeMillis,
    DateTimeMicros,
    DateTimeNanos,
    Octets,
}

fn write_checked(buf: &mut [u8], offset: usize, data: &[u8]) -> Result<usize, Overflow> {
    let end = offset.checked_add(data.len()).ok_or(Overflow)?;
    if end > buf.len() {
        return Err(Overflow);
    }
    buf[offset..end].copy_from_slice(data);
    Ok(end)
}

fn take_checked(buf: &[u8], offset: usize, len: usize) -> Result<&[u8], DecodeError> {
    let end = offset.checked_add(len).ok_or(DecodeError::RecordOverrunsSet {
        offset,
        set_end: buf.len(),
    })?;
    buf.get(offset..end)
        .ok_or(DecodeError::RecordOverrunsSet { offset, set_end: buf.len() })
}

/// Reads a big-endian unsigned integer of `len` octets (1..=8), supporting
/// IPFIX's reduced-length encoding for numeric IEs.
fn read_be_uint(bytes: &[u8]) -> u64 {
    let mut acc: u64 = 0;
    for b in bytes {
        acc = (acc << 8) | u64::from(*b);
    }
    acc
}

fn write_be_uint(value: u64, len: usize, buf: &mut [u8], offset: usize) -> Result<usize, Overflow> {
    if len > 8 {
        return Err(Overflow);
    }
    let mut tmp = [0u8; 8];
    tmp.copy_from_slice(&value.to_be_bytes());
    write_checked(buf, offset, &tmp[8 - len..])
}

impl FieldValue {
    /// Decodes a value of `data_type` occupying exactly `length` octets at
    /// `offset`, returning the value and the offset just past it.
    pub fn decode(
        buf: &[u8],
        offset: usize,
        data_type: FieldDataType,
        length: u16,
    ) -> Result<(FieldValue, usize), DecodeError> {
        let length = usize::from(length);
        let bytes = take_checked(buf, offset, length)?;
        let new_offset = offset + length;
        let value = match data_type {
            FieldDataType::Unsigned => FieldValue::Unsigned(read_be_uint(bytes)),
            FieldDataType::Signed => {
                let raw = read_be_uint(bytes);
                let shift = 64 - 8 * length.min(8);
                // sign-extend from the `length`-octet field
                let signed = ((raw << shift) as i64) >> shift;
                FieldValue::Signed(signed)
            }
            FieldDataType::Float64 => {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| DecodeError::RecordOverrunsSet { offset, set_end: buf.len() })?;
                FieldValue::Float64(f64::from_be_bytes(arr))
            }
            FieldDataType::Boolean => FieldValue::Boolean(bytes.first() == Some(&1)),
            FieldDataType::String => {
                FieldValue::String(String::from_utf8_lossy(bytes).into_owned())
            }
            FieldDataType::Ipv4Addr => {
                let arr: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| DecodeError::RecordOverrunsSet { offset, set_end: buf.len() })?;
                FieldValue::Ipv4Addr(Ipv4Addr::from(arr))
            }
            FieldDataType::Ipv6Addr => {
                let arr: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| DecodeError::RecordOverrunsSet { offset, set_end: buf.len() })?;
                FieldValue::Ipv6Addr(Ipv6Addr::from(arr))
            }
            FieldDataType::MacAddr => {
                let arr: [u8; 6] = bytes
                    .try_into()
                    .map_err(|_| DecodeError::RecordOverrunsSet { offset, set_end: buf.len() })?;
                FieldValue::MacAddr(arr)
            }
            FieldDataType::DateTimeSeconds => {
                let secs = read_be_uint(bytes);
                FieldValue::DateTimeSeconds(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            }
            FieldDataType::DateTimeMillis => {
                let millis = read_be_uint(bytes);
                FieldValue::DateTimeMillis(SystemTime::UNIX_EPOCH + Duration::from_millis(millis))
            }
            FieldDataType::DateTimeMicros => {
                let micros = read_be_uint(bytes);
                FieldValue::DateTimeMicros(SystemTime::UNIX_EPOCH + Duration::from_micros(micros))
            }
            FieldDataType::DateTimeNanos => {
                let nanos = read_be_uint(bytes);
                FieldValue::DateTimeNanos(SystemTime::UNIX_EPOCH + Duration::from_nanos(nanos))
            }
            FieldDataType::Octets => FieldValue::Octets(bytes.to_vec()),
        };
        Ok((value, new_offset))
    }

    /// Encodes this value into exactly `length` octets at `offset`.
    pub fn encode(&self, buf: &mut [u8], offset: usize, length: u16) -> Result<usize, Overflow> {
        let length = usize::from(length);
        match self {
            FieldValue::Unsigned(v) => write_be_uint(*v, length, buf, offset),
            FieldValue::Signed(v) => write_be_uint(*v as u64, length, buf, offset),
            FieldValue::Float64(v) => write_checked(buf, offset, &v.to_be_bytes()),
            FieldValue::Boolean(v) => write_checked(buf, offset, &[u8::from(*v)]),
            FieldValue::String(s) => {
                let mut padded = s.clone().into_bytes();
                padded.resize(length, 0);
                write_checked(buf, offset, &padded)
            }
            FieldValue::Ipv4Addr(ip) => write_checked(buf, offset, &ip.octets()),
            FieldValue::Ipv6Addr(ip) => write_checked(buf, offset, &ip.octets()),
            FieldValue::MacAddr(mac) => write_checked(buf, offset, mac),
            FieldValue::DateTimeSeconds(t) => {
                write_be_uint(duration_since_epoch(*t).as_secs(), length, buf, offset)
            }
            FieldValue::DateTimeMillis(t) => {
                write_be_uint(duration_since_epoch(*t).as_millis() as u64, length, buf, offset)
            }
            FieldValue::DateTimeMicros(t) => {
                write_be_uint(duration_since_epoch(*t).as_micros() as u64, length, buf, offset)
            }
            FieldValue::DateTimeNanos(t) => {
                write_be_uint(duration_since_epoch(*t).as_nanos() as u64, length, buf, offset)
            }
            FieldValue::Octets(v) => {
                let mut padded = v.clone();
                padded.resize(length, 0);
                write_checked(buf, offset, &padded)
            }
        }
    }
}

fn duration_since_epoch(t: SystemTime) -> Duration {
    t.duration_since(SystemTime::UNIX_EPOCH).unwrap_or(Duration::ZERO)
}

/// A wire key identifying an Information Element: its IANA (or vendor)
/// number, qualified by an enterprise number (`0` for IANA-standard IEs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IeKey {
    pub enterprise_number: u32,
    pub number: u16,
}

impl IeKey {
    pub fn iana(number: u16) -> Self {
        IeKey { enterprise_number: 0, number }
    }
}

/// A named, typed Information Element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InformationElement {
    pub name: String,
    pub key: IeKey,
    pub data_type: FieldDataType,
    /// The wire length this IE occupies absent an explicit reduced-length
    /// encoding request. IANA assigns this per-element, not purely per type
    /// (e.g. `packetDeltaCount` is an 8-octet unsigned64, `ingressInterface`
    /// a 4-octet unsigned32), so it is not derived from `data_type` alone.
    pub default_length: u16,
}

impl InformationElement {
    fn iana(name: &str, number: u16, data_type: FieldDataType, default_length: u16) -> Self {
        InformationElement { name: name.to_string(), key: IeKey::iana(number), data_type, default_length }
    }

    /// A placeholder for an IE whose number isn't present in the registry.
    /// Preserves the wire key so withdrawal/re-encoding still round-trips;
    /// decodes as raw octets.
    pub fn unknown(key: IeKey) -> Self {
        InformationElement {
            name: format!("unknown({}/{})", key.enterprise_number, key.number),
            key,
            data_type: FieldDataType::Octets,
            default_length: 0,
        }
    }
}

/// A lookup table from [`IeKey`] (and from name) to [`InformationElement`].
///
/// Carries a representative subset of the IANA registry (enough to express
/// the common flow-record fields) plus whatever enterprise fields a caller
/// registers. Not a full IANA default-loading implementation — that is
/// explicitly out of scope for this crate, see `DESIGN.md`.
#[derive(Debug, Clone)]
pub struct InformationElementRegistry {
    by_key: BTreeMap<IeKey, InformationElement>,
    by_name: BTreeMap<String, IeKey>,
}

impl Default for InformationElementRegistry {
    fn default() -> Self {
        Self::iana_default()
    }
}

impl InformationElementRegistry {
    pub fn new() -> Self {
        InformationElementRegistry { by_key: BTreeMap::new(), by_name: BTreeMap::new() }
    }

    /// A registry preloaded with a representative subset of IANA-standard
    /// Information Elements, covering the fields used throughout this
    /// crate's tests and the common flow-export 5-tuple.
    pub fn iana_default() -> Self {
        let mut reg = Self::new();
        for ie in iana_subset() {
            reg.register(ie);
        }
        reg
    }

    pub fn register(&mut self, ie: InformationElement) {
        self.by_name.insert(ie.name.clone(), ie.key);
        self.by_key.insert(ie.key, ie);
    }

    pub fn get_by_key(&self, key: IeKey) -> Option<&InformationElement> {
        self.by_key.get(&key)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&InformationElement> {
        self.by_name.get(name).and_then(|key| self.by_key.get(key))
    }

    /// Resolves `key` to a registered IE, falling back to a synthetic
    /// [`InformationElement::unknown`] placeholder so unregistered fields
    /// still decode (as raw octets) instead of failing the whole Set.
    pub fn resolve(&self, key: IeKey) -> InformationElement {
        self.get_by_key(key).cloned().unwrap_or_else(|| InformationElement::unknown(key))
    }
}

fn iana_subset() -> Vec<InformationElement> {
    use FieldDataType::*;
    vec![
        InformationElement::iana("octetDeltaCount", 1, Unsigned, 8),
        InformationElement::iana("packetDeltaCount", 2, Unsigned, 8),
        InformationElement::iana("protocolIdentifier", 4, Unsigned, 1),
        InformationElement::iana("ipClassOfService", 5, Unsigned, 1),
        InformationElement::iana("tcpControlBits", 6, Unsigned, 1),
        InformationElement::iana("sourceTransportPort", 7, Unsigned, 2),
        InformationElement::iana("sourceIPv4Address", 8, Ipv4Addr, 4),
        InformationElement::iana("sourceIPv4PrefixLength", 9, Unsigned, 1),
        InformationElement::iana("ingressInterface", 10, Unsigned, 4),
        InformationElement::iana("destinationTransportPort", 11, Unsigned, 2),
        InformationElement::iana("destinationIPv4Address", 12, Ipv4Addr, 4),
        InformationElement::iana("destinationIPv4PrefixLength", 13, Unsigned, 1),
        InformationElement::iana("egressInterface", 14, Unsigned, 4),
        InformationElement::iana("ipNextHopIPv4Address", 15, Ipv4Addr, 4),
        InformationElement::iana("bgpSourceAsNumber", 16, Unsigned, 4),
        InformationElement::iana("bgpDestinationAsNumber", 17, Unsigned, 4),
        InformationElement::iana("flowEndSysUpTime", 21, Unsigned, 4),
        InformationElement::iana("flowStartSysUpTime", 22, Unsigned, 4),
        InformationElement::iana("sourceIPv6Address", 27, Ipv6Addr, 16),
        InformationElement::iana("destinationIPv6Address", 28, Ipv6Addr, 16),
        InformationElement::iana("flowEndReason", 136, Unsigned, 1),
        InformationElement::iana("sourceMacAddress", 56, MacAddr, 6),
        InformationElement::iana("destinationMacAddress", 80, MacAddr, 6),
        InformationElement::iana("flowStartSeconds", 150, DateTimeSeconds, 4),
        InformationElement::iana("flowEndSeconds", 151, DateTimeSeconds, 4),
        InformationElement::iana("flowStartMilliseconds", 152, DateTimeMillis, 8),
        InformationElement::iana("flowEndMilliseconds", 153, DateTimeMillis, 8),
        InformationElement::iana("flowStartMicroseconds", 154, DateTimeMicros, 8),
        InformationElement::iana("flowEndMicroseconds", 155, DateTimeMicros, 8),
        InformationElement::iana("flowStartNanoseconds", 156, DateTimeNanos, 8),
        InformationElement::iana("flowEndNanoseconds", 157, DateTimeNanos, 8),
        InformationElement::iana("applicationName", 96, String, 32),
        InformationElement::iana("interfaceName", 82, String, 32),
        InformationElement::iana("observationDomainName", 300, String, 32),
    ]
}

/// An ordered list of Information Elements, used two ways: to order fields
/// when building a Template from names, and as the selection criterion for
/// `tuple_iterator` (a Template is accepted only if it carries every IE in
/// the list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationElementList {
    ies: Vec<InformationElement>,
}

impl InformationElementList {
    pub fn new(ies: Vec<InformationElement>) -> Self {
        InformationElementList { ies }
    }

    /// Resolves `names` against `registry`, in order. Fails (returns `None`
    /// for the offending name, via `Result::Err`) if any name is unknown,
    /// since an IE list built from an unresolvable name can't be used to
    /// either build a Template or select one.
    pub fn from_names(registry: &InformationElementRegistry, names: &[&str]) -> Result<Self, String> {
        let mut ies = Vec::with_capacity(names.len());
        for name in names {
            let ie = registry
                .get_by_name(name)
                .cloned()
                .ok_or_else(|| format!("unknown information element: {name}"))?;
            ies.push(ie);
        }
        Ok(InformationElementList::new(ies))
    }

    /// The default IANA-subset registry's full IE list, in registration
    /// order. Convenience for examples and tests.
    pub fn iana_default() -> InformationElementRegistry {
        InformationElementRegistry::iana_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InformationElement> {
        self.ies.iter()
    }

    pub fn len(&self) -> usize {
        self.ies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ies.is_empty()
    }

    pub fn contains_key(&self, key: IeKey) -> bool {
        self.ies.iter().any(|ie| ie.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduced_length_unsigned_round_trips() {
        let mut buf = [0u8; 8];
        FieldValue::Unsigned(300).encode(&mut buf, 0, 2).unwrap();
        let (value, offset) = FieldValue::decode(&buf, 0, FieldDataType::Unsigned, 2).unwrap();
        assert_eq!(value, FieldValue::Unsigned(300));
        assert_eq!(offset, 2);
    }

    #[test]
    fn signed_field_sign_extends() {
        let mut buf = [0u8; 4];
        FieldValue::Signed(-12).encode(&mut buf, 0, 1).unwrap();
        let (value, _) = FieldValue::decode(&buf, 0, FieldDataType::Signed, 1).unwrap();
        assert_eq!(value, FieldValue::Signed(-12));
    }

    #[test]
    fn ipv4_round_trips() {
        let mut buf = [0u8; 4];
        let addr: Ipv4Addr = "192.0.2.1".parse().unwrap();
        FieldValue::Ipv4Addr(addr).encode(&mut buf, 0, 4).unwrap();
        let (value, _) = FieldValue::decode(&buf, 0, FieldDataType::Ipv4Addr, 4).unwrap();
        assert_eq!(value, FieldValue::Ipv4Addr(addr));
    }

    #[test]
    fn string_field_is_zero_padded_and_trimmed_on_decode() {
        let mut buf = [0u8; 8];
        FieldValue::String("hi".to_string()).encode(&mut buf, 0, 8).unwrap();
        assert_eq!(&buf, b"hi\0\0\0\0\0\0");
    }

    #[test]
    fn encode_overflows_past_buffer_end() {
        let mut buf = [0u8; 2];
        let err = FieldValue::Unsigned(1).encode(&mut buf, 0, 4);
        assert!(err.is_err());
    }

    #[test]
    fn encode_rejects_wire_length_past_eight_octets_instead_of_panicking() {
        let mut buf = [0u8; 16];
        let err = FieldValue::Unsigned(1).encode(&mut buf, 0, 9);
        assert!(err.is_err());
        let err = FieldValue::Signed(-1).encode(&mut buf, 0, 9);
        assert!(err.is_err());
        let err = FieldValue::DateTimeMillis(SystemTime::UNIX_EPOCH).encode(&mut buf, 0, 9);
        assert!(err.is_err());
    }

    #[test]
    fn iana_default_resolves_common_elements() {
        let reg = InformationElementRegistry::iana_default();
        let ie = reg.get_by_name("sourceIPv4Address").unwrap();
        assert_eq!(ie.key, IeKey::iana(8));
        assert_eq!(ie.default_length, 4);
    }

    #[test]
    fn unresolved_key_falls_back_to_unknown() {
        let reg = InformationElementRegistry::new();
        let ie = reg.resolve(IeKey { enterprise_number: 9999, number: 1 });
        assert_eq!(ie.data_type, FieldDataType::Octets);
    }
}
