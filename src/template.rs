//! Templates describe the shape of Data Records: an ordered list of
//! Information Elements, each with a wire length that may be shorter than
//! the IE's natural size (reduced-length encoding).
//!
//! A field whose 16-bit type number has the high bit set
//! (`field_type_number > 32767`) carries a trailing 4-octet enterprise
//! number, per RFC 7011 §3.2.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{DecodeError, Overflow};
use crate::ie::{FieldValue, IeKey, InformationElementList, InformationElementRegistry};

const ENTERPRISE_BIT: u16 = 0x8000;

/// One field slot in a Template: which Information Element it names, and how
/// many octets it occupies on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateField {
    pub ie_key: IeKey,
    pub length: u16,
}

impl TemplateField {
    /// Whether this field's IE key requires the enterprise-bit encoding.
    fn is_enterprise(&self) -> bool {
        self.ie_key.enterprise_number != 0
    }

    /// Octets this field occupies in a Template Set's field specifier list:
    /// 4 normally, 8 if enterprise-qualified.
    fn specifier_length(&self) -> usize {
        if self.is_enterprise() { 8 } else { 4 }
    }
}

/// A Template: an ordered field list keyed by Template ID within an
/// Observation Domain.
///
/// `options` distinguishes a plain Template (Set ID 2) from an Options
/// Template (Set ID 3); this crate treats Options Templates as carrying an
/// extra `scope_count` leading field count but otherwise the same field
/// layout, per RFC 7011 §3.4.2.2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: u16,
    pub fields: Vec<TemplateField>,
    pub scope_count: Option<u16>,
}

impl Template {
    /// A plain (non-Options) Template with the given ID and fields.
    pub fn new(id: u16, fields: Vec<TemplateField>) -> Self {
        Template { id, fields, scope_count: None }
    }

    /// An Options Template; `scope_count` fields (a prefix of `fields`) are
    /// scope fields per RFC 7011 §3.4.2.2.
    pub fn new_options(id: u16, fields: Vec<TemplateField>, scope_count: u16) -> Self {
        Template { id, fields, scope_count: Some(scope_count) }
    }

    pub fn is_options(&self) -> bool {
        self.scope_count.is_some()
    }

    /// Builds a plain Template by resolving `names` against `ies`, assigning
    /// each field its IE's default wire length.
    pub fn from_ielist(
        id: u16,
        ies: &InformationElementRegistry,
        names: &[&str],
    ) -> Result<Self, String> {
        let list = InformationElementList::from_names(ies, names)?;
        let fields = list
            .iter()
            .map(|ie| TemplateField { ie_key: ie.key, length: ie.default_length })
            .collect();
        Ok(Template::new(id, fields))
    }

    /// Sum of this Template's field lengths: the minimum size of a Data
    /// Record using this Template (fixed-length fields only, per this
    /// crate's scope — see `DESIGN.md`).
    pub fn minlength(&self) -> usize {
        self.fields.iter().map(|f| usize::from(f.length)).sum()
    }

    /// Octets this Template occupies when encoded into a Template Set: a
    /// 4-octet header (template id, field count, plus a scope-count field
    /// for Options Templates) followed by each field's specifier.
    pub fn enclength(&self) -> usize {
        let header = if self.is_options() { 6 } else { 4 };
        header + self.fields.iter().map(TemplateField::specifier_length).sum::<usize>()
    }

    /// Whether this Template's fields, in order, cover every IE in `list` —
    /// the selection criterion `tuple_iterator` uses to pick a Template for
    /// a fixed tuple shape.
    pub fn matches_ielist(&self, list: &InformationElementList) -> bool {
        list.iter().all(|ie| self.fields.iter().any(|f| f.ie_key == ie.key))
    }

    /// Encodes this Template's descriptor (not a withdrawal) into `buf` at
    /// `offset`, returning the new offset.
    pub fn encode_template_to(&self, buf: &mut [u8], offset: usize) -> Result<usize, Overflow> {
        let mut off = offset;
        off = write_u16(buf, off, self.id)?;
        off = write_u16(buf, off, self.fields.len() as u16)?;
        if let Some(scope_count) = self.scope_count {
            off = write_u16(buf, off, scope_count)?;
        }
        for field in &self.fields {
            let type_number = if field.is_enterprise() {
                field.ie_key.number | ENTERPRISE_BIT
            } else {
                field.ie_key.number
            };
            off = write_u16(buf, off, type_number)?;
            off = write_u16(buf, off, field.length)?;
            if field.is_enterprise() {
                off = write_u32(buf, off, field.ie_key.enterprise_number)?;
            }
        }
        Ok(off)
    }

    /// Decodes a Template descriptor from a Template Set (`options = false`)
    /// or Options Template Set (`options = true`) at `offset`, returning the
    /// Template and the new offset.
    pub fn decode_template_from(
        buf: &[u8],
        offset: usize,
        options: bool,
    ) -> Result<(Template, usize), DecodeError> {
        let mut off = offset;
        let id = read_u16(buf, off)?;
        off += 2;
        let field_count = read_u16(buf, off)?;
        off += 2;
        let scope_count = if options {
            let sc = read_u16(buf, off)?;
            off += 2;
            Some(sc)
        } else {
            None
        };
        let mut fields = Vec::with_capacity(usize::from(field_count));
        for _ in 0..field_count {
            let raw_type = read_u16(buf, off)?;
            off += 2;
            let length = read_u16(buf, off)?;
            off += 2;
            let enterprise = raw_type & ENTERPRISE_BIT != 0;
            let number = raw_type & !ENTERPRISE_BIT;
            let enterprise_number = if enterprise {
                let en = read_u32(buf, off)?;
                off += 4;
                en
            } else {
                0
            };
            fields.push(TemplateField { ie_key: IeKey { enterprise_number, number }, length });
        }
        let template = Template { id, fields, scope_count };
        Ok((template, off))
    }

    /// Octets a withdrawal record for this Template ID occupies: just the
    /// 4-octet header, field count zero.
    pub fn withdrawal_length() -> usize {
        4
    }

    /// Encodes a Template Withdrawal record (field count 0) for `id`.
    pub fn encode_withdrawal_to(id: u16, buf: &mut [u8], offset: usize) -> Result<usize, Overflow> {
        let mut off = offset;
        off = write_u16(buf, off, id)?;
        off = write_u16(buf, off, 0)?;
        Ok(off)
    }
}

fn write_u16(buf: &mut [u8], offset: usize, value: u16) -> Result<usize, Overflow> {
    let end = offset + 2;
    if end > buf.len() {
        return Err(Overflow);
    }
    buf[offset..end].copy_from_slice(&value.to_be_bytes());
    Ok(end)
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<usize, Overflow> {
    let end = offset + 4;
    if end > buf.len() {
        return Err(Overflow);
    }
    buf[offset..end].copy_from_slice(&value.to_be_bytes());
    Ok(end)
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let bytes = buf.get(offset..offset + 2).ok_or(DecodeError::RecordOverrunsSet {
        offset,
        set_end: buf.len(),
    })?;
    Ok(u16::from_be_bytes(bytes.try_into().unwrap()))
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let bytes = buf.get(offset..offset + 4).ok_or(DecodeError::RecordOverrunsSet {
        offset,
        set_end: buf.len(),
    })?;
    Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
}

/// Encodes a record representation `R` against a Template.
pub trait RecordEncoder<R> {
    fn encode(&self, tmpl: &Template, buf: &mut [u8], offset: usize, rec: &R) -> Result<usize, Overflow>;
}

/// Decodes a record representation `R` against a Template.
pub trait RecordDecoder<R> {
    fn decode(&self, tmpl: &Template, buf: &[u8], offset: usize) -> Result<(R, usize), DecodeError>;
}

/// Record representation as a name-keyed map, resolving field identity
/// through an [`InformationElementRegistry`].
pub struct NameDictCodec<'a> {
    pub ies: &'a InformationElementRegistry,
}

impl<'a> RecordEncoder<BTreeMap<String, FieldValue>> for NameDictCodec<'a> {
    fn encode(
        &self,
        tmpl: &Template,
        buf: &mut [u8],
        offset: usize,
        rec: &BTreeMap<String, FieldValue>,
    ) -> Result<usize, Overflow> {
        let mut off = offset;
        for field in &tmpl.fields {
            let ie = self.ies.resolve(field.ie_key);
            let value = rec.get(&ie.name).ok_or(Overflow)?;
            off = value.encode(buf, off, field.length)?;
        }
        Ok(off)
    }
}

impl<'a> RecordDecoder<BTreeMap<String, FieldValue>> for NameDictCodec<'a> {
    fn decode(
        &self,
        tmpl: &Template,
        buf: &[u8],
        offset: usize,
    ) -> Result<(BTreeMap<String, FieldValue>, usize), DecodeError> {
        let mut off = offset;
        let mut rec = BTreeMap::new();
        for field in &tmpl.fields {
            let ie = self.ies.resolve(field.ie_key);
            let (value, new_off) = FieldValue::decode(buf, off, ie.data_type, field.length)?;
            rec.insert(ie.name, value);
            off = new_off;
        }
        Ok((rec, off))
    }
}

/// Record representation as a positional tuple, ordered by a fixed
/// [`InformationElementList`] rather than the Template's own field order —
/// used when the caller only cares about a known, fixed set of fields and
/// wants a stable tuple shape across whichever Template happens to carry
/// them.
pub struct TupleCodec<'a> {
    pub ies: &'a InformationElementRegistry,
    pub shape: &'a InformationElementList,
}

impl<'a> RecordDecoder<Vec<FieldValue>> for TupleCodec<'a> {
    fn decode(&self, tmpl: &Template, buf: &[u8], offset: usize) -> Result<(Vec<FieldValue>, usize), DecodeError> {
        let mut field_offsets = BTreeMap::new();
        let mut off = offset;
        for field in &tmpl.fields {
            field_offsets.insert(field.ie_key, (off, field.length));
            off += usize::from(field.length);
        }
        let mut values = Vec::with_capacity(self.shape.len());
        for ie in self.shape.iter() {
            let (field_offset, length) = field_offsets
                .get(&ie.key)
                .copied()
                .ok_or(DecodeError::RecordOverrunsSet { offset, set_end: buf.len() })?;
            let (value, _) = FieldValue::decode(buf, field_offset, ie.data_type, length)?;
            values.push(value);
        }
        Ok((values, off))
    }
}

impl<'a> RecordEncoder<Vec<FieldValue>> for TupleCodec<'a> {
    fn encode(&self, tmpl: &Template, buf: &mut [u8], offset: usize, rec: &Vec<FieldValue>) -> Result<usize, Overflow> {
        let mut values_by_key = BTreeMap::new();
        for (ie, value) in self.shape.iter().zip(rec.iter()) {
            values_by_key.insert(ie.key, value);
        }
        let mut off = offset;
        for field in &tmpl.fields {
            let value = values_by_key.get(&field.ie_key).ok_or(Overflow)?;
            off = value.encode(buf, off, field.length)?;
        }
        Ok(off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_template_round_trips() {
        let tmpl = Template::new(
            256,
            vec![
                TemplateField { ie_key: IeKey::iana(152), length: 8 },
                TemplateField { ie_key: IeKey::iana(8), length: 4 },
            ],
        );
        let mut buf = [0u8; 64];
        let new_offset = tmpl.encode_template_to(&mut buf, 0).unwrap();
        let (decoded, decoded_offset) = Template::decode_template_from(&buf, 0, false).unwrap();
        assert_eq!(decoded, tmpl);
        assert_eq!(decoded_offset, new_offset);
        assert_eq!(tmpl.minlength(), 12);
        assert_eq!(tmpl.enclength(), new_offset);
    }

    #[test]
    fn enterprise_qualified_field_round_trips() {
        let tmpl = Template::new(
            512,
            vec![TemplateField { ie_key: IeKey { enterprise_number: 4491, number: 12 }, length: 4 }],
        );
        let mut buf = [0u8; 32];
        tmpl.encode_template_to(&mut buf, 0).unwrap();
        let (decoded, _) = Template::decode_template_from(&buf, 0, false).unwrap();
        assert_eq!(decoded, tmpl);
        assert_eq!(decoded.fields[0].ie_key.enterprise_number, 4491);
    }

    #[test]
    fn options_template_round_trips_scope_count() {
        let tmpl = Template::new_options(
            257,
            vec![
                TemplateField { ie_key: IeKey::iana(10), length: 4 },
                TemplateField { ie_key: IeKey::iana(1), length: 8 },
            ],
            1,
        );
        let mut buf = [0u8; 32];
        tmpl.encode_template_to(&mut buf, 0).unwrap();
        let (decoded, _) = Template::decode_template_from(&buf, 0, true).unwrap();
        assert_eq!(decoded, tmpl);
        assert_eq!(decoded.scope_count, Some(1));
    }

    #[test]
    fn withdrawal_encodes_zero_field_count() {
        let mut buf = [0u8; 8];
        let new_offset = Template::encode_withdrawal_to(256, &mut buf, 0).unwrap();
        assert_eq!(new_offset, 4);
        let (decoded, _) = Template::decode_template_from(&buf, 0, false).unwrap();
        assert!(decoded.fields.is_empty());
        assert_eq!(decoded.id, 256);
    }

    #[test]
    fn matches_ielist_requires_every_member() {
        let ies = InformationElementRegistry::iana_default();
        let tmpl = Template::new(256, vec![TemplateField { ie_key: IeKey::iana(1), length: 8 }]);
        let both = InformationElementList::from_names(&ies, &["octetDeltaCount", "packetDeltaCount"]).unwrap();
        assert!(!tmpl.matches_ielist(&both));
        let one = InformationElementList::from_names(&ies, &["octetDeltaCount"]).unwrap();
        assert!(tmpl.matches_ielist(&one));
    }
}
