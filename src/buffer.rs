//! The `MessageBuffer` state machine: the heart of this crate. Owns a fixed
//! 65535-octet region, alternates between an encoding and a decoding phase,
//! tracks the active Template table, drives Set segmentation on write, and
//! scans Sets plus decodes records against their Template on read.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::{DecodeError, EncodeError, EndOfMessage, EndOfStream, ReadMessageError, SetError};
use crate::ie::{FieldValue, InformationElementList, InformationElementRegistry};
use crate::registry::TemplateRegistry;
use crate::sequence::{SequenceTracker, StreamId};
use crate::set::{SetEntry, SetList};
use crate::template::{NameDictCodec, RecordDecoder, RecordEncoder, Template, TupleCodec};

const MAX_MESSAGE_LEN: usize = 65535;
const HEADER_LEN: usize = 16;
const SET_HEADER_LEN: usize = 4;

/// The three phases a `MessageBuffer` can occupy, per the encode/decode
/// state machine. Derived from `length`/`set_list`/`cur_set_id`, not stored
/// redundantly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Fresh,
    Encoding { set_open: bool },
    Decoding,
}

/// Owns the byte region and all per-message cursor state; the Template
/// table, sequence counters, and IE registry are shared handles so several
/// buffers can cooperate within the same Observation Domain.
pub struct MessageBuffer {
    buffer: Box<[u8; MAX_MESSAGE_LEN]>,
    length: usize,
    mtu: usize,
    odid: u32,
    stream_id: StreamId,
    sequence: u32,
    export_epoch: u32,
    auto_export_time: bool,
    set_list: SetList,
    cur_set_off: usize,
    cur_set_id: Option<u16>,
    cur_tmpl: Option<Rc<Template>>,
    templates: Rc<RefCell<TemplateRegistry>>,
    accepted_tids: RefCell<HashSet<(u32, u16)>>,
    sequences: Rc<RefCell<SequenceTracker>>,
    ies: Rc<InformationElementRegistry>,
}

impl MessageBuffer {
    /// A `MessageBuffer` with default configuration: MTU 65535, a private
    /// (unshared) Template registry and sequence tracker, and the built-in
    /// IANA information element subset.
    pub fn new() -> Self {
        MessageBufferBuilder::new().build()
    }

    pub fn phase(&self) -> Phase {
        if self.length == 0 {
            Phase::Fresh
        } else if self.set_list.is_empty() {
            Phase::Encoding { set_open: self.cur_set_id.is_some() }
        } else {
            Phase::Decoding
        }
    }

    /// Current valid-byte count in the buffer (header plus sets written or
    /// read so far).
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn odid(&self) -> u32 {
        self.odid
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn information_elements(&self) -> &InformationElementRegistry {
        &self.ies
    }

    /// The Sets scanned out of this Message so far, in wire order.
    pub fn set_list(&self) -> &[SetEntry] {
        &self.set_list
    }

    /// A clone of the shared Template registry handle, for callers that
    /// want to build another `MessageBuffer` sharing the same Templates, or
    /// to inspect what Templates are currently registered.
    pub fn templates(&self) -> Rc<RefCell<TemplateRegistry>> {
        Rc::clone(&self.templates)
    }

    /// A clone of the shared sequence tracker handle.
    pub fn sequences(&self) -> Rc<RefCell<SequenceTracker>> {
        Rc::clone(&self.sequences)
    }

    pub fn get_export_time(&self) -> u32 {
        self.export_epoch
    }

    /// Overrides `export_epoch` directly and disables the auto-refresh that
    /// `to_bytes` would otherwise perform.
    pub fn set_export_time(&mut self, epoch: u32) {
        self.export_epoch = epoch;
        self.auto_export_time = false;
    }

    /// Whether this buffer holds anything beyond the bare 16-octet header —
    /// useful for a caller batching records on a timer to decide whether a
    /// `to_bytes` flush is worth doing at all.
    pub fn export_needs_flush(&self) -> bool {
        self.length > HEADER_LEN
    }

    // ---- Encoding path -----------------------------------------------

    /// Enters encoding phase: clears any decode state, optionally overrides
    /// `odid`, snapshots the sequence counter for the (possibly new) domain,
    /// and zeroes the header area.
    pub fn begin_export(&mut self, odid: Option<u32>) -> Result<(), EncodeError> {
        if self.mtu < HEADER_LEN {
            return Err(EncodeError::MtuTooSmall { mtu: self.mtu });
        }
        self.set_list.clear();
        if let Some(odid) = odid {
            self.odid = odid;
        }
        self.sequence = self.sequences.borrow().peek(self.odid, self.stream_id);
        self.buffer[..HEADER_LEN].fill(0);
        self.length = HEADER_LEN;
        self.cur_set_id = None;
        self.cur_set_off = 0;
        self.cur_tmpl = None;
        Ok(())
    }

    /// Registers `tmpl` under `(odid, tmpl.id)`, and, when `export` is true,
    /// writes its descriptor into the message's Template or Options
    /// Template Set (picked by `tmpl.is_options()`), opening one if needed.
    pub fn add_template(&mut self, tmpl: Template, export: bool) -> Result<Rc<Template>, EndOfMessage> {
        let snapshot = self.length;
        let entry = self.templates.borrow_mut().insert(self.odid, tmpl);
        if export {
            let set_id = if entry.is_options() { 3 } else { 2 };
            if self.ensure_set_unchecked(set_id).is_err() || self.write_template(&entry).is_err() {
                self.length = snapshot;
                return Err(EndOfMessage);
            }
        }
        Ok(entry)
    }

    /// Removes the registry entry for `tid` and, when `export` is true,
    /// writes a Template Withdrawal record into the corresponding Set.
    pub fn delete_template(&mut self, tid: u16, export: bool) -> Result<(), SetError> {
        let removed = self
            .templates
            .borrow_mut()
            .remove(self.odid, tid)
            .ok_or(EncodeError::NoSuchTemplate { odid: self.odid, tid })?;
        if export {
            let snapshot = self.length;
            let set_id = if removed.is_options() { 3 } else { 2 };
            if self.ensure_set_unchecked(set_id).is_err() || self.write_withdrawal(tid).is_err() {
                self.length = snapshot;
                return Err(EndOfMessage.into());
            }
        }
        Ok(())
    }

    fn write_withdrawal(&mut self, tid: u16) -> Result<(), EndOfMessage> {
        let new_len = Template::encode_withdrawal_to(tid, &mut self.buffer[..], self.length)
            .map_err(|_| EndOfMessage)?;
        if new_len > self.mtu {
            return Err(EndOfMessage);
        }
        self.length = new_len;
        Ok(())
    }

    /// Opens `set_id` without consulting the Template registry — used only
    /// for Template/Options Template Sets (2, 3), which `add_template` and
    /// `delete_template` manage directly.
    fn ensure_set_unchecked(&mut self, set_id: u16) -> Result<(), EndOfMessage> {
        if self.cur_set_id == Some(set_id) {
            return Ok(());
        }
        self.export_close_set();
        if self.length + SET_HEADER_LEN > self.mtu {
            return Err(EndOfMessage);
        }
        self.cur_set_off = self.length;
        self.cur_set_id = Some(set_id);
        self.cur_tmpl = None;
        self.buffer[self.length..self.length + 2].copy_from_slice(&set_id.to_be_bytes());
        self.buffer[self.length + 2..self.length + 4].copy_from_slice(&0u16.to_be_bytes());
        self.length += SET_HEADER_LEN;
        Ok(())
    }

    fn write_template(&mut self, tmpl: &Template) -> Result<(), EndOfMessage> {
        let new_len = tmpl
            .encode_template_to(&mut self.buffer[..], self.length)
            .map_err(|_| EndOfMessage)?;
        if new_len > self.mtu {
            return Err(EndOfMessage);
        }
        self.length = new_len;
        Ok(())
    }

    /// Closes any open Set, then opens `set_id`. For `set_id >= 256` (a Data
    /// Set) requires a registered Template and enough MTU headroom for the
    /// Set header plus one minimum-length record.
    pub fn export_new_set(&mut self, set_id: u16) -> Result<(), SetError> {
        self.export_close_set();
        match set_id {
            2 | 3 => {
                if self.length + SET_HEADER_LEN > self.mtu {
                    return Err(EndOfMessage.into());
                }
                self.open_set_header(set_id, None);
                Ok(())
            }
            0..=255 => Err(EncodeError::ReservedSetId { set_id }.into()),
            _ => {
                let tmpl = self
                    .templates
                    .borrow()
                    .get(self.odid, set_id)
                    .ok_or(EncodeError::NoTemplateForSet { odid: self.odid, set_id })?;
                if self.length + SET_HEADER_LEN + tmpl.minlength() > self.mtu {
                    return Err(EndOfMessage.into());
                }
                self.open_set_header(set_id, Some(tmpl));
                Ok(())
            }
        }
    }

    fn open_set_header(&mut self, set_id: u16, tmpl: Option<Rc<Template>>) {
        self.cur_set_off = self.length;
        self.cur_set_id = Some(set_id);
        self.cur_tmpl = tmpl;
        self.buffer[self.length..self.length + 2].copy_from_slice(&set_id.to_be_bytes());
        self.buffer[self.length + 2..self.length + 4].copy_from_slice(&0u16.to_be_bytes());
        self.length += SET_HEADER_LEN;
    }

    /// If a Set is open, rewrites its header with the final length and
    /// clears the cursor. A no-op if no Set is open.
    pub fn export_close_set(&mut self) {
        if let Some(set_id) = self.cur_set_id.take() {
            let set_length = (self.length - self.cur_set_off) as u16;
            self.buffer[self.cur_set_off..self.cur_set_off + 2].copy_from_slice(&set_id.to_be_bytes());
            self.buffer[self.cur_set_off + 2..self.cur_set_off + 4]
                .copy_from_slice(&set_length.to_be_bytes());
            self.cur_tmpl = None;
        }
    }

    /// Opens a new Set for `set_id` unless one is already open for it.
    pub fn export_ensure_set(&mut self, set_id: u16) -> Result<(), SetError> {
        if self.cur_set_id == Some(set_id) {
            return Ok(());
        }
        self.export_new_set(set_id)
    }

    /// Encodes one record against the currently open Data Set's Template.
    /// Rolls `length` back to its pre-call value and fails with
    /// `EndOfMessage` on encoder overflow or MTU overrun.
    pub fn export_record<R>(&mut self, encoder: &dyn RecordEncoder<R>, rec: &R) -> Result<(), SetError> {
        let set_id = self
            .cur_set_id
            .ok_or(EncodeError::NoTemplateForSet { odid: self.odid, set_id: 0 })?;
        let tmpl = self
            .cur_tmpl
            .clone()
            .ok_or(EncodeError::NoTemplateForSet { odid: self.odid, set_id })?;
        let snapshot = self.length;
        let result = encoder.encode(&tmpl, &mut self.buffer[..], self.length, rec);
        match result {
            Ok(new_length) if new_length <= self.mtu => {
                self.length = new_length;
                self.sequences.borrow_mut().advance(self.odid, self.stream_id, 1);
                Ok(())
            }
            _ => {
                self.length = snapshot;
                Err(EndOfMessage.into())
            }
        }
    }

    /// Encodes `rec` (a name-keyed field map) against the open Data Set.
    pub fn export_namedict(&mut self, rec: &std::collections::BTreeMap<String, FieldValue>) -> Result<(), SetError> {
        let codec = NameDictCodec { ies: &self.ies };
        self.export_record(&codec, rec)
    }

    /// Encodes `rec` (a positional tuple ordered by `shape`) against the
    /// open Data Set.
    pub fn export_tuple(&mut self, shape: &InformationElementList, rec: &Vec<FieldValue>) -> Result<(), SetError> {
        let codec = TupleCodec { ies: &self.ies, shape };
        self.export_record(&codec, rec)
    }

    /// Closes any open Set, stamps the final header, and returns an
    /// immutable copy of the encoded Message. Does not otherwise reset the
    /// buffer's state.
    pub fn to_bytes(&mut self) -> Vec<u8> {
        self.export_close_set();
        if self.auto_export_time {
            self.export_epoch = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as u32)
                .unwrap_or(0);
        }
        let length = self.length as u16;
        self.buffer[0..2].copy_from_slice(&10u16.to_be_bytes());
        self.buffer[2..4].copy_from_slice(&length.to_be_bytes());
        self.buffer[4..8].copy_from_slice(&self.export_epoch.to_be_bytes());
        self.buffer[8..12].copy_from_slice(&self.sequence.to_be_bytes());
        self.buffer[12..16].copy_from_slice(&self.odid.to_be_bytes());
        self.buffer[..self.length].to_vec()
    }

    /// Calls `to_bytes` and writes the result to `sink` in one shot.
    pub fn write_message(&mut self, sink: &mut impl Write) -> std::io::Result<()> {
        let bytes = self.to_bytes();
        sink.write_all(&bytes)
    }

    // ---- Decoding path -------------------------------------------------

    /// Copies `bytes` into the buffer, validates and parses the Message
    /// Header, then scans the Set list.
    pub fn from_bytes(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::MessageTooShort { length: bytes.len() });
        }
        let version = u16::from_be_bytes([bytes[0], bytes[1]]);
        if version != 10 {
            return Err(DecodeError::UnsupportedVersion { version });
        }
        let header_length = u16::from_be_bytes([bytes[2], bytes[3]]);
        if usize::from(header_length) < 20 {
            return Err(DecodeError::MessageTooShort { length: usize::from(header_length) });
        }
        if usize::from(header_length) != bytes.len() {
            return Err(DecodeError::LengthMismatch {
                header_length,
                actual_length: bytes.len(),
            });
        }
        let export_epoch = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let sequence = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let odid = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        self.buffer[..bytes.len()].copy_from_slice(bytes);
        self.length = bytes.len();
        self.export_epoch = export_epoch;
        self.sequence = sequence;
        self.odid = odid;
        self.scan_setlist()
    }

    /// Reads exactly one Message off `stream`: a 16-octet header, then its
    /// declared body length, then scans the Set list.
    pub fn read_message(&mut self, stream: &mut impl Read) -> Result<(), ReadMessageError> {
        let mut header = [0u8; HEADER_LEN];
        let read = read_fully(stream, &mut header)?;
        if read == 0 {
            return Err(EndOfStream.into());
        }
        if read < HEADER_LEN {
            return Err(DecodeError::ShortRead {
                context: "message header",
                expected: HEADER_LEN,
                actual: read,
            }
            .into());
        }
        let version = u16::from_be_bytes([header[0], header[1]]);
        if version != 10 {
            return Err(DecodeError::UnsupportedVersion { version }.into());
        }
        let length = u16::from_be_bytes([header[2], header[3]]);
        if usize::from(length) < 20 {
            return Err(DecodeError::MessageTooShort { length: usize::from(length) }.into());
        }
        let body_len = usize::from(length) - HEADER_LEN;
        self.buffer[..HEADER_LEN].copy_from_slice(&header);
        let read_body = read_fully(stream, &mut self.buffer[HEADER_LEN..HEADER_LEN + body_len])?;
        if read_body < body_len {
            return Err(DecodeError::ShortRead {
                context: "message body",
                expected: body_len,
                actual: read_body,
            }
            .into());
        }
        self.length = usize::from(length);
        self.export_epoch = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        self.sequence = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        self.odid = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);
        self.scan_setlist().map_err(Into::into)
    }

    /// Walks `buffer[16..length]` as a sequence of Sets, recording each
    /// one's `(offset, set_id, set_length)`.
    pub fn scan_setlist(&mut self) -> Result<(), DecodeError> {
        self.cur_set_id = None;
        self.set_list.clear();
        let mut offset = HEADER_LEN;
        while offset < self.length {
            if offset + SET_HEADER_LEN > self.length {
                return Err(DecodeError::ShortRead {
                    context: "set header",
                    expected: SET_HEADER_LEN,
                    actual: self.length - offset,
                });
            }
            let set_id = u16::from_be_bytes([self.buffer[offset], self.buffer[offset + 1]]);
            let set_length = u16::from_be_bytes([self.buffer[offset + 2], self.buffer[offset + 3]]);
            if set_length < SET_HEADER_LEN as u16 {
                return Err(DecodeError::SetTooShort { set_id, set_length });
            }
            if offset + usize::from(set_length) > self.length {
                return Err(DecodeError::SetOverrunsMessage {
                    offset,
                    set_length,
                    message_length: self.length,
                });
            }
            self.set_list.push(SetEntry { offset, set_id, set_length });
            offset += usize::from(set_length);
        }
        Ok(())
    }

    /// A lazy, single-pass iterator over every accepted Data Set record,
    /// decoded with `decoder`. Template and Options Template Sets are
    /// consumed as encountered, updating the Template registry and the
    /// accepted-Template-ID set as they go.
    pub fn record_iterator<'a, R, D>(&'a self, decoder: D) -> RecordIterator<'a, R, D>
    where
        D: RecordDecoder<R>,
    {
        self.record_iterator_with_accept(decoder, None)
    }

    fn record_iterator_with_accept<'a, R, D>(
        &'a self,
        decoder: D,
        accept_fn: Option<Box<dyn Fn(&Template) -> bool + 'a>>,
    ) -> RecordIterator<'a, R, D>
    where
        D: RecordDecoder<R>,
    {
        RecordIterator {
            buffer: &self.buffer[..self.length],
            set_list: &self.set_list,
            set_idx: 0,
            cursor: None,
            odid: self.odid,
            stream_id: self.stream_id,
            templates: &self.templates,
            accepted_tids: &self.accepted_tids,
            sequences: &self.sequences,
            decoder,
            accept_fn,
            _marker: std::marker::PhantomData,
        }
    }

    /// Decodes every accepted Data Set record as a name-keyed field map.
    pub fn namedict_iterator<'a>(
        &'a self,
    ) -> RecordIterator<'a, std::collections::BTreeMap<String, FieldValue>, NameDictCodec<'a>> {
        let codec = NameDictCodec { ies: &self.ies };
        self.record_iterator_with_accept(codec, None)
    }

    /// Decodes only Data Set records whose Template carries every IE in
    /// `ielist`, as a positional tuple ordered by `ielist`.
    pub fn tuple_iterator<'a>(
        &'a self,
        ielist: &'a InformationElementList,
    ) -> RecordIterator<'a, Vec<FieldValue>, TupleCodec<'a>> {
        let codec = TupleCodec { ies: &self.ies, shape: ielist };
        let accept: Box<dyn Fn(&Template) -> bool + 'a> = Box::new(move |tmpl: &Template| tmpl.matches_ielist(ielist));
        self.record_iterator_with_accept(codec, Some(accept))
    }
}

fn read_fully(stream: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match stream.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

/// Lazy, single-pass iterator over a decoded Message's accepted Data Set
/// records. Not restartable; borrows the `MessageBuffer` it was created
/// from for its whole lifetime.
pub struct RecordIterator<'a, R, D: RecordDecoder<R>> {
    buffer: &'a [u8],
    set_list: &'a [SetEntry],
    set_idx: usize,
    cursor: Option<(usize, usize, Rc<Template>)>,
    odid: u32,
    stream_id: StreamId,
    templates: &'a RefCell<TemplateRegistry>,
    accepted_tids: &'a RefCell<HashSet<(u32, u16)>>,
    sequences: &'a RefCell<SequenceTracker>,
    decoder: D,
    accept_fn: Option<Box<dyn Fn(&Template) -> bool + 'a>>,
    _marker: std::marker::PhantomData<R>,
}

impl<'a, R, D: RecordDecoder<R>> RecordIterator<'a, R, D> {
    fn ingest_template_set(&mut self, options: bool, mut offset: usize, end: usize) {
        while offset + 4 <= end {
            match Template::decode_template_from(self.buffer, offset, options) {
                Ok((tmpl, new_offset)) => {
                    offset = new_offset;
                    let tid = tmpl.id;
                    if tmpl.fields.is_empty() {
                        self.templates.borrow_mut().remove(self.odid, tid);
                        self.accepted_tids.borrow_mut().remove(&(self.odid, tid));
                    } else {
                        let accepted = match &self.accept_fn {
                            Some(f) => f(&tmpl),
                            None => true,
                        };
                        self.templates.borrow_mut().insert(self.odid, tmpl);
                        if accepted {
                            self.accepted_tids.borrow_mut().insert((self.odid, tid));
                        } else {
                            self.accepted_tids.borrow_mut().remove(&(self.odid, tid));
                        }
                    }
                }
                Err(_) => {
                    log::warn!("malformed template descriptor at offset {offset}, skipping remainder of set");
                    break;
                }
            }
        }
    }
}

impl<'a, R, D: RecordDecoder<R>> Iterator for RecordIterator<'a, R, D> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        loop {
            if let Some((offset, set_end, tmpl)) = self.cursor.clone() {
                if offset + tmpl.minlength() <= set_end {
                    match self.decoder.decode(&tmpl, self.buffer, offset) {
                        Ok((record, new_offset)) => {
                            self.cursor = Some((new_offset, set_end, tmpl));
                            self.sequences.borrow_mut().advance(self.odid, self.stream_id, 1);
                            return Some(record);
                        }
                        Err(_) => {
                            log::warn!("failed to decode record at offset {offset}, skipping remainder of set");
                            self.cursor = None;
                            continue;
                        }
                    }
                } else {
                    self.cursor = None;
                    continue;
                }
            }

            if self.set_idx >= self.set_list.len() {
                return None;
            }
            let entry = self.set_list[self.set_idx];
            self.set_idx += 1;
            let body = entry.body_offset();
            let end = entry.end_offset();

            if entry.is_template_set() || entry.is_options_template_set() {
                self.ingest_template_set(entry.is_options_template_set(), body, end);
                continue;
            }
            if entry.set_id < 256 {
                log::warn!("skipping reserved set id {} at offset {}", entry.set_id, entry.offset);
                continue;
            }
            let key = (self.odid, entry.set_id);
            if !self.accepted_tids.borrow().contains(&key) {
                continue;
            }
            let tmpl = match self.templates.borrow().get(self.odid, entry.set_id) {
                Some(t) => t,
                None => {
                    log::warn!(
                        "no template registered for data set {} in domain {}",
                        entry.set_id,
                        self.odid
                    );
                    continue;
                }
            };
            self.cursor = Some((body, end, tmpl));
        }
    }
}

/// Builder for [`MessageBuffer`]: a fluent setter per configuration field,
/// finished off with `build()`.
#[derive(Default)]
pub struct MessageBufferBuilder {
    mtu: Option<usize>,
    auto_export_time: Option<bool>,
    odid: u32,
    stream_id: StreamId,
    templates: Option<Rc<RefCell<TemplateRegistry>>>,
    sequences: Option<Rc<RefCell<SequenceTracker>>>,
    ies: Option<Rc<InformationElementRegistry>>,
}

impl MessageBufferBuilder {
    pub fn new() -> Self {
        MessageBufferBuilder::default()
    }

    pub fn mtu(mut self, mtu: usize) -> Self {
        self.mtu = Some(mtu);
        self
    }

    pub fn auto_export_time(mut self, auto_export_time: bool) -> Self {
        self.auto_export_time = Some(auto_export_time);
        self
    }

    pub fn odid(mut self, odid: u32) -> Self {
        self.odid = odid;
        self
    }

    pub fn stream_id(mut self, stream_id: StreamId) -> Self {
        self.stream_id = stream_id;
        self
    }

    /// Shares a Template registry across this buffer and any others built
    /// with the same handle, so a decoder and an encoder can agree on
    /// Templates within one Observation Domain.
    pub fn templates(mut self, templates: Rc<RefCell<TemplateRegistry>>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Shares a sequence counter; required in any deployment using more
    /// than one `MessageBuffer` per (odid, stream).
    pub fn sequences(mut self, sequences: Rc<RefCell<SequenceTracker>>) -> Self {
        self.sequences = Some(sequences);
        self
    }

    pub fn information_elements(mut self, ies: Rc<InformationElementRegistry>) -> Self {
        self.ies = Some(ies);
        self
    }

    pub fn build(self) -> MessageBuffer {
        MessageBuffer {
            buffer: Box::new([0u8; MAX_MESSAGE_LEN]),
            length: 0,
            mtu: self.mtu.unwrap_or(MAX_MESSAGE_LEN),
            odid: self.odid,
            stream_id: self.stream_id,
            sequence: 0,
            export_epoch: 0,
            auto_export_time: self.auto_export_time.unwrap_or(true),
            set_list: Vec::new(),
            cur_set_off: 0,
            cur_set_id: None,
            cur_tmpl: None,
            templates: self.templates.unwrap_or_default(),
            accepted_tids: RefCell::new(HashSet::new()),
            sequences: self.sequences.unwrap_or_default(),
            ies: self.ies.unwrap_or_else(|| Rc::new(InformationElementRegistry::iana_default())),
        }
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        MessageBuffer::new()
    }
}
