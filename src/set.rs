//! The scanned list of Sets within a decoded Message: offset, Set ID, and
//! declared length for each, in wire order. Produced once by `scan_setlist`
//! and consulted by every iterator so a Message's Sets are only walked once.

use serde::Serialize;

/// One Set's position within a decoded Message buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetEntry {
    /// Byte offset of the Set Header (`set_id`) within the Message buffer.
    pub offset: usize,
    pub set_id: u16,
    /// The Set Header's declared length, including the 4-octet header.
    pub set_length: u16,
}

impl SetEntry {
    /// Offset just past this Set's header, where its first record begins.
    pub fn body_offset(&self) -> usize {
        self.offset + 4
    }

    /// Offset just past this Set entirely.
    pub fn end_offset(&self) -> usize {
        self.offset + usize::from(self.set_length)
    }

    pub fn is_template_set(&self) -> bool {
        self.set_id == 2
    }

    pub fn is_options_template_set(&self) -> bool {
        self.set_id == 3
    }

    pub fn is_data_set(&self) -> bool {
        self.set_id >= 256
    }
}

pub type SetList = Vec<SetEntry>;
