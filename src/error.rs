//! Error types for the IPFIX message codec.
//!
//! Four distinct error kinds are surfaced to callers, matching the taxonomy a
//! Message codec needs: [`EndOfMessage`] for a non-fatal MTU overrun,
//! [`DecodeError`] for a fatal wire-format violation, [`EncodeError`] for
//! caller misuse of the encode API, and [`EndOfStream`] for a normal
//! end-of-input signal. None of these are recovered internally.

use std::fmt;

/// An encode operation could not fit within the buffer's current MTU.
///
/// Non-fatal: the [`MessageBuffer`](crate::buffer::MessageBuffer) is rolled
/// back to the length it had before the failed call. The caller's usual
/// strategy is to finalize the current message with `to_bytes`, start a new
/// one with `begin_export`, and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfMessage;

impl fmt::Display for EndOfMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not enough room left before the MTU to encode this")
    }
}

impl std::error::Error for EndOfMessage {}

/// A wire-format violation encountered while decoding a Message.
///
/// Fatal for the current message; the buffer must be reset via
/// `begin_export` or another decode call before further use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The message header's version field was not `10`.
    UnsupportedVersion { version: u16 },
    /// Fewer than 20 octets (header + at least something) were present.
    MessageTooShort { length: usize },
    /// The header's `length` field didn't match the number of bytes given.
    LengthMismatch { header_length: u16, actual_length: usize },
    /// `read_message` got fewer bytes than the header/body required.
    ShortRead { context: &'static str, expected: usize, actual: usize },
    /// A Set's declared length was below the 4-octet Set Header size.
    SetTooShort { set_id: u16, set_length: u16 },
    /// A Set's declared length would run past the end of the message.
    SetOverrunsMessage { offset: usize, set_length: u16, message_length: usize },
    /// A record inside a Set ran past that Set's declared end.
    RecordOverrunsSet { offset: usize, set_end: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnsupportedVersion { version } => {
                write!(f, "unsupported or illegal IPFIX version {version}")
            }
            DecodeError::MessageTooShort { length } => {
                write!(f, "message too short to contain a header ({length} bytes)")
            }
            DecodeError::LengthMismatch { header_length, actual_length } => {
                write!(
                    f,
                    "header length {header_length} does not match {actual_length} bytes received"
                )
            }
            DecodeError::ShortRead { context, expected, actual } => {
                write!(f, "short read in {context}: expected {expected}, got {actual}")
            }
            DecodeError::SetTooShort { set_id, set_length } => {
                write!(f, "set {set_id} declares impossible length {set_length}")
            }
            DecodeError::SetOverrunsMessage { offset, set_length, message_length } => {
                write!(
                    f,
                    "set at offset {offset} with length {set_length} overruns message of length {message_length}"
                )
            }
            DecodeError::RecordOverrunsSet { offset, set_end } => {
                write!(f, "record at offset {offset} overruns set end {set_end}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Caller misuse of the encode API.
///
/// Fatal for the current operation; may be recoverable by the caller (e.g.
/// registering the missing Template and retrying).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// `mtu` is too small to hold even the message header.
    MtuTooSmall { mtu: usize },
    /// A Data Set was opened for a Template ID with no registered Template.
    NoTemplateForSet { odid: u32, set_id: u16 },
    /// A Set ID in `4..256` was requested; those are reserved.
    ReservedSetId { set_id: u16 },
    /// `delete_template` was called for a Template ID that isn't registered.
    NoSuchTemplate { odid: u32, tid: u16 },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::MtuTooSmall { mtu } => write!(f, "mtu too small: {mtu}"),
            EncodeError::NoTemplateForSet { odid, set_id } => {
                write!(f, "no template {set_id} registered for domain {odid}")
            }
            EncodeError::ReservedSetId { set_id } => {
                write!(f, "set id {set_id} is reserved")
            }
            EncodeError::NoSuchTemplate { odid, tid } => {
                write!(f, "no template {tid} registered for domain {odid} to delete")
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Reached only by `read_message` when the stream yields zero bytes at a
/// message boundary. Signals normal end of input, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfStream;

impl fmt::Display for EndOfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "end of stream")
    }
}

impl std::error::Error for EndOfStream {}

/// A write ran past the end of the destination slice.
///
/// Low-level counterpart to [`EndOfMessage`]: field- and record-encoders
/// raise this when asked to write past the buffer they were given; the
/// `MessageBuffer` converts it into `EndOfMessage` once it knows whether the
/// failure was an MTU overrun or a true buffer-capacity overrun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow;

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write would overrun the destination buffer")
    }
}

impl std::error::Error for Overflow {}

impl From<Overflow> for EndOfMessage {
    fn from(_: Overflow) -> Self {
        EndOfMessage
    }
}

/// Combines [`EncodeError`] and [`EndOfMessage`] for operations that can fail
/// either way (e.g. `export_new_set`, `export_ensure_set`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetError {
    Encode(EncodeError),
    EndOfMessage(EndOfMessage),
}

impl fmt::Display for SetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetError::Encode(e) => write!(f, "{e}"),
            SetError::EndOfMessage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SetError {}

impl From<EncodeError> for SetError {
    fn from(e: EncodeError) -> Self {
        SetError::Encode(e)
    }
}

impl From<EndOfMessage> for SetError {
    fn from(e: EndOfMessage) -> Self {
        SetError::EndOfMessage(e)
    }
}

/// Errors surfaced by `read_message`: either normal end of stream, an I/O
/// failure on the underlying stream, or a wire-format violation.
#[derive(Debug)]
pub enum ReadMessageError {
    EndOfStream(EndOfStream),
    Decode(DecodeError),
    Io(std::io::Error),
}

impl fmt::Display for ReadMessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadMessageError::EndOfStream(e) => write!(f, "{e}"),
            ReadMessageError::Decode(e) => write!(f, "{e}"),
            ReadMessageError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReadMessageError {}

impl From<EndOfStream> for ReadMessageError {
    fn from(e: EndOfStream) -> Self {
        ReadMessageError::EndOfStream(e)
    }
}

impl From<DecodeError> for ReadMessageError {
    fn from(e: DecodeError) -> Self {
        ReadMessageError::Decode(e)
    }
}

impl From<std::io::Error> for ReadMessageError {
    fn from(e: std::io::Error) -> Self {
        ReadMessageError::Io(e)
    }
}
