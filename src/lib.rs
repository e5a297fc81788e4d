#![doc = include_str!("../README.md")]

pub mod buffer;
pub mod error;
pub mod ie;
pub mod protocol;
pub mod registry;
pub mod sequence;
pub mod set;
pub mod template;
pub mod time;

pub use buffer::{MessageBuffer, MessageBufferBuilder, Phase, RecordIterator};
pub use error::{DecodeError, EncodeError, EndOfMessage, EndOfStream, ReadMessageError, SetError};
pub use ie::{
    FieldDataType, FieldValue, IeKey, InformationElement, InformationElementList,
    InformationElementRegistry,
};
pub use registry::TemplateRegistry;
pub use sequence::{SequenceTracker, StreamId};
pub use set::{SetEntry, SetList};
pub use template::{NameDictCodec, RecordDecoder, RecordEncoder, Template, TemplateField, TupleCodec};
