//! Decoding a message from a hex-encoded capture, the way a router-captured
//! packet would be pasted into a test from a packet dump.

use std::collections::BTreeMap;

use ipfix_codec::buffer::MessageBuffer;
use ipfix_codec::ie::{FieldValue, InformationElementList};
use ipfix_codec::template::Template;

#[test]
fn decodes_a_hex_captured_message() {
    let ies = InformationElementList::iana_default();
    let tmpl = Template::from_ielist(256, &ies, &["sourceIPv4Address", "octetDeltaCount"]).unwrap();

    let mut msg = MessageBuffer::new();
    msg.begin_export(Some(1)).unwrap();
    msg.add_template(tmpl, true).unwrap();
    msg.export_new_set(256).unwrap();
    let mut rec = BTreeMap::new();
    rec.insert("sourceIPv4Address".to_string(), FieldValue::Ipv4Addr("198.51.100.7".parse().unwrap()));
    rec.insert("octetDeltaCount".to_string(), FieldValue::Unsigned(1500));
    msg.export_namedict(&rec).unwrap();
    let bytes = msg.to_bytes();

    // Round-trip through a hex string the way a captured packet would be
    // pasted into a test from a packet dump.
    let capture = hex::encode(&bytes);
    let replayed = hex::decode(&capture).unwrap();
    assert_eq!(replayed, bytes);

    let mut decoder = MessageBuffer::new();
    decoder.from_bytes(&replayed).unwrap();
    let records: Vec<_> = decoder.namedict_iterator().collect();
    assert_eq!(records, vec![rec]);
}
