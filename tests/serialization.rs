//! Note: none of these types implement `Deserialize`, only `Serialize` —
//! this crate is for decoding wire messages, not reconstructing them from
//! JSON.

use ipfix_codec::buffer::MessageBuffer;
use ipfix_codec::ie::{FieldValue, InformationElementList};
use ipfix_codec::template::Template;
use std::collections::BTreeMap;

fn sample_bytes() -> Vec<u8> {
    let ies = InformationElementList::iana_default();
    let tmpl = Template::from_ielist(256, &ies, &["sourceIPv4Address", "packetDeltaCount"]).unwrap();

    let mut msg = MessageBuffer::new();
    msg.begin_export(Some(1)).unwrap();
    msg.add_template(tmpl, true).unwrap();
    msg.export_new_set(256).unwrap();
    let mut rec = BTreeMap::new();
    rec.insert("sourceIPv4Address".to_string(), FieldValue::Ipv4Addr("198.51.100.7".parse().unwrap()));
    rec.insert("packetDeltaCount".to_string(), FieldValue::Unsigned(42));
    msg.export_namedict(&rec).unwrap();
    msg.to_bytes()
}

#[test]
fn test_namedict_record_serialization() {
    let bytes = sample_bytes();
    let mut decoder = MessageBuffer::new();
    decoder.from_bytes(&bytes).unwrap();
    let records: Vec<_> = decoder.namedict_iterator().collect();

    let json = serde_json::to_string(&records).expect("Failed to serialize");
    assert!(json.contains("\"sourceIPv4Address\""));
    assert!(json.contains("\"Unsigned\":42"));
}

#[test]
fn test_record_json_pretty_print() {
    let bytes = sample_bytes();
    let mut decoder = MessageBuffer::new();
    decoder.from_bytes(&bytes).unwrap();
    let records: Vec<_> = decoder.namedict_iterator().collect();

    let json = serde_json::to_string_pretty(&records).expect("Failed to serialize");
    assert!(json.contains('\n'));
}

#[test]
fn test_set_list_serialization() {
    let bytes = sample_bytes();
    let mut decoder = MessageBuffer::new();
    decoder.from_bytes(&bytes).unwrap();

    let json = serde_json::to_string(decoder.set_list()).expect("Failed to serialize set list");
    assert!(json.contains("\"set_id\":2"));
    assert!(json.contains("\"set_id\":256"));
}
