//! Property tests for the wire and key codecs: decode(encode(x)) is
//! identity, and key encodings agree with logical order under plain byte
//! comparison.

use inkdb::document::encoding::{document_bytes, EncodedDocument};
use inkdb::encoding::key;
use inkdb::encoding::varint::{read_varint, write_varint};
use inkdb::{FieldBuffer, Value};
use proptest::prelude::*;

fn encode_key(v: &Value<'_>) -> Vec<u8> {
    let mut buf = Vec::new();
    key::encode_value(v, &mut buf).unwrap();
    buf
}

proptest! {
    #[test]
    fn varint_round_trips(value: u64) {
        let mut buf = Vec::new();
        write_varint(value, &mut buf);
        let (decoded, read) = read_varint(&buf).unwrap();
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(read, buf.len());
    }

    #[test]
    fn signed_key_order_matches_integer_order(a: i64, b: i64) {
        let (ea, eb) = (encode_key(&Value::Int64(a)), encode_key(&Value::Int64(b)));
        prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
    }

    #[test]
    fn unsigned_key_order_matches_integer_order(a: u64, b: u64) {
        let (ea, eb) = (encode_key(&Value::Uint64(a)), encode_key(&Value::Uint64(b)));
        prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
    }

    #[test]
    fn float_key_order_matches_float_order(a: f64, b: f64) {
        prop_assume!(!a.is_nan() && !b.is_nan());
        let (ea, eb) = (encode_key(&Value::Float64(a)), encode_key(&Value::Float64(b)));
        match a.partial_cmp(&b).unwrap() {
            std::cmp::Ordering::Less => prop_assert!(ea < eb),
            std::cmp::Ordering::Greater => prop_assert!(ea > eb),
            // -0.0 and +0.0 compare equal but encode distinctly.
            std::cmp::Ordering::Equal => prop_assert!(
                ea == eb || (a == 0.0 && b == 0.0)
            ),
        }
    }

    #[test]
    fn text_key_order_is_byte_order(a: String, b: String) {
        let (ea, eb) = (
            encode_key(&Value::from(a.clone())),
            encode_key(&Value::from(b.clone())),
        );
        prop_assert_eq!(a.as_bytes().cmp(b.as_bytes()), ea.cmp(&eb));
    }

    #[test]
    fn scalar_documents_round_trip(
        i in any::<i64>(),
        u in any::<u64>(),
        f in any::<f64>().prop_filter("NaN has no equality", |f| !f.is_nan()),
        s in ".*",
        blob in proptest::collection::vec(any::<u8>(), 0..64),
        flag: bool,
    ) {
        let mut doc = FieldBuffer::new();
        doc.add("i", Value::Int64(i));
        doc.add("u", Value::Uint64(u));
        doc.add("f", Value::Float64(f));
        doc.add("s", Value::from(s));
        doc.add("blob", Value::Blob(blob.into()));
        doc.add("flag", Value::Bool(flag));
        doc.add("nothing", Value::Null);

        let bytes = document_bytes(&doc);
        let decoded = EncodedDocument::new(&bytes).decode().unwrap().into_owned();
        prop_assert_eq!(decoded, doc);
    }

    #[test]
    fn nested_documents_round_trip(
        values in proptest::collection::vec(any::<i64>(), 0..8),
        name in "[a-z]{1,12}",
    ) {
        let mut inner = FieldBuffer::new();
        inner.add(
            name.clone(),
            Value::Array(values.iter().copied().map(Value::Int64).collect()),
        );
        let mut doc = FieldBuffer::new();
        doc.add("outer", Value::Document(Box::new(inner)));

        let bytes = document_bytes(&doc);
        let decoded = EncodedDocument::new(&bytes).decode().unwrap().into_owned();
        prop_assert_eq!(decoded, doc);
    }
}
