//! Conformance tests driven by JSON vectors.
//!
//! Each record carries the value under test, the variant flag, and the
//! expected encoding as hex, either flat
//! (`{"input": true, "aligned": true, "output": "80"}`) or with a
//! structured input carrying optional bounds
//! (`{"input": {"value": 5, "lb": 0, "ub": 7}, ...}`). Every vector is
//! checked in both directions: encode to the expected bytes, decode the
//! expected bytes back to the value.

use per_codec::per::{PerDecoder, PerEncoder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct BoolVector {
    input: bool,
    aligned: bool,
    output: String,
}

#[derive(Deserialize)]
struct IntegerInput {
    value: i64,
    lb: Option<i64>,
    ub: Option<i64>,
    extensible: Option<bool>,
}

#[derive(Deserialize)]
struct IntegerVector {
    input: IntegerInput,
    aligned: bool,
    output: String,
}

#[derive(Deserialize)]
struct OctetStringInput {
    length: usize,
    lb: Option<u64>,
    ub: Option<u64>,
    extensible: Option<bool>,
}

#[derive(Deserialize)]
struct OctetStringVector {
    input: OctetStringInput,
    aligned: bool,
    output: String,
}

fn load<T: DeserializeOwned>(name: &str) -> Vec<T> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/vectors")
        .join(name);
    let data = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e));
    serde_json::from_str(&data).unwrap_or_else(|e| panic!("parsing {}: {}", path.display(), e))
}

/// Deterministic contents for octet string vectors of a given length.
fn gen_octet_string(length: usize) -> Vec<u8> {
    (0..length).map(|i| i as u8).collect()
}

#[test]
fn bool_vectors_encode() {
    for vector in load::<BoolVector>("bool.json") {
        let expected = hex::decode(&vector.output).unwrap();
        let mut encoder = PerEncoder::new(vector.aligned);
        encoder.encode_boolean(vector.input).unwrap();
        assert_eq!(
            encoder.into_bytes(),
            expected,
            "value={} aligned={}",
            vector.input,
            vector.aligned
        );
    }
}

#[test]
fn bool_vectors_decode() {
    for vector in load::<BoolVector>("bool.json") {
        let data = hex::decode(&vector.output).unwrap();
        let mut decoder = PerDecoder::new(data, vector.aligned);
        assert_eq!(
            decoder.decode_boolean().unwrap(),
            vector.input,
            "value={} aligned={}",
            vector.input,
            vector.aligned
        );
    }
}

#[test]
fn integer_vectors_encode() {
    for vector in load::<IntegerVector>("integer.json") {
        let expected = hex::decode(&vector.output).unwrap();
        let input = &vector.input;
        let mut encoder = PerEncoder::new(vector.aligned);
        encoder
            .encode_integer(
                input.value,
                input.lb,
                input.ub,
                input.extensible.unwrap_or(false),
            )
            .unwrap();
        assert_eq!(
            encoder.into_bytes(),
            expected,
            "value={} lb={:?} ub={:?} ext={:?} aligned={}",
            input.value,
            input.lb,
            input.ub,
            input.extensible,
            vector.aligned
        );
    }
}

#[test]
fn integer_vectors_decode() {
    for vector in load::<IntegerVector>("integer.json") {
        let data = hex::decode(&vector.output).unwrap();
        let input = &vector.input;
        let mut decoder = PerDecoder::new(data, vector.aligned);
        assert_eq!(
            decoder
                .decode_integer(input.lb, input.ub, input.extensible.unwrap_or(false))
                .unwrap(),
            input.value,
            "value={} lb={:?} ub={:?} ext={:?} aligned={}",
            input.value,
            input.lb,
            input.ub,
            input.extensible,
            vector.aligned
        );
    }
}

#[test]
fn octet_string_vectors_encode() {
    for vector in load::<OctetStringVector>("octet_string.json") {
        let expected = hex::decode(&vector.output).unwrap();
        let input = &vector.input;
        let value = gen_octet_string(input.length);
        let mut encoder = PerEncoder::new(vector.aligned);
        encoder
            .encode_octet_string(
                &value,
                input.lb,
                input.ub,
                input.extensible.unwrap_or(false),
            )
            .unwrap();
        assert_eq!(
            encoder.into_bytes(),
            expected,
            "length={} lb={:?} ub={:?} ext={:?} aligned={}",
            input.length,
            input.lb,
            input.ub,
            input.extensible,
            vector.aligned
        );
    }
}

#[test]
fn octet_string_vectors_decode() {
    for vector in load::<OctetStringVector>("octet_string.json") {
        let data = hex::decode(&vector.output).unwrap();
        let input = &vector.input;
        let mut decoder = PerDecoder::new(data, vector.aligned);
        assert_eq!(
            decoder
                .decode_octet_string(input.lb, input.ub, input.extensible.unwrap_or(false))
                .unwrap(),
            gen_octet_string(input.length),
            "length={} lb={:?} ub={:?} ext={:?} aligned={}",
            input.length,
            input.lb,
            input.ub,
            input.extensible,
            vector.aligned
        );
    }
}
