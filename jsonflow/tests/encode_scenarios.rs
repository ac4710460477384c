// SPDX-License-Identifier: Apache-2.0

// End-to-end encoding scenarios over the public API.

use futures::executor::block_on;
use futures::TryStreamExt;
use jsonflow::{
    collect, ChunkSource, ElementsSource, EncodeError, EncodeOptions, JsonEncoder, Value,
};

fn encode(value: Value) -> String {
    encode_with(value, EncodeOptions::new())
}

fn encode_with(value: Value, opts: EncodeOptions) -> String {
    block_on(collect::to_string(value, opts))
        .expect("encoding failed")
        .expect("expected output")
}

#[test]
fn test_plain_tree() {
    let doc = Value::object([
        ("a", Value::from(1i64)),
        ("b", Value::array([1i64, 2, 3])),
    ]);
    assert_eq!(encode(doc), r#"{"a":1,"b":[1,2,3]}"#);
}

#[test]
fn test_scalar_roots() {
    assert_eq!(encode(Value::Null), "null");
    assert_eq!(encode(Value::from(true)), "true");
    assert_eq!(encode(Value::from(-12i64)), "-12");
    assert_eq!(encode(Value::from(2.25f64)), "2.25");
    assert_eq!(encode(Value::from("hi")), r#""hi""#);
}

#[test]
fn test_non_finite_floats_become_null() {
    let doc = Value::array([f64::NAN, f64::INFINITY, f64::NEG_INFINITY]);
    assert_eq!(encode(doc), "[null,null,null]");
}

#[test]
fn test_undefined_placement() {
    // Array element: placeholder null. Object member: dropped entirely.
    let doc = Value::object([
        ("arr", Value::Array(vec![Value::Int(1), Value::Undefined])),
        ("gone", Value::Undefined),
        ("kept", Value::Int(2)),
    ]);
    assert_eq!(encode(doc), r#"{"arr":[1,null],"kept":2}"#);

    // Root: no output at all.
    let none = block_on(collect::to_string(Value::Undefined, EncodeOptions::new())).unwrap();
    assert_eq!(none, None);
}

#[test]
fn test_string_escaping_in_document() {
    let doc = Value::object([("quote\"key", Value::from("line1\nline2\u{2028}"))]);
    assert_eq!(encode(doc), "{\"quote\\\"key\":\"line1\\nline2\\u2028\"}");
}

#[test]
fn test_text_stream_member() {
    let doc = Value::object([
        ("name", Value::from("readme")),
        (
            "body",
            Value::text_stream(ChunkSource::new(&b"first\nsecond"[..], 5)),
        ),
    ]);
    assert_eq!(encode(doc), r#"{"name":"readme","body":"first\nsecond"}"#);
}

#[test]
fn test_element_stream_member() {
    let rows = ElementsSource::new([
        Value::object([("id", 1i64)]),
        Value::object([("id", 2i64)]),
    ]);
    let doc = Value::object([("rows", Value::element_stream(rows))]);
    assert_eq!(encode(doc), r#"{"rows":[{"id":1},{"id":2}]}"#);
}

#[test]
fn test_empty_element_stream() {
    let doc = Value::element_stream(ElementsSource::new([]));
    assert_eq!(encode(doc), "[]");
}

#[test]
fn test_raw_stream_splice() {
    let pre_encoded = ChunkSource::new(&br#"{"cached":true}"#[..], 4);
    let doc = Value::object([("data", Value::raw_stream(pre_encoded))]);
    assert_eq!(encode(doc), r#"{"data":{"cached":true}}"#);
}

#[test]
fn test_deferred_value() {
    let doc = Value::object([(
        "later",
        Value::future(async { Ok(Value::from(41i64 + 1)) }),
    )]);
    assert_eq!(encode(doc), r#"{"later":42}"#);
}

#[test]
fn test_deferred_chain_and_failure() {
    // A future resolving to another future chains transparently.
    let doc = Value::future(async {
        Ok(Value::future(async { Ok(Value::from("deep")) }))
    });
    assert_eq!(encode(doc), r#""deep""#);

    let doc = Value::future(async { Err("backend down".into()) });
    let err = block_on(collect::to_string(doc, EncodeOptions::new())).unwrap_err();
    assert!(matches!(err, EncodeError::Source(_)));
    assert!(err.to_string().contains("backend down"));
}

#[test]
fn test_lazy_surrogate() {
    let doc = Value::object([(
        "stamp",
        Value::lazy(|| Value::from("2024-01-01T00:00:00Z")),
    )]);
    assert_eq!(encode(doc), r#"{"stamp":"2024-01-01T00:00:00Z"}"#);
}

#[test]
fn test_function_replacer() {
    let opts = EncodeOptions::new().with_replacer_fn(|key, value| {
        if key == "secret" {
            Value::Undefined
        } else if key == "n" {
            match value {
                Value::Int(n) => Value::Int(n * 10),
                other => other,
            }
        } else {
            value
        }
    });
    let doc = Value::object([
        ("n", Value::Int(4)),
        ("secret", Value::from("hunter2")),
        ("plain", Value::from(true)),
    ]);
    assert_eq!(encode_with(doc, opts), r#"{"n":40,"plain":true}"#);
}

#[test]
fn test_key_allow_list() {
    let opts = EncodeOptions::new().with_allowed_keys(["b", "c"]);
    let doc = Value::object([
        ("a", Value::Int(1)),
        ("b", Value::Int(2)),
        ("c", Value::object([("a", 3i64)])),
    ]);
    // The list applies at every nesting level.
    assert_eq!(encode_with(doc, opts), r#"{"b":2,"c":{}}"#);
}

#[test]
fn test_replacer_root_pass() {
    let opts = EncodeOptions::new().with_replacer_fn(|key, value| {
        if key.is_empty() {
            Value::object([("wrapped", value)])
        } else {
            value
        }
    });
    assert_eq!(encode_with(Value::Int(5), opts), r#"{"wrapped":5}"#);
}

#[test]
fn test_bigint_is_rejected() {
    let doc = Value::object([("big", Value::BigInt(1i128 << 80))]);
    let err = block_on(collect::to_string(doc, EncodeOptions::new())).unwrap_err();
    assert!(matches!(err, EncodeError::UnsupportedType("bigint")));
}

#[test]
fn test_large_array_batches() {
    // Well past the per-advance expansion batch.
    let n = 2500i64;
    let doc = Value::Array((0..n).map(Value::Int).collect());
    let text = encode(doc);
    let expected = format!(
        "[{}]",
        (0..n).map(|i| i.to_string()).collect::<Vec<_>>().join(",")
    );
    assert_eq!(text, expected);
}

#[test]
fn test_chunked_output_reassembles() {
    let doc = Value::array((0..100i64).collect::<Vec<_>>());
    let opts = EncodeOptions::new().with_chunk_hint(7);
    let chunks: Vec<bytes::Bytes> = block_on(
        JsonEncoder::with_options(doc, opts).try_collect::<Vec<_>>(),
    )
    .unwrap();
    assert!(chunks.len() > 10);
    let text = String::from_utf8(chunks.concat()).unwrap();
    let parsed: Vec<i64> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, (0..100).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_deferred_value_on_a_runtime() {
    let doc = Value::object([(
        "v",
        Value::future(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            Ok(Value::from(7i64))
        }),
    )]);
    let text = collect::to_string(doc, EncodeOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(text, r#"{"v":7}"#);
}

#[test]
fn test_output_parses_as_json() {
    let doc = Value::object([
        ("title", Value::from("weekly report")),
        ("tags", Value::array(["a", "b"])),
        (
            "meta",
            Value::object([("depth", Value::from(2i64)), ("ratio", Value::from(0.5f64))]),
        ),
    ]);
    let text = encode(doc);
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["title"], "weekly report");
    assert_eq!(parsed["tags"][1], "b");
    assert_eq!(parsed["meta"]["depth"], 2);
}
