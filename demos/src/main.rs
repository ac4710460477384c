// SPDX-License-Identifier: Apache-2.0

//! Streams a small report document to stdout, chunk by chunk, with a
//! file-like byte source and a deferred value embedded mid-document.

use futures::executor::block_on;
use futures::StreamExt;
use jsonflow::{ChunkSource, ElementsSource, EncodeOptions, JsonEncoder, Value};
use std::io::Write;

fn main() {
    let body = ChunkSource::new(&b"All systems nominal.\nNext review in 30 days."[..], 16);
    let rows = ElementsSource::new([
        Value::object([("check", Value::from("disk")), ("ok", Value::from(true))]),
        Value::object([("check", Value::from("network")), ("ok", Value::from(true))]),
    ]);
    let doc = Value::object([
        ("title", Value::from("status report")),
        ("generated", Value::future(async { Ok(Value::from("2026-01-01")) })),
        ("body", Value::text_stream(body)),
        ("checks", Value::element_stream(rows)),
    ]);

    let opts = EncodeOptions::new()
        .with_indent_spaces(2)
        .with_chunk_hint(32);
    let mut encoder = JsonEncoder::with_options(doc, opts);

    block_on(async {
        let mut stdout = std::io::stdout();
        let mut chunks = 0usize;
        while let Some(chunk) = encoder.next().await {
            match chunk {
                Ok(bytes) => {
                    chunks += 1;
                    stdout.write_all(&bytes).expect("stdout write failed");
                }
                Err(err) => {
                    eprintln!("encoding failed: {err}");
                    std::process::exit(1);
                }
            }
        }
        println!();
        eprintln!("({chunks} chunks)");
    });
}
