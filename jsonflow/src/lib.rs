// SPDX-License-Identifier: Apache-2.0

//! Incremental JSON encoding over asynchronous inputs.
//!
//! `jsonflow` turns one [`Value`] into a stream of JSON text chunks. Plain
//! data is encoded in place; deferred values and pull sources are awaited
//! mid-document, so a multi-gigabyte record set or file body is embedded
//! without ever being resident in memory. Output is produced strictly in
//! document order and only as fast as the consumer polls.
//!
//! ```
//! use futures::executor::block_on;
//! use jsonflow::{collect, ChunkSource, EncodeOptions, Value};
//!
//! let doc = Value::object([
//!     ("name", Value::from("report")),
//!     ("body", Value::text_stream(ChunkSource::full_slice(&b"line one"[..]))),
//! ]);
//! let text = block_on(collect::to_string(doc, EncodeOptions::new()))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(text, r#"{"name":"report","body":"line one"}"#);
//! ```

pub mod collect;

mod encode_error;
pub use encode_error::{EncodeError, SourceError};

mod encoder;
pub use encoder::JsonEncoder;

mod escape;

mod frame;

mod options;
pub use options::{EncodeOptions, Replacer};

mod source;
pub use source::{
    ByteSource, ChunkSource, ElementSource, ElementsSource, StreamElements, StreamSource,
};

mod source_frame;

mod value;
pub use value::{LazyFn, Value, ValueFuture};
