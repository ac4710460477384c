// SPDX-License-Identifier: Apache-2.0

//! The input value model.
//!
//! [`Value`] is a closed union over every category the encoder accepts.
//! Plain data lives in owned containers, so a value is always a tree —
//! circular structures cannot be built. The remaining variants carry the
//! late-bound inputs: a surrogate hook, a deferred value and the three
//! tagged pull-source kinds.

use crate::encode_error::SourceError;
use crate::source::{ByteSource, ElementSource};
use core::fmt;
use core::future::Future;
use core::pin::Pin;

/// A deferred value: settles once with either a value or a failure.
pub type ValueFuture = Pin<Box<dyn Future<Output = Result<Value, SourceError>> + Send>>;

/// One-shot surrogate hook, see [`Value::lazy`].
pub type LazyFn = Box<dyn FnOnce() -> Value + Send>;

/// A JSON-encodable value graph.
pub enum Value {
    /// Encodes as `null`.
    Null,
    /// No value: dropped as an object member, `null` as an array element,
    /// no output at the root.
    Undefined,
    Bool(bool),
    Int(i64),
    /// Non-finite floats encode as `null`.
    Float(f64),
    /// 128-bit integers exceed the interoperable JSON number range and are
    /// rejected at classification time.
    BigInt(i128),
    String(String),
    Array(Vec<Value>),
    /// Keyed record; member order is preserved in the output.
    Object(Vec<(String, Value)>),
    /// Surrogate hook: the returned value is encoded in this one's place.
    Lazy(LazyFn),
    /// Deferred value, encoded once it settles.
    Future(ValueFuture),
    /// Pull source embedded as one JSON string, chunks escaped.
    TextStream(Box<dyn ByteSource>),
    /// Pull source embedded as a JSON array, one element per item.
    ElementStream(Box<dyn ElementSource>),
    /// Pull source spliced in verbatim. The bytes are not validated; the
    /// caller guarantees they form a syntactically valid JSON fragment.
    RawStream(Box<dyn ByteSource>),
}

impl Value {
    /// Embed a surrogate hook. The hook runs when the value is reached
    /// during encoding and its result is classified in this value's place;
    /// a hook returning another `Lazy` is re-invoked, so the hook supplier
    /// must ensure the chain terminates.
    pub fn lazy<F>(f: F) -> Self
    where
        F: FnOnce() -> Value + Send + 'static,
    {
        Value::Lazy(Box::new(f))
    }

    /// Embed a deferred value.
    pub fn future<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Value, SourceError>> + Send + 'static,
    {
        Value::Future(Box::pin(fut))
    }

    /// Embed a byte source as a JSON string. Chunks must be valid UTF-8
    /// and must not split a multi-byte character across chunk boundaries.
    pub fn text_stream<S>(source: S) -> Self
    where
        S: ByteSource + 'static,
    {
        Value::TextStream(Box::new(source))
    }

    /// Embed an element source as a JSON array.
    pub fn element_stream<S>(source: S) -> Self
    where
        S: ElementSource + 'static,
    {
        Value::ElementStream(Box::new(source))
    }

    /// Splice a byte source in verbatim, without quoting or escaping.
    pub fn raw_stream<S>(source: S) -> Self
    where
        S: ByteSource + 'static,
    {
        Value::RawStream(Box::new(source))
    }

    /// Build an object from key/value pairs, preserving iteration order.
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build an array from values.
    pub fn array<V>(items: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Undefined => f.write_str("Undefined"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::BigInt(n) => f.debug_tuple("BigInt").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(entries) => f.debug_tuple("Object").field(entries).finish(),
            Value::Lazy(_) => f.write_str("Lazy(..)"),
            Value::Future(_) => f.write_str("Future(..)"),
            Value::TextStream(_) => f.write_str("TextStream(..)"),
            Value::ElementStream(_) => f.write_str("ElementStream(..)"),
            Value::RawStream(_) => f.write_str("RawStream(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(n: $ty) -> Self {
                Value::Int(n as i64)
            }
        })*
    };
}
from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Float(n as f64),
        }
    }
}

impl From<i128> for Value {
    fn from(n: i128) -> Self {
        Value::BigInt(n)
    }
}

impl TryFrom<u128> for Value {
    type Error = core::num::TryFromIntError;

    /// Fails above `i128::MAX`; there is no wider integer variant and a
    /// lossy fallback would misrepresent the value.
    fn try_from(n: u128) -> Result<Self, Self::Error> {
        i128::try_from(n).map(Value::BigInt)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x as f64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
