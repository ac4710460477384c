// SPDX-License-Identifier: Apache-2.0

//! Encoding frames and the classification factory.
//!
//! A frame is one unit of encoding work for exactly one input value. The
//! engine keeps a stack of frames and advances the front one; each advance
//! yields at most one text fragment plus any child frames, which are
//! prepended ahead of the remaining stack in document order. Composite and
//! literal frames never suspend; only the deferred and source frames do.

use crate::encode_error::EncodeError;
use crate::escape;
use crate::options::EncodeOptions;
use crate::source_frame::{ElementStreamFrame, RawStreamFrame, TextStreamFrame};
use crate::value::{Value, ValueFuture};
use bytes::{BufMut, Bytes, BytesMut};
use core::task::{Context, Poll};
use std::collections::VecDeque;

/// Max array elements expanded per advance call, to bound per-call work on
/// very large arrays.
const ARRAY_BATCH: usize = 1000;

/// Result of advancing one frame.
pub(crate) struct Step {
    /// Text fragment emitted by this call, if any.
    pub(crate) text: Option<Bytes>,
    /// Child frames, in document order.
    pub(crate) children: Vec<Frame>,
    /// Whether the frame is complete and leaves the stack.
    pub(crate) done: bool,
}

/// One unit of encoding work. Closed union: every accepted value category
/// maps to exactly one variant here.
pub(crate) enum Frame {
    Literal(LiteralFrame),
    Array(ArrayFrame),
    Object(ObjectFrame),
    Deferred(DeferredFrame),
    Text(TextStreamFrame),
    Elements(ElementStreamFrame),
    Raw(RawStreamFrame),
}

impl core::fmt::Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Frame::Literal(_) => f.write_str("Literal(..)"),
            Frame::Array(_) => f.write_str("Array(..)"),
            Frame::Object(_) => f.write_str("Object(..)"),
            Frame::Deferred(_) => f.write_str("Deferred(..)"),
            Frame::Text(_) => f.write_str("Text(..)"),
            Frame::Elements(_) => f.write_str("Elements(..)"),
            Frame::Raw(_) => f.write_str("Raw(..)"),
        }
    }
}

impl Frame {
    /// Advance the frame by one unit of work.
    pub(crate) fn advance(
        &mut self,
        cx: &mut Context<'_>,
        opts: &EncodeOptions,
    ) -> Poll<Result<Step, EncodeError>> {
        match self {
            Frame::Literal(frame) => Poll::Ready(Ok(frame.advance())),
            Frame::Array(frame) => Poll::Ready(frame.advance(opts)),
            Frame::Object(frame) => Poll::Ready(frame.advance(opts)),
            Frame::Deferred(frame) => frame.advance(cx, opts),
            Frame::Text(frame) => frame.advance(cx),
            Frame::Elements(frame) => frame.advance(cx, opts),
            Frame::Raw(frame) => frame.advance(cx),
        }
    }

    /// Cancellation hook; only source frames hold external resources.
    pub(crate) fn abort(&mut self) {
        match self {
            Frame::Text(frame) => frame.abort(),
            Frame::Elements(frame) => frame.abort(),
            Frame::Raw(frame) => frame.abort(),
            _ => {}
        }
    }

    fn literal(text: Bytes) -> Frame {
        Frame::Literal(LiteralFrame { text })
    }

    /// A `,` separator frame, indented at the given (inner) depth.
    pub(crate) fn separator(opts: &EncodeOptions, depth: usize) -> Frame {
        if !opts.is_indented() {
            return Frame::literal(Bytes::from_static(b","));
        }
        let mut text = BytesMut::new();
        text.put_u8(b',');
        opts.write_gap(depth, &mut text);
        Frame::literal(text.freeze())
    }

    /// A closing-delimiter frame, indented at the given (outer) depth.
    fn closing(delim: u8, opts: &EncodeOptions, depth: usize) -> Frame {
        if !opts.is_indented() {
            return Frame::literal(Bytes::copy_from_slice(&[delim]));
        }
        let mut text = BytesMut::new();
        opts.write_gap(depth, &mut text);
        text.put_u8(delim);
        Frame::literal(text.freeze())
    }
}

/// Classify `value` into the frame that encodes it at `depth`.
///
/// Surrogate hooks are invoked and their results reclassified, so chained
/// hooks resolve here. Classification itself can fail: unsupported value
/// kinds, and the embed-time usage checks on pull sources.
pub(crate) fn classify(
    mut value: Value,
    opts: &EncodeOptions,
    depth: usize,
) -> Result<Frame, EncodeError> {
    loop {
        return Ok(match value {
            Value::Lazy(hook) => {
                value = hook();
                continue;
            }
            Value::Int(n) => Frame::literal(Bytes::from(n.to_string())),
            Value::Float(x) => {
                if x.is_finite() {
                    Frame::literal(Bytes::from(x.to_string()))
                } else {
                    Frame::literal(Bytes::from_static(b"null"))
                }
            }
            Value::Bool(true) => Frame::literal(Bytes::from_static(b"true")),
            Value::Bool(false) => Frame::literal(Bytes::from_static(b"false")),
            Value::String(s) => Frame::literal(quoted(&s)),
            // Undefined reaching classification is an array element (the
            // root and object frames drop it beforehand).
            Value::Undefined | Value::Null => Frame::literal(Bytes::from_static(b"null")),
            Value::Array(items) => Frame::Array(ArrayFrame::new(items, depth)),
            Value::TextStream(source) => Frame::Text(TextStreamFrame::new(source)?),
            Value::ElementStream(source) => {
                Frame::Elements(ElementStreamFrame::new(source, depth)?)
            }
            Value::RawStream(source) => Frame::Raw(RawStreamFrame::new(source)?),
            Value::Future(fut) => Frame::Deferred(DeferredFrame::new(fut, depth)),
            Value::Object(entries) => Frame::Object(ObjectFrame::new(entries, opts, depth)),
            Value::BigInt(_) => return Err(EncodeError::UnsupportedType("bigint")),
        });
    }
}

fn quoted(s: &str) -> Bytes {
    let mut out = BytesMut::with_capacity(s.len() + 2);
    escape::quote_into(s, &mut out);
    out.freeze()
}

/// Precomputed text; completes on its first advance.
pub(crate) struct LiteralFrame {
    text: Bytes,
}

impl LiteralFrame {
    fn advance(&mut self) -> Step {
        Step {
            text: Some(core::mem::take(&mut self.text)),
            children: Vec::new(),
            done: true,
        }
    }
}

/// Ordered sequence. Expands children in index order, at most
/// [`ARRAY_BATCH`] per call.
pub(crate) struct ArrayFrame {
    items: std::vec::IntoIter<Value>,
    /// Depth of the array body; the delimiters sit one level out.
    depth: usize,
    started: bool,
}

impl ArrayFrame {
    fn new(items: Vec<Value>, depth: usize) -> Self {
        Self {
            items: items.into_iter(),
            depth: depth + 1,
            started: false,
        }
    }

    fn advance(&mut self, opts: &EncodeOptions) -> Result<Step, EncodeError> {
        if !self.started {
            self.started = true;
            if self.items.len() == 0 {
                return Ok(Step {
                    text: Some(Bytes::from_static(b"[]")),
                    children: Vec::new(),
                    done: true,
                });
            }
            let mut text = BytesMut::new();
            text.put_u8(b'[');
            opts.write_gap(self.depth, &mut text);
            return Ok(Step {
                text: Some(text.freeze()),
                children: Vec::new(),
                done: false,
            });
        }

        let mut children = Vec::new();
        let mut batched = 0;
        // Keep one item back so the loop never emits a trailing separator.
        while self.items.len() > 1 && batched < ARRAY_BATCH {
            let Some(item) = self.items.next() else { break };
            children.push(classify(item, opts, self.depth)?);
            children.push(Frame::separator(opts, self.depth));
            batched += 1;
        }
        if self.items.len() == 1 {
            if let Some(item) = self.items.next() {
                children.push(classify(item, opts, self.depth)?);
            }
        }
        if self.items.len() == 0 {
            children.push(Frame::closing(b']', opts, self.depth - 1));
            return Ok(Step {
                text: None,
                children,
                done: true,
            });
        }
        Ok(Step {
            text: None,
            children,
            done: false,
        })
    }
}

/// Keyed record. The replacer runs once at construction; surviving members
/// keep insertion order and are emitted one key per advance call.
pub(crate) struct ObjectFrame {
    entries: VecDeque<(String, Value)>,
    depth: usize,
    started: bool,
}

impl ObjectFrame {
    fn new(entries: Vec<(String, Value)>, opts: &EncodeOptions, depth: usize) -> Self {
        let mut kept = VecDeque::with_capacity(entries.len());
        for (key, value) in entries {
            if !opts.key_allowed(&key) {
                continue;
            }
            let value = opts.replace_entry(&key, value);
            if matches!(value, Value::Undefined) {
                continue;
            }
            kept.push_back((key, value));
        }
        Self {
            entries: kept,
            depth: depth + 1,
            started: false,
        }
    }

    fn advance(&mut self, opts: &EncodeOptions) -> Result<Step, EncodeError> {
        if !self.started {
            self.started = true;
            if self.entries.is_empty() {
                return Ok(Step {
                    text: Some(Bytes::from_static(b"{}")),
                    children: Vec::new(),
                    done: true,
                });
            }
            let mut text = BytesMut::new();
            text.put_u8(b'{');
            opts.write_gap(self.depth, &mut text);
            return Ok(Step {
                text: Some(text.freeze()),
                children: Vec::new(),
                done: false,
            });
        }

        let Some((key, value)) = self.entries.pop_front() else {
            let mut text = BytesMut::new();
            opts.write_gap(self.depth - 1, &mut text);
            text.put_u8(b'}');
            return Ok(Step {
                text: Some(text.freeze()),
                children: Vec::new(),
                done: true,
            });
        };

        let mut text = BytesMut::new();
        escape::quote_into(&key, &mut text);
        text.put_u8(b':');
        if opts.is_indented() {
            text.put_u8(b' ');
        }
        let mut children = vec![classify(value, opts, self.depth)?];
        if !self.entries.is_empty() {
            children.push(Frame::separator(opts, self.depth));
        }
        Ok(Step {
            text: Some(text.freeze()),
            children,
            done: false,
        })
    }
}

/// Deferred value: suspends until the future settles, then replaces itself
/// with the frame for the resolved value. A future resolving to another
/// deferred value chains transparently through reclassification.
pub(crate) struct DeferredFrame {
    future: ValueFuture,
    depth: usize,
}

impl DeferredFrame {
    fn new(future: ValueFuture, depth: usize) -> Self {
        Self { future, depth }
    }

    fn advance(
        &mut self,
        cx: &mut Context<'_>,
        opts: &EncodeOptions,
    ) -> Poll<Result<Step, EncodeError>> {
        match self.future.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(value)) => {
                Poll::Ready(classify(value, opts, self.depth).map(|frame| Step {
                    text: None,
                    children: vec![frame],
                    done: true,
                }))
            }
            Poll::Ready(Err(err)) => Poll::Ready(Err(EncodeError::Source(err))),
        }
    }
}
