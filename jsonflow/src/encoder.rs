// SPDX-License-Identifier: Apache-2.0

//! The incremental encoding engine.
//!
//! [`JsonEncoder`] owns a deque of frames, front active. Each poll loop
//! iteration advances the front frame by one unit of work, appends its
//! text fragment to the output buffer and splices its children in ahead
//! of it, depth first. The buffer is handed out as a chunk once it
//! reaches the configured hint size, so output cost stays proportional
//! to consumption regardless of document size.
//!
//! Suspension is inherited from the frames: when the front frame has to
//! wait on its input the encoder yields whatever it has buffered, or
//! suspends itself when the buffer is empty. Failure is terminal; every
//! frame still on the stack is told to release its source before the
//! error is handed out.

use crate::encode_error::EncodeError;
use crate::frame::{classify, Frame};
use crate::options::EncodeOptions;
use crate::value::Value;
use bytes::{Bytes, BytesMut};
use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures_core::Stream;
use log::{debug, trace};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq)]
enum EngineState {
    Running,
    Finished,
    Failed,
}

/// Incremental JSON encoder: a [`Stream`] of output chunks for one value.
///
/// ```
/// use futures::executor::block_on;
/// use futures::TryStreamExt;
/// use jsonflow::{JsonEncoder, Value};
///
/// let doc = Value::object([("id", Value::from(7i64)), ("ok", Value::from(true))]);
/// let chunks: Vec<_> = block_on(JsonEncoder::new(doc).try_collect()).unwrap();
/// let text: Vec<u8> = chunks.concat();
/// assert_eq!(text, br#"{"id":7,"ok":true}"#);
/// ```
pub struct JsonEncoder {
    stack: VecDeque<Frame>,
    buf: BytesMut,
    opts: EncodeOptions,
    state: EngineState,
    /// Root classification error, reported on the first poll.
    pending_err: Option<EncodeError>,
}

impl JsonEncoder {
    /// Encode `value` with default options.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::with_options(value, EncodeOptions::new())
    }

    /// Encode `value` with the given options.
    pub fn with_options(value: impl Into<Value>, opts: EncodeOptions) -> Self {
        let root = opts.replace_root(value.into());
        let mut stack = VecDeque::new();
        let mut pending_err = None;
        match root {
            // An absent root produces no output at all, not `null`.
            Value::Undefined => {
                debug!("encoding session over an absent root; no output");
            }
            root => match classify(root, &opts, 0) {
                Ok(frame) => stack.push_back(frame),
                Err(err) => pending_err = Some(err),
            },
        }
        Self {
            stack,
            buf: BytesMut::new(),
            opts,
            state: EngineState::Running,
            pending_err,
        }
    }

    /// Release every open source early. Invoked on failure and on drop of
    /// an unfinished session; each source's hook runs at most once.
    fn release_sources(&mut self) {
        for frame in self.stack.iter_mut() {
            frame.abort();
        }
        self.stack.clear();
    }

    fn fail(&mut self, err: EncodeError) -> Poll<Option<Result<Bytes, EncodeError>>> {
        debug!("encoding session failed: {err}");
        self.release_sources();
        self.buf.clear();
        self.state = EngineState::Failed;
        Poll::Ready(Some(Err(err)))
    }

    fn take_chunk(&mut self) -> Bytes {
        let chunk = self.buf.split().freeze();
        trace!("yielding {} byte chunk", chunk.len());
        chunk
    }
}

impl Stream for JsonEncoder {
    type Item = Result<Bytes, EncodeError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.state != EngineState::Running {
            return Poll::Ready(None);
        }
        if let Some(err) = this.pending_err.take() {
            return this.fail(err);
        }

        loop {
            let Some(front) = this.stack.front_mut() else {
                if !this.buf.is_empty() {
                    return Poll::Ready(Some(Ok(this.take_chunk())));
                }
                debug!("encoding session complete");
                this.state = EngineState::Finished;
                return Poll::Ready(None);
            };

            let step = match front.advance(cx, &this.opts) {
                Poll::Pending => {
                    // Hand out partial output instead of sitting on it;
                    // the front frame has already arranged a wakeup.
                    if !this.buf.is_empty() {
                        return Poll::Ready(Some(Ok(this.take_chunk())));
                    }
                    return Poll::Pending;
                }
                Poll::Ready(Err(err)) => return this.fail(err),
                Poll::Ready(Ok(step)) => step,
            };

            if step.done {
                this.stack.pop_front();
            }
            for child in step.children.into_iter().rev() {
                this.stack.push_front(child);
            }
            if let Some(text) = step.text {
                this.buf.extend_from_slice(&text);
            }
            if this.buf.len() >= this.opts.chunk_hint() {
                return Poll::Ready(Some(Ok(this.take_chunk())));
            }
        }
    }
}

impl Drop for JsonEncoder {
    fn drop(&mut self) {
        if self.state == EngineState::Running {
            self.release_sources();
        }
    }
}

impl fmt::Debug for JsonEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonEncoder")
            .field("frames", &self.stack.len())
            .field("buffered", &self.buf.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
