// SPDX-License-Identifier: Apache-2.0

//! Frames embedding pull sources into the document.
//!
//! All three variants run the same state machine over their source:
//!
//! ```text
//! First ──▶ Waiting ──▶ Ended
//!              │
//!              └──▶ Failed
//! ```
//!
//! `First` emits the opening token (`"` for text, `[` for element arrays,
//! nothing for raw) and is skipped entirely for raw sources. `Waiting`
//! covers both the suspended and the readable phases: a poll of the source
//! either suspends the frame or produces data, the end notification, or
//! the error notification. `Ended` emits the closing token and completes;
//! after `Failed` no closing token is ever emitted.
//!
//! Every frame here exposes `abort`, invoked by the engine on cancellation
//! or failure. The source's own abort hook runs at most once, and not at
//! all when the source already ended or errored by itself.

use crate::encode_error::EncodeError;
use crate::escape;
use crate::frame::{classify, Frame, Step};
use crate::options::EncodeOptions;
use crate::source::{ByteSource, ElementSource};
use bytes::{BufMut, Bytes, BytesMut};
use core::task::{Context, Poll};
use log::trace;

#[derive(Clone, Copy, Debug, PartialEq)]
enum SourceState {
    First,
    Waiting,
    Ended,
    Failed,
}

/// State tracking shared by the byte-backed frames.
struct ByteCore {
    source: Box<dyn ByteSource>,
    state: SourceState,
    aborted: bool,
}

impl ByteCore {
    /// Embed-time usage checks: the encoder only pulls, and only from a
    /// source nobody consumed or is consuming.
    fn new(source: Box<dyn ByteSource>, state: SourceState) -> Result<Self, EncodeError> {
        if source.is_ended() {
            return Err(EncodeError::SourceEnded);
        }
        if source.is_flowing() {
            return Err(EncodeError::SourceFlowing);
        }
        Ok(Self {
            source,
            state,
            aborted: false,
        })
    }

    fn poll_data(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, EncodeError>>> {
        match self.source.poll_chunk(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                trace!("byte source ended");
                self.state = SourceState::Ended;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(err))) => {
                trace!("byte source failed: {err}");
                self.state = SourceState::Failed;
                Poll::Ready(Some(Err(EncodeError::Source(err))))
            }
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
        }
    }

    fn abort(&mut self) {
        if self.aborted || matches!(self.state, SourceState::Ended | SourceState::Failed) {
            return;
        }
        trace!("aborting open byte source");
        self.aborted = true;
        self.source.abort();
    }
}

impl Drop for ByteCore {
    fn drop(&mut self) {
        // A frame discarded while its source is still open releases it;
        // abort is guarded, so an explicit abort beforehand is fine.
        self.abort();
    }
}

/// Same tracking for element-backed frames.
struct ElementCore {
    source: Box<dyn ElementSource>,
    state: SourceState,
    aborted: bool,
}

impl ElementCore {
    fn new(source: Box<dyn ElementSource>) -> Result<Self, EncodeError> {
        if source.is_ended() {
            return Err(EncodeError::SourceEnded);
        }
        if source.is_flowing() {
            return Err(EncodeError::SourceFlowing);
        }
        Ok(Self {
            source,
            state: SourceState::First,
            aborted: false,
        })
    }

    fn poll_data(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<crate::value::Value, EncodeError>>> {
        match self.source.poll_element(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                trace!("element source ended");
                self.state = SourceState::Ended;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(err))) => {
                trace!("element source failed: {err}");
                self.state = SourceState::Failed;
                Poll::Ready(Some(Err(EncodeError::Source(err))))
            }
            Poll::Ready(Some(Ok(value))) => Poll::Ready(Some(Ok(value))),
        }
    }

    fn abort(&mut self) {
        if self.aborted || matches!(self.state, SourceState::Ended | SourceState::Failed) {
            return;
        }
        trace!("aborting open element source");
        self.aborted = true;
        self.source.abort();
    }
}

impl Drop for ElementCore {
    fn drop(&mut self) {
        self.abort();
    }
}

fn done_step(text: Option<Bytes>) -> Step {
    Step {
        text,
        children: Vec::new(),
        done: true,
    }
}

fn text_step(text: Bytes) -> Step {
    Step {
        text: Some(text),
        children: Vec::new(),
        done: false,
    }
}

/// Byte source embedded as one JSON string; every chunk is escaped.
pub(crate) struct TextStreamFrame {
    core: ByteCore,
}

impl core::fmt::Debug for TextStreamFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("TextStreamFrame(..)")
    }
}

impl TextStreamFrame {
    pub(crate) fn new(source: Box<dyn ByteSource>) -> Result<Self, EncodeError> {
        Ok(Self {
            core: ByteCore::new(source, SourceState::First)?,
        })
    }

    pub(crate) fn advance(&mut self, cx: &mut Context<'_>) -> Poll<Result<Step, EncodeError>> {
        match self.core.state {
            SourceState::First => {
                self.core.state = SourceState::Waiting;
                Poll::Ready(Ok(text_step(Bytes::from_static(b"\""))))
            }
            SourceState::Waiting => match self.core.poll_data(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(None) => {
                    Poll::Ready(Ok(done_step(Some(Bytes::from_static(b"\"")))))
                }
                Poll::Ready(Some(Err(err))) => Poll::Ready(Err(err)),
                Poll::Ready(Some(Ok(chunk))) => {
                    let text = match core::str::from_utf8(&chunk) {
                        Ok(text) => text,
                        Err(err) => {
                            // The fault was detected here, not signaled by
                            // the source, so the source is still open and
                            // must be released.
                            self.core.abort();
                            self.core.state = SourceState::Failed;
                            return Poll::Ready(Err(EncodeError::InvalidUtf8(err)));
                        }
                    };
                    let mut out = BytesMut::with_capacity(chunk.len() + 8);
                    escape::escape_into(text, &mut out);
                    Poll::Ready(Ok(text_step(out.freeze())))
                }
            },
            SourceState::Ended | SourceState::Failed => Poll::Ready(Ok(done_step(None))),
        }
    }

    pub(crate) fn abort(&mut self) {
        self.core.abort();
    }
}

/// Byte source spliced in verbatim; no delimiters, no escaping. The bytes
/// are the caller's trust boundary and are not validated.
pub(crate) struct RawStreamFrame {
    core: ByteCore,
}

impl RawStreamFrame {
    pub(crate) fn new(source: Box<dyn ByteSource>) -> Result<Self, EncodeError> {
        // No opening token, so the frame starts out waiting for data.
        Ok(Self {
            core: ByteCore::new(source, SourceState::Waiting)?,
        })
    }

    pub(crate) fn advance(&mut self, cx: &mut Context<'_>) -> Poll<Result<Step, EncodeError>> {
        match self.core.state {
            SourceState::Waiting => match self.core.poll_data(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(None) => Poll::Ready(Ok(done_step(None))),
                Poll::Ready(Some(Err(err))) => Poll::Ready(Err(err)),
                Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Ok(text_step(chunk))),
            },
            _ => Poll::Ready(Ok(done_step(None))),
        }
    }

    pub(crate) fn abort(&mut self) {
        self.core.abort();
    }
}

/// Element source embedded as a JSON array; every element re-enters the
/// factory, so nested containers, deferred values and further sources all
/// work inside it.
pub(crate) struct ElementStreamFrame {
    core: ElementCore,
    /// Depth of the array body.
    depth: usize,
    first_sent: bool,
}

impl ElementStreamFrame {
    pub(crate) fn new(source: Box<dyn ElementSource>, depth: usize) -> Result<Self, EncodeError> {
        Ok(Self {
            core: ElementCore::new(source)?,
            depth: depth + 1,
            first_sent: false,
        })
    }

    pub(crate) fn advance(
        &mut self,
        cx: &mut Context<'_>,
        opts: &EncodeOptions,
    ) -> Poll<Result<Step, EncodeError>> {
        match self.core.state {
            SourceState::First => {
                // The body gap waits for the first element, so an empty
                // stream still renders the inline `[]`.
                self.core.state = SourceState::Waiting;
                Poll::Ready(Ok(text_step(Bytes::from_static(b"["))))
            }
            SourceState::Waiting => match self.core.poll_data(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(None) => {
                    let mut text = BytesMut::new();
                    if self.first_sent {
                        opts.write_gap(self.depth - 1, &mut text);
                    }
                    text.put_u8(b']');
                    Poll::Ready(Ok(done_step(Some(text.freeze()))))
                }
                Poll::Ready(Some(Err(err))) => Poll::Ready(Err(err)),
                Poll::Ready(Some(Ok(value))) => {
                    let mut text = BytesMut::new();
                    let mut children = Vec::with_capacity(2);
                    if self.first_sent {
                        children.push(Frame::separator(opts, self.depth));
                    } else {
                        opts.write_gap(self.depth, &mut text);
                    }
                    self.first_sent = true;
                    // A classification failure here is the element's fault,
                    // not the source's: leave the state alone so cleanup
                    // still aborts the open source.
                    match classify(value, opts, self.depth) {
                        Ok(frame) => {
                            children.push(frame);
                            Poll::Ready(Ok(Step {
                                text: (!text.is_empty()).then(|| text.freeze()),
                                children,
                                done: false,
                            }))
                        }
                        Err(err) => Poll::Ready(Err(err)),
                    }
                }
            },
            SourceState::Ended | SourceState::Failed => Poll::Ready(Ok(done_step(None))),
        }
    }

    pub(crate) fn abort(&mut self) {
        self.core.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChunkSource, ElementsSource};
    use crate::value::Value;
    use futures::task::noop_waker_ref;

    fn drain(advance: &mut dyn FnMut(&mut Context<'_>) -> Poll<Result<Step, EncodeError>>) -> String {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut out = Vec::new();
        loop {
            match advance(&mut cx) {
                Poll::Ready(Ok(step)) => {
                    if let Some(text) = step.text {
                        out.extend_from_slice(&text);
                    }
                    assert!(step.children.is_empty(), "drain only handles leaf steps");
                    if step.done {
                        break;
                    }
                }
                other => panic!("unexpected poll result: {:?}", other.map(|r| r.map(|_| ()))),
            }
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_stream_escapes_chunks() {
        let source = ChunkSource::new(&b"a\nb"[..], 2);
        let mut frame = TextStreamFrame::new(Box::new(source)).unwrap();
        assert_eq!(drain(&mut |cx| frame.advance(cx)), "\"a\\nb\"");
    }

    #[test]
    fn test_raw_stream_passes_through() {
        let source = ChunkSource::new(&br#"{"pre":1}"#[..], 3);
        let mut frame = RawStreamFrame::new(Box::new(source)).unwrap();
        assert_eq!(drain(&mut |cx| frame.advance(cx)), r#"{"pre":1}"#);
    }

    #[test]
    fn test_ended_source_rejected_at_embed_time() {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut source = ChunkSource::full_slice(&b""[..]);
        // Consume to the end first.
        assert!(matches!(source.poll_chunk(&mut cx), Poll::Ready(None)));
        let err = TextStreamFrame::new(Box::new(source)).unwrap_err();
        assert!(matches!(err, EncodeError::SourceEnded));
    }

    #[test]
    fn test_abort_runs_once_and_skips_ended() {
        let source = ChunkSource::new(&b"abc"[..], 1);
        let mut frame = TextStreamFrame::new(Box::new(source)).unwrap();
        frame.abort();
        frame.abort();
        // The second call must not re-invoke the source hook; the flag is
        // only flipped once.
        assert!(frame.core.aborted);

        let source = ChunkSource::full_slice(&b""[..]);
        let mut frame = TextStreamFrame::new(Box::new(source)).unwrap();
        let _ = drain(&mut |cx| frame.advance(cx));
        frame.abort();
        assert!(!frame.core.aborted, "ended source must not be aborted");
    }

    #[test]
    fn test_invalid_utf8_chunk_releases_source() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        // Yields one lone continuation byte and counts release calls; the
        // source itself never reports an error.
        struct BadUtf8 {
            sent: bool,
            aborts: Arc<AtomicUsize>,
        }

        impl ByteSource for BadUtf8 {
            fn poll_chunk(
                &mut self,
                _cx: &mut Context<'_>,
            ) -> Poll<Option<Result<Bytes, crate::encode_error::SourceError>>> {
                if self.sent {
                    return Poll::Ready(None);
                }
                self.sent = true;
                Poll::Ready(Some(Ok(Bytes::from_static(&[0x80]))))
            }

            fn abort(&mut self) {
                self.aborts.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut cx = Context::from_waker(noop_waker_ref());
        let aborts = Arc::new(AtomicUsize::new(0));
        let source = BadUtf8 {
            sent: false,
            aborts: Arc::clone(&aborts),
        };
        let mut frame = TextStreamFrame::new(Box::new(source)).unwrap();

        let Poll::Ready(Ok(step)) = frame.advance(&mut cx) else {
            panic!("expected opening quote");
        };
        assert_eq!(step.text.as_deref(), Some(&b"\""[..]));

        let Poll::Ready(Err(err)) = frame.advance(&mut cx) else {
            panic!("expected the decode failure");
        };
        assert!(matches!(err, EncodeError::InvalidUtf8(_)));
        // The fault was detected by the frame, not signaled by the source,
        // so the release hook runs right away and only once; the later
        // cleanup pass skips the frame.
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
        frame.abort();
        drop(frame);
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_element_stream_separators() {
        let mut cx = Context::from_waker(noop_waker_ref());
        let opts = EncodeOptions::new();
        let source = ElementsSource::new([Value::from(1i64), Value::from(2i64)]);
        let mut frame = ElementStreamFrame::new(Box::new(source), 0).unwrap();

        // Opening token.
        let Poll::Ready(Ok(step)) = frame.advance(&mut cx, &opts) else {
            panic!("expected opening step");
        };
        assert_eq!(step.text.as_deref(), Some(&b"["[..]));

        // First element: no separator.
        let Poll::Ready(Ok(step)) = frame.advance(&mut cx, &opts) else {
            panic!("expected element step");
        };
        assert_eq!(step.children.len(), 1);

        // Second element: separator + element.
        let Poll::Ready(Ok(step)) = frame.advance(&mut cx, &opts) else {
            panic!("expected element step");
        };
        assert_eq!(step.children.len(), 2);

        // End: closing token.
        let Poll::Ready(Ok(step)) = frame.advance(&mut cx, &opts) else {
            panic!("expected closing step");
        };
        assert_eq!(step.text.as_deref(), Some(&b"]"[..]));
        assert!(step.done);
    }
}
