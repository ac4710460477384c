// SPDX-License-Identifier: Apache-2.0

//! Pull-source contracts and in-memory adapters.
//!
//! A pull source hands out data only when asked. The notification side of
//! the contract rides on the task system: a source that has nothing ready
//! returns [`Poll::Pending`] after arranging for the stored waker to fire
//! when data or end-of-source arrives. `Ready(None)` is the end
//! notification, `Ready(Some(Err(..)))` the error notification.
//!
//! For production use you'll typically implement one of the traits for
//! your own input, or wrap an existing [`futures_core::Stream`] with
//! [`StreamSource`] / [`StreamElements`]:
//!
//! - **File/network bytes**: a `Stream` of `Bytes` chunks, embedded as a
//!   JSON string or raw fragment.
//! - **Query results, events**: a `Stream` of [`Value`] items, embedded as
//!   a JSON array.
//! - **In-memory data**: [`ChunkSource`] / [`ElementsSource`], which also
//!   serve as the test doubles throughout this crate.

use crate::encode_error::SourceError;
use crate::value::Value;
use bytes::Bytes;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures_core::Stream;
use std::collections::VecDeque;

/// A pull source yielding byte chunks, embedded as a JSON string
/// ([`Value::text_stream`]) or a raw fragment ([`Value::raw_stream`]).
///
/// # Contract
/// - `poll_chunk` returning `Ready(None)` is terminal; implementations
///   **MUST NOT** yield further data after it.
/// - `Pending` **MUST** arrange a wakeup via the context's waker.
/// - For text embedding, chunks must be valid UTF-8 and must not split a
///   multi-byte character across chunk boundaries.
pub trait ByteSource: Send {
    /// Non-blocking read: the next chunk, an error, end-of-source, or
    /// `Pending` when nothing is available yet.
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, SourceError>>>;

    /// Whether the source was already consumed to its end. Embedding an
    /// ended source is a usage error.
    fn is_ended(&self) -> bool {
        false
    }

    /// Whether another consumer is already driving this source. Embedding
    /// a flowing source is a usage error; the encoder only pulls.
    fn is_flowing(&self) -> bool {
        false
    }

    /// Release the source early. Called at most once, on cancellation or
    /// failure of the encoding session, and never after the source ended
    /// or errored on its own.
    fn abort(&mut self) {}
}

/// A pull source yielding discrete values, embedded as a JSON array
/// ([`Value::element_stream`]). Same contract as [`ByteSource`].
pub trait ElementSource: Send {
    /// Non-blocking read of the next element.
    fn poll_element(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Value, SourceError>>>;

    /// See [`ByteSource::is_ended`].
    fn is_ended(&self) -> bool {
        false
    }

    /// See [`ByteSource::is_flowing`].
    fn is_flowing(&self) -> bool {
        false
    }

    /// See [`ByteSource::abort`].
    fn abort(&mut self) {}
}

/// A [`ByteSource`] that replays an in-memory buffer, optionally in
/// fixed-size chunks.
///
/// Always ready: never returns `Pending`. Useful for embedding data that
/// is already in memory, for demos, and for stress-testing chunk-boundary
/// handling the same way a network source would exercise it.
#[derive(Debug)]
pub struct ChunkSource {
    data: Bytes,
    pos: usize,
    chunk_size: usize,
    ended: bool,
    aborted: bool,
}

impl ChunkSource {
    /// Replay `data` at most `chunk_size` bytes per read (minimum 1).
    pub fn new(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            chunk_size: chunk_size.max(1),
            ended: false,
            aborted: false,
        }
    }

    /// Replay `data` in one single read.
    pub fn full_slice(data: impl Into<Bytes>) -> Self {
        Self::new(data, usize::MAX)
    }

    /// Whether [`ByteSource::abort`] was invoked.
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }
}

impl ByteSource for ChunkSource {
    fn poll_chunk(&mut self, _cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, SourceError>>> {
        if self.aborted || self.pos >= self.data.len() {
            self.ended = true;
            return Poll::Ready(None);
        }
        let end = self.data.len().min(self.pos.saturating_add(self.chunk_size));
        let chunk = self.data.slice(self.pos..end);
        self.pos = end;
        Poll::Ready(Some(Ok(chunk)))
    }

    fn is_ended(&self) -> bool {
        self.ended
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

/// An [`ElementSource`] that yields a prepared list of values.
pub struct ElementsSource {
    items: VecDeque<Value>,
    ended: bool,
    aborted: bool,
}

impl ElementsSource {
    pub fn new(items: impl IntoIterator<Item = Value>) -> Self {
        Self {
            items: items.into_iter().collect(),
            ended: false,
            aborted: false,
        }
    }

    /// Whether [`ElementSource::abort`] was invoked.
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }
}

impl ElementSource for ElementsSource {
    fn poll_element(&mut self, _cx: &mut Context<'_>) -> Poll<Option<Result<Value, SourceError>>> {
        if self.aborted {
            self.ended = true;
            return Poll::Ready(None);
        }
        match self.items.pop_front() {
            Some(value) => Poll::Ready(Some(Ok(value))),
            None => {
                self.ended = true;
                Poll::Ready(None)
            }
        }
    }

    fn is_ended(&self) -> bool {
        self.ended
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

/// Adapter embedding any [`Stream`] of byte chunks as a [`ByteSource`].
///
/// Aborting drops nothing eagerly; the wrapped stream is released when the
/// encoder frame holding it is destroyed.
pub struct StreamSource<S> {
    inner: S,
    ended: bool,
}

impl<S> StreamSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            ended: false,
        }
    }
}

impl<S, E> ByteSource for StreamSource<S>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin,
    E: Into<SourceError>,
{
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, SourceError>>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err.into()))),
            Poll::Ready(None) => {
                self.ended = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_ended(&self) -> bool {
        self.ended
    }
}

/// Adapter embedding any [`Stream`] of values as an [`ElementSource`].
pub struct StreamElements<S> {
    inner: S,
    ended: bool,
}

impl<S> StreamElements<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            ended: false,
        }
    }
}

impl<S, E> ElementSource for StreamElements<S>
where
    S: Stream<Item = Result<Value, E>> + Send + Unpin,
    E: Into<SourceError>,
{
    fn poll_element(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Value, SourceError>>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(value))) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err.into()))),
            Poll::Ready(None) => {
                self.ended = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_ended(&self) -> bool {
        self.ended
    }
}
