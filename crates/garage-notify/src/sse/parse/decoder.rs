//! [`FrameDecoder`] and the [`FrameStream`] adapter that runs it over a
//! stream of [`Bytes`](bytes::Bytes) chunks.

use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll, ready},
};

use bytes::{Buf, BytesMut};
use futures_core::Stream;

use super::{
    constants::{BOM, CR},
    parser::{frame_from_line, next_line},
};
use crate::sse::types::Frame;

#[derive(Debug, Clone, Copy, Default)]
enum DecoderState {
    #[default]
    NotStarted,
    Started,
}

/// Incremental decoder from raw chunks to [`Frame`]s.
///
/// Bytes are buffered until a line terminator (LF, CRLF or CR) arrives, so
/// chunk boundaries may fall anywhere, including inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    state: DecoderState,
}

const fn starts_with_bom(buf: &[u8]) -> Option<bool> {
    match buf.len() {
        0 => None,
        1 => {
            if buf[0] == BOM[0] {
                None
            } else {
                Some(false)
            }
        }
        2 => {
            if buf[0] == BOM[0] && buf[1] == BOM[1] {
                None
            } else {
                Some(false)
            }
        }
        _gte_3 => {
            if buf[0] == BOM[0] && buf[1] == BOM[1] && buf[2] == BOM[2] {
                Some(true)
            } else {
                Some(false)
            }
        }
    }
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every frame completed by it.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        if matches!(self.state, DecoderState::NotStarted) {
            match starts_with_bom(&self.buffer) {
                Some(true) => {
                    self.state = DecoderState::Started;
                    self.buffer.advance(BOM.len());
                }
                Some(false) => self.state = DecoderState::Started,
                None => return Vec::new(),
            }
        }

        let mut frames = Vec::new();
        while let Some(line) = next_line(&mut self.buffer) {
            frames.extend(frame_from_line(&line));
        }
        frames
    }

    /// Flush the unterminated tail once the underlying stream has ended.
    pub fn finish(&mut self) -> Vec<Frame> {
        self.state = DecoderState::Started;
        let mut frames = Vec::new();
        while let Some(line) = next_line(&mut self.buffer) {
            frames.extend(frame_from_line(&line));
        }

        let mut tail = self.buffer.split();
        if tail.last() == Some(&CR) {
            tail.truncate(tail.len() - 1);
        }
        if !tail.is_empty() {
            frames.extend(frame_from_line(&tail));
        }
        frames
    }

    /// Number of bytes waiting for a line terminator.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial line, e.g. before reading a fresh connection.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::NotStarted;
    }
}

pin_project_lite::pin_project! {
    /// A [`Stream`] that converts a stream of byte chunks into [`Frame`]s.
    ///
    /// Transport errors from the inner stream are passed through; decoding
    /// never fails the stream.
    #[derive(Debug)]
    pub struct FrameStream<S> {
        #[pin]
        stream: S,
        decoder: FrameDecoder,
        pending: VecDeque<Frame>,
        terminated: bool,
    }
}

impl<S> FrameStream<S> {
    /// Wrap an underlying byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            terminated: false,
        }
    }
}

impl<S, E, B> Stream for FrameStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    type Item = Result<Frame, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(frame) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if *this.terminated {
                return Poll::Ready(None);
            }

            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.pending.extend(this.decoder.decode(chunk.as_ref())),
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => {
                    *this.terminated = true;
                    this.pending.extend(this.decoder.finish());
                }
            }
        }
    }
}
