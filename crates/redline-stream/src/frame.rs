//! # Line Framing
//!
//! Reassembles newline-delimited text from a chunked byte stream.
//!
//! Network chunks arrive with arbitrary boundaries: a JSON record, or even a
//! single multi-byte character, may be split across two reads. The decoder
//! keeps one pending-bytes buffer and only converts bytes to text once a
//! full `\n`-terminated line is available, so a split code point is never
//! decoded half-way.
//!
//! - [`LineDecoder`] is the synchronous core (push bytes, pull lines)
//! - [`LineStream`] adapts any `Stream<Item = Result<Bytes, E>>` into a
//!   stream of [`DecodedLine`]s, keeping the transport error for the owner

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use pin_project_lite::pin_project;
use tracing::{debug, warn};

/// Options for the line decoder.
#[derive(Clone, Copy, Debug)]
pub struct DecoderOptions {
    /// Emit an unterminated final fragment when the stream ends cleanly.
    /// Default: `true`.
    pub flush_trailing_fragment: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            flush_trailing_fragment: true,
        }
    }
}

/// One line of text recovered from the byte stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedLine {
    /// Line text without the terminator or a trailing `\r`.
    pub text: String,
    /// `false` for a trailing fragment flushed at end of stream.
    pub terminated: bool,
}

impl DecodedLine {
    fn terminated(text: String) -> Self {
        Self {
            text,
            terminated: true,
        }
    }
}

/// Incremental newline splitter over raw bytes.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: BytesMut,
    /// Prefix of `buffer` already known to contain no `\n`.
    scanned: usize,
    options: DecoderOptions,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DecoderOptions::default())
    }
}

impl LineDecoder {
    /// Create an empty decoder.
    pub fn new(options: DecoderOptions) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            scanned: 0,
            options,
        }
    }

    /// Append a chunk of bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Pop the next complete line, if one is buffered.
    pub fn next_line(&mut self) -> Option<DecodedLine> {
        let offset = self.buffer[self.scanned..].iter().position(|&b| b == b'\n');
        let Some(offset) = offset else {
            self.scanned = self.buffer.len();
            return None;
        };
        let newline_pos = self.scanned + offset;
        self.scanned = 0;

        let mut line = self.buffer.split_to(newline_pos + 1);
        line.truncate(newline_pos);
        Some(DecodedLine::terminated(decode(line)))
    }

    /// Signal a clean end of input.
    ///
    /// Returns the unterminated remainder as a final line when
    /// `flush_trailing_fragment` is set. Call after draining
    /// [`next_line`](Self::next_line).
    pub fn finish(&mut self) -> Option<DecodedLine> {
        if self.buffer.is_empty() {
            return None;
        }
        let fragment = self.buffer.split();
        self.scanned = 0;
        if !self.options.flush_trailing_fragment {
            debug!(bytes = fragment.len(), "discarding unterminated trailing fragment");
            return None;
        }
        Some(DecodedLine {
            text: decode(fragment),
            terminated: false,
        })
    }

    /// Drop any buffered partial line.
    pub fn discard(&mut self) {
        if !self.buffer.is_empty() {
            debug!(bytes = self.buffer.len(), "discarding partial line");
        }
        self.buffer.clear();
        self.scanned = 0;
    }

    /// Number of buffered bytes not yet emitted as a line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode(mut line: BytesMut) -> String {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    match std::str::from_utf8(&line) {
        Ok(s) => s.to_owned(),
        Err(e) => {
            warn!(error = %e, "invalid UTF-8 in stream line, replacing");
            String::from_utf8_lossy(&line).into_owned()
        }
    }
}

pin_project! {
    /// A stream of [`DecodedLine`]s over a fallible byte stream.
    ///
    /// A transport error ends the line stream without yielding an error
    /// item. The error is kept for [`take_error`](Self::take_error) and the
    /// partial line is discarded.
    pub struct LineStream<S, E> {
        #[pin]
        inner: S,
        decoder: LineDecoder,
        error: Option<E>,
        done: bool,
    }
}

impl<S, E> LineStream<S, E>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    /// Wrap a byte stream.
    pub fn new(inner: S, options: DecoderOptions) -> Self {
        Self {
            inner,
            decoder: LineDecoder::new(options),
            error: None,
            done: false,
        }
    }
}

impl<S, E> LineStream<S, E> {
    /// The transport error that ended the stream, if any.
    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    /// Take ownership of the transport error that ended the stream.
    pub fn take_error(&mut self) -> Option<E> {
        self.error.take()
    }

    /// Whether the underlying byte stream has ended.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl<S, E> Stream for LineStream<S, E>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    type Item = DecodedLine;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(line) = this.decoder.next_line() {
                return Poll::Ready(Some(line));
            }
            if *this.done {
                return Poll::Ready(None);
            }
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.decoder.push(&chunk),
                Some(Err(e)) => {
                    warn!(error = %e, pending = this.decoder.pending(), "stream read error");
                    this.decoder.discard();
                    *this.error = Some(e);
                    *this.done = true;
                    return Poll::Ready(None);
                }
                None => {
                    *this.done = true;
                    return Poll::Ready(this.decoder.finish());
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
