//! Event Stream
//!
//! A lazy, ordered, single-pass sequence of [`ProtocolEvent`]s over a byte
//! stream. Whatever happens underneath, a consumer observes zero or more
//! `TextDelta`s followed by exactly one terminal event (`Done` or `Error`),
//! and then `None` forever.
//!
//! The byte stream is dropped as soon as the terminal event is handed out,
//! so the connection is released even if the consumer keeps the
//! `EventStream` around.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures::stream::{self, FusedStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::decoder::EventDecoder;
use super::error::TransportError;
use crate::events::ProtocolEvent;

/// Raw response body as delivered by the transport
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

struct DecodeState {
    /// Response body; `None` once released
    bytes: Option<ByteStream>,
    decoder: EventDecoder,
    /// Events decoded from the last chunk but not yet handed out
    pending: VecDeque<ProtocolEvent>,
    cancel: CancellationToken,
}

enum Step {
    Cancelled,
    Chunk(Option<Result<Bytes, TransportError>>),
}

impl DecodeState {
    async fn next_event(&mut self) -> Option<ProtocolEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if event.is_terminal() {
                    self.release();
                }
                return Some(event);
            }

            let bytes = self.bytes.as_mut()?;

            let step = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Step::Cancelled,
                chunk = bytes.next() => Step::Chunk(chunk),
            };

            match step {
                Step::Cancelled => {
                    tracing::debug!("Response stream cancelled");
                    self.pending
                        .push_back(ProtocolEvent::error(TransportError::Cancelled.user_message()));
                }
                Step::Chunk(Some(Ok(chunk))) => {
                    self.pending.extend(self.decoder.feed(&chunk));
                }
                Step::Chunk(Some(Err(e))) => {
                    tracing::warn!(error = %e, "Response stream failed");
                    self.pending.push_back(ProtocolEvent::error(e.user_message()));
                }
                Step::Chunk(None) => {
                    self.pending.extend(self.decoder.finish());
                }
            }
        }
    }

    fn release(&mut self) {
        self.bytes = None;
        self.pending.clear();
    }
}

/// Decoded protocol events for one turn
pub struct EventStream {
    inner: Pin<Box<dyn Stream<Item = ProtocolEvent> + Send>>,
    terminated: bool,
}

impl EventStream {
    /// Decode events from a response body
    #[must_use]
    pub fn new(bytes: ByteStream, cancel: CancellationToken) -> Self {
        let state = DecodeState {
            bytes: Some(bytes),
            decoder: EventDecoder::new(),
            pending: VecDeque::new(),
            cancel,
        };

        let inner = stream::unfold(state, |mut state| async move {
            let event = state.next_event().await?;
            Some((event, state))
        });

        Self {
            inner: Box::pin(inner),
            terminated: false,
        }
    }

    /// Decode events from in-memory chunks
    pub fn from_chunks<I>(chunks: I, cancel: CancellationToken) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        let body = stream::iter(chunks.into_iter().map(Ok::<Bytes, TransportError>));
        Self::new(Box::pin(body), cancel)
    }

    /// A stream that fails before producing anything
    #[must_use]
    pub fn failed(error: &TransportError) -> Self {
        let event = ProtocolEvent::error(error.user_message());
        Self {
            inner: Box::pin(stream::iter(vec![event])),
            terminated: false,
        }
    }
}

impl Stream for EventStream {
    type Item = ProtocolEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        let item = ready!(self.inner.as_mut().poll_next(cx));
        if item.is_none() {
            self.terminated = true;
        }
        Poll::Ready(item)
    }
}

impl FusedStream for EventStream {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}
