//! Relay from a completion stream to an HTTP response body.
//!
//! ```text
//! Open --chunk--> Emitting --chunk--> Emitting
//!   |                |
//!   +--- end --------+--> Closed
//!   +--- error ------+--> Errored
//! ```
//!
//! Closed and Errored are terminal. Dropping the relay before it reaches a
//! terminal state (client went away) closes it as well, so the close path
//! runs exactly once on every exit.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use futures::{ready, Stream, StreamExt};
use tracing::{debug, error, warn};

use crate::error::StreamError;
use crate::providers::traits::CompletionStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Open,
    Emitting,
    Closed,
    Errored,
}

impl RelayState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayState::Closed | RelayState::Errored)
    }
}

pub struct ResponseRelay {
    upstream: Option<CompletionStream>,
    state: RelayState,
    chunks: usize,
    bytes: usize,
}

impl ResponseRelay {
    pub fn new(upstream: CompletionStream) -> Self {
        Self {
            upstream: Some(upstream),
            state: RelayState::Open,
            chunks: 0,
            bytes: 0,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn chunks_emitted(&self) -> usize {
        self.chunks
    }

    fn close(&mut self, state: RelayState) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        // Releases the upstream connection
        self.upstream = None;
        debug!(state = ?state, chunks = self.chunks, bytes = self.bytes, "Response stream closed");
    }
}

impl Stream for ResponseRelay {
    type Item = Result<Bytes, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let upstream = match this.upstream.as_mut() {
                Some(upstream) if !this.state.is_terminal() => upstream,
                _ => return Poll::Ready(None),
            };

            match ready!(upstream.poll_next_unpin(cx)) {
                Some(Ok(text)) => {
                    if text.is_empty() {
                        continue;
                    }
                    this.state = RelayState::Emitting;
                    this.chunks += 1;
                    this.bytes += text.len();
                    return Poll::Ready(Some(Ok(Bytes::from(text))));
                }
                Some(Err(e)) => {
                    error!("Error while streaming response: {}", e);
                    this.close(RelayState::Errored);
                    return Poll::Ready(Some(Err(StreamError::from(e))));
                }
                None => {
                    this.close(RelayState::Closed);
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl Drop for ResponseRelay {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            warn!(chunks = self.chunks, "Response stream dropped before completion");
            self.close(RelayState::Closed);
        }
    }
}
