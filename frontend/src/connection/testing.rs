//! In-memory feed transport for client tests
//!
//! Every `connect` call is recorded with its URL and the (paused) Tokio
//! instant it happened at. Tests drive each connection by index.

use super::transport::{FeedFrame, FeedStream, FeedTransport, TransportError};
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

#[derive(Default)]
struct MockState {
    attempts: Vec<Attempt>,
    live: usize,
    max_live: usize,
    refuse_remaining: usize,
}

struct Attempt {
    url: String,
    at: Instant,
    sender: Option<UnboundedSender<FeedFrame>>,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Counts a connection as live from `connect` until its stream (or the
/// pending connect future) is dropped.
struct LiveGuard(Arc<Mutex<MockState>>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.lock() {
            state.live -= 1;
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn refuse_next(&self, count: usize) {
        self.lock().refuse_remaining = count;
    }

    pub fn attempts(&self) -> usize {
        self.lock().attempts.len()
    }

    pub fn url(&self, index: usize) -> Option<String> {
        self.lock().attempts.get(index).map(|attempt| attempt.url.clone())
    }

    pub fn attempt_instant(&self, index: usize) -> Option<Instant> {
        self.lock().attempts.get(index).map(|attempt| attempt.at)
    }

    pub fn live_connections(&self) -> usize {
        self.lock().live
    }

    pub fn max_live_connections(&self) -> usize {
        self.lock().max_live
    }

    /// Deliver a text frame. `false` once the client dropped that connection.
    pub fn push(&self, index: usize, text: &str) -> bool {
        self.send(index, FeedFrame::Text(text.to_string()))
    }

    /// Report a transport failure and close the connection.
    pub fn fail(&self, index: usize, reason: &str) -> bool {
        let delivered = self.send(index, FeedFrame::Error(reason.to_string()));
        self.close(index);
        delivered
    }

    /// Server-side close.
    pub fn close(&self, index: usize) {
        if let Some(attempt) = self.lock().attempts.get_mut(index) {
            attempt.sender = None;
        }
    }

    fn send(&self, index: usize, frame: FeedFrame) -> bool {
        self.lock()
            .attempts
            .get(index)
            .and_then(|attempt| attempt.sender.as_ref())
            .is_some_and(|sender| sender.unbounded_send(frame).is_ok())
    }
}

impl FeedTransport for MockTransport {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<FeedStream, TransportError>> {
        let mut state = self.lock();
        let refused = state.refuse_remaining > 0;
        if refused {
            state.refuse_remaining -= 1;
            state.attempts.push(Attempt {
                url: url.to_string(),
                at: Instant::now(),
                sender: None,
            });
            let error = TransportError::Refused {
                url: url.to_string(),
                reason: "mock refused".to_string(),
            };
            return Box::pin(async move { Err(error) });
        }

        let (sender, receiver) = unbounded();
        state.attempts.push(Attempt {
            url: url.to_string(),
            at: Instant::now(),
            sender: Some(sender),
        });
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        drop(state);

        let guard = LiveGuard(self.state.clone());
        let frames: FeedStream = receiver
            .map(move |frame| {
                let _live = &guard;
                frame
            })
            .boxed();
        Box::pin(async move { Ok(frames) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropping_stream_releases_live_connection() {
        let transport = MockTransport::new();
        let mut frames = transport.connect("ws://x/ws/a").await.unwrap();
        assert_eq!(transport.live_connections(), 1);

        assert!(transport.push(0, "hello"));
        assert_eq!(frames.next().await, Some(FeedFrame::Text("hello".into())));

        drop(frames);
        assert_eq!(transport.live_connections(), 0);
        assert!(!transport.push(0, "late"));
    }

    #[tokio::test]
    async fn fail_sends_error_then_ends_stream() {
        let transport = MockTransport::new();
        let mut frames = transport.connect("ws://x/ws/a").await.unwrap();
        transport.fail(0, "reset");

        assert_eq!(frames.next().await, Some(FeedFrame::Error("reset".into())));
        assert_eq!(frames.next().await, None);
    }
}
