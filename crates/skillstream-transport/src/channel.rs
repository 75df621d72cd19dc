//! In-process channel transport.
//!
//! Backs tests and offline demos: each armed feed becomes one stream, and
//! the transport counts opens and releases so callers can assert the
//! at-most-one-connection and exactly-one-release contracts.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use futures::StreamExt;
use skillstream_core::{EventStream, SkillTransport, StreamEvent, TransportError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Sender half of an armed stream.
///
/// Dropping the feed without a terminal event ends the stream early, which
/// the consumer reports as a protocol violation.
#[derive(Debug, Clone)]
pub struct EventFeed {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl EventFeed {
    /// Deliver one event to the consumer.
    ///
    /// Delivery into a released stream is silently dropped, mirroring a
    /// server that keeps writing after the client hung up.
    pub fn send(&self, event: StreamEvent) {
        let _ = self.tx.send(event);
    }

    /// Deliver a text fragment.
    pub fn fragment(&self, text: impl Into<String>) {
        self.send(StreamEvent::fragment(text));
    }

    /// Deliver the completion marker.
    pub fn complete(&self, execution_time_seconds: f64) {
        self.send(StreamEvent::Completed {
            execution_time_seconds,
        });
    }

    /// Deliver the failure marker.
    pub fn fail(&self, message: impl Into<String>) {
        self.send(StreamEvent::Failed {
            message: message.into(),
        });
    }
}

struct Inner {
    armed: Mutex<VecDeque<mpsc::UnboundedReceiver<StreamEvent>>>,
    opened: AtomicUsize,
    released: AtomicUsize,
}

/// Channel-backed transport.
#[derive(Clone)]
pub struct ChannelTransport {
    inner: Arc<Inner>,
}

impl ChannelTransport {
    /// Create a transport with no armed streams.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                armed: Mutex::new(VecDeque::new()),
                opened: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
        }
    }

    /// Arm one future stream, returning its feed.
    ///
    /// Streams are consumed in arming order, one per `open_stream` call.
    pub fn arm(&self) -> EventFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.armed.lock().unwrap().push_back(rx);
        EventFeed { tx }
    }

    /// Number of streams opened so far.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Number of streams released (dropped) so far.
    #[must_use]
    pub fn released(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Bumps the release counter exactly once, when the stream is dropped.
struct ReleaseGuard {
    inner: Arc<Inner>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.inner.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SkillTransport for ChannelTransport {
    async fn open_stream(
        &self,
        slug: &str,
        _prompt: &str,
        token: CancellationToken,
    ) -> Result<EventStream, TransportError> {
        let rx = self
            .inner
            .armed
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Connect(format!("no stream armed for {slug}")))?;

        self.inner.opened.fetch_add(1, Ordering::SeqCst);

        let guard = ReleaseGuard {
            inner: Arc::clone(&self.inner),
        };

        let state = (rx, guard, token, false);
        Ok(futures::stream::unfold(
            state,
            |(mut rx, guard, token, done)| async move {
                if done || token.is_cancelled() {
                    return None;
                }
                let event = rx.recv().await?;
                let done = event.is_terminal();
                Some((event, (rx, guard, token, done)))
            },
        )
        .boxed())
    }
}
