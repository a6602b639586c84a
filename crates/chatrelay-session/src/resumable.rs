//! Resumable stream delivery
//!
//! Buffered fan-out keyed by stream id: every published event is appended
//! to the stream's replay buffer and broadcast to live subscribers. A
//! client reconnecting mid-turn receives the buffered prefix followed by
//! the live tail, in order, without gaps or duplicates. The event
//! sequence is produced exactly once regardless of subscriber count.

use crate::orchestrator::EventSink;
use chatrelay_core::{Error, Result, StreamEvent};
use futures::stream::BoxStream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

struct StreamEntry {
    buffer: Vec<StreamEvent>,

    /// Live fan-out; dropped once the stream closes so tails terminate
    live: Option<broadcast::Sender<StreamEvent>>,
}

impl StreamEntry {
    fn is_closed(&self) -> bool {
        self.live.is_none()
    }
}

/// Registry of in-flight and recently finished streams
#[derive(Clone)]
pub struct StreamRegistry {
    inner: Arc<Mutex<HashMap<String, StreamEntry>>>,
    capacity: usize,
}

impl StreamRegistry {
    /// Create a registry with the given broadcast capacity per stream
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Open a new stream and return its publisher.
    ///
    /// Re-opening an id replaces the previous entry.
    pub fn open(&self, stream_id: impl Into<String>) -> StreamPublisher {
        let stream_id = stream_id.into();
        let (sender, _) = broadcast::channel(self.capacity);

        self.inner.lock().insert(
            stream_id.clone(),
            StreamEntry {
                buffer: Vec::new(),
                live: Some(sender),
            },
        );

        StreamPublisher {
            inner: Arc::clone(&self.inner),
            stream_id,
        }
    }

    /// Subscribe to a stream: buffered replay first, then the live tail.
    ///
    /// Returns `None` for unknown stream ids.
    pub fn subscribe(&self, stream_id: &str) -> Option<BoxStream<'static, StreamEvent>> {
        let guard = self.inner.lock();
        let entry = guard.get(stream_id)?;

        // Snapshot and subscription happen under the same lock publish
        // takes, so the replay/live boundary has no gap.
        let replay = futures::stream::iter(entry.buffer.clone());

        match &entry.live {
            Some(sender) => {
                let receiver = sender.subscribe();
                let tail = futures::stream::unfold(receiver, |mut receiver| async move {
                    loop {
                        match receiver.recv().await {
                            Ok(event) => return Some((event, receiver)),
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "slow subscriber lagged, dropping events");
                                continue;
                            }
                            Err(broadcast::error::RecvError::Closed) => return None,
                        }
                    }
                });
                Some(replay.chain(tail).boxed())
            }
            None => Some(replay.boxed()),
        }
    }

    /// Check whether a stream id is known
    pub fn contains(&self, stream_id: &str) -> bool {
        self.inner.lock().contains_key(stream_id)
    }

    /// Drop a stream's buffer and live channel
    pub fn remove(&self, stream_id: &str) {
        self.inner.lock().remove(stream_id);
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Publisher half of one registered stream
pub struct StreamPublisher {
    inner: Arc<Mutex<HashMap<String, StreamEntry>>>,
    stream_id: String,
}

impl StreamPublisher {
    /// Stream id this publisher feeds
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Append an event to the buffer and fan it out.
    ///
    /// A terminal event closes the stream: the live channel drops so
    /// subscriber tails end, and late subscribers get replay only.
    pub fn publish(&self, event: StreamEvent) -> Result<()> {
        let mut guard = self.inner.lock();
        let entry = guard
            .get_mut(&self.stream_id)
            .ok_or_else(|| Error::stream("stream evicted from registry"))?;

        let terminal = event.is_terminal();
        entry.buffer.push(event.clone());

        if let Some(sender) = &entry.live {
            // No live subscribers is fine, the buffer covers resume
            let _ = sender.send(event);
        }

        if terminal {
            entry.live = None;
        }
        Ok(())
    }
}

impl EventSink for StreamPublisher {
    fn emit(&mut self, event: StreamEvent) -> Result<()> {
        self.publish(event)
    }
}

/// Direct delivery fallback when no registry is configured.
///
/// The sink half feeds an unbounded channel; dropping the consumer makes
/// the next emit fail, which aborts the turn and releases the upstream.
pub fn channel_sink() -> (ChannelSink, BoxStream<'static, StreamEvent>) {
    let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
    let stream = futures::stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|event| (event, receiver))
    });
    (ChannelSink { sender }, stream.boxed())
}

/// Sink half of the direct delivery channel
pub struct ChannelSink {
    sender: tokio::sync::mpsc::UnboundedSender<StreamEvent>,
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: StreamEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| Error::stream("consumer disconnected"))
    }
}
