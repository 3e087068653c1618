//! Broadcast event bus and SSE streaming adapter.
//!
//! Implements the core `EventBus`/`Subscription` ports over a
//! `tokio::sync::broadcast` channel, then exposes the same channel as
//! an Axum SSE stream for the `/api/events` style endpoints. WebSocket
//! handlers subscribe through the same port and forward events as text
//! frames instead.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::sse::{Event, Sse};
use futures_util::stream::{self, Stream};
use tokio::sync::broadcast;

use transcribe_core::events::AppEvent;
use transcribe_core::ports::{EventBus, Subscription};

/// Broadcasts [`AppEvent`]s to any number of subscribers over a bounded
/// channel. A subscriber that falls behind the buffer is dropped: its
/// last delivered event is an `Overflow` notice reporting how many
/// events it missed, per the event-bus port's contract.
#[derive(Debug, Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl BroadcastEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Default capacity of 256 events, enough to absorb a burst of
    /// per-job progress updates between a slow subscriber's polls.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(256)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// SSE stream for a new client connection, with a 30s keep-alive
    /// ping to survive idle proxy timeouts.
    pub fn sse_stream(self: &Arc<Self>) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
        let sub = BroadcastSubscription { receiver: self.sender.subscribe(), dropped: false };
        let stream = stream::unfold(sub, |mut sub| async move {
            loop {
                let event = Subscription::recv(&mut sub).await?;
                match serde_json::to_string(&event) {
                    Ok(json) => return Some((Ok(Event::default().data(json)), sub)),
                    Err(err) => {
                        tracing::warn!(%err, "failed to serialize event for SSE");
                        continue;
                    }
                }
            }
        });

        Sse::new(stream).keep_alive(
            axum::response::sse::KeepAlive::new()
                .interval(std::time::Duration::from_secs(30))
                .text("ping"),
        )
    }
}

/// A subscription that terminates itself after the first lagged recv:
/// the `Overflow` event it delivers is always its last event, matching
/// `broadcast`'s own contract that a lagged receiver has unrecoverably
/// skipped ahead.
struct BroadcastSubscription {
    receiver: broadcast::Receiver<AppEvent>,
    dropped: bool,
}

#[async_trait]
impl Subscription for BroadcastSubscription {
    async fn recv(&mut self) -> Option<AppEvent> {
        if self.dropped {
            return None;
        }
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event bus subscriber lagged, dropping after overflow notice");
                self.dropped = true;
                Some(AppEvent::Overflow { skipped })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[async_trait]
impl EventBus for BroadcastEventBus {
    fn emit(&self, event: AppEvent) {
        // No subscribers is fine; nothing to observe the send error.
        let _ = self.sender.send(event);
    }

    async fn subscribe(&self) -> Box<dyn Subscription> {
        Box::new(BroadcastSubscription {
            receiver: self.sender.subscribe(),
            dropped: false,
        })
    }
}
