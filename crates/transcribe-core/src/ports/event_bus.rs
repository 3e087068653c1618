//! The event bus port — decouples job/download processing from the
//! transport (SSE, WebSocket) that ultimately delivers events to clients.

use async_trait::async_trait;

use crate::events::AppEvent;

/// A live subscription to the bus. Dropping it unsubscribes.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next event, or `None` once the bus is closed.
    ///
    /// If the subscriber fell behind and the bus's internal buffer
    /// overflowed, implementations skip the lost events and return the
    /// oldest event still retained rather than erroring — callers that
    /// need lag visibility should log at the transport boundary.
    async fn recv(&mut self) -> Option<AppEvent>;
}

/// Broadcasts [`AppEvent`]s to any number of subscribers.
#[async_trait]
pub trait EventBus: Send + Sync {
    fn emit(&self, event: AppEvent);

    async fn subscribe(&self) -> Box<dyn Subscription>;
}

/// A bus that drops every event. Used in tests and in the CLI's
/// non-serving subcommands where nothing is listening.
#[derive(Debug, Clone, Default)]
pub struct NoopEventBus;

struct NoopSubscription;

#[async_trait]
impl Subscription for NoopSubscription {
    async fn recv(&mut self) -> Option<AppEvent> {
        None
    }
}

#[async_trait]
impl EventBus for NoopEventBus {
    fn emit(&self, _event: AppEvent) {}

    async fn subscribe(&self) -> Box<dyn Subscription> {
        Box::new(NoopSubscription)
    }
}
