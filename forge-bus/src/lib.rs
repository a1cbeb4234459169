#![deny(missing_docs)]
//! The message bus (spec.md §4.10): subscribers register under a type
//! string or the wildcard `"*"`, and every [`BusEvent`] is fanned out to
//! every matching subscriber concurrently, and never short-circuits —
//! unlike an approval-chain pipeline that stops at the first non-continue
//! hook, events here are notifications, not gates. A subscriber's error
//! is logged and does not affect its siblings.

use async_trait::async_trait;
use forge_types::BusEvent;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A subscriber to bus events. Implementations should return quickly;
/// long-running work should be spawned internally rather than blocking
/// the fan-out.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Handle one event. An `Err` is logged by the bus and otherwise
    /// ignored — it never affects other subscribers or the publisher.
    async fn on_event(&self, event: &BusEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

struct Subscription {
    pattern: String,
    subscriber: Arc<dyn Subscriber>,
}

fn matches(pattern: &str, event_type: &str) -> bool {
    pattern == "*" || pattern == event_type
}

/// Concurrent, fan-out event bus.
pub struct Bus {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl Bus {
    /// An empty bus with no subscribers.
    pub fn new() -> Self {
        Self { subscriptions: RwLock::new(Vec::new()) }
    }

    /// Subscribe to events whose `event_type` equals `pattern`, or every
    /// event if `pattern` is `"*"`.
    pub async fn subscribe(&self, pattern: impl Into<String>, subscriber: Arc<dyn Subscriber>) {
        self.subscriptions.write().await.push(Subscription { pattern: pattern.into(), subscriber });
    }

    /// Publish `event`, dispatching to every matching subscriber
    /// concurrently via `tokio::spawn`. Returns immediately without
    /// waiting for subscribers to finish.
    pub async fn publish(&self, event: BusEvent) {
        let event = Arc::new(event);
        let subscriptions = self.subscriptions.read().await;
        for sub in subscriptions.iter().filter(|s| matches(&s.pattern, &event.event_type)) {
            let subscriber = sub.subscriber.clone();
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(error) = subscriber.on_event(&event).await {
                    tracing::warn!(event_type = %event.event_type, %error, "bus subscriber failed");
                }
            });
        }
    }

    /// Publish `event` and wait for every matching subscriber to finish.
    /// Intended for tests and callers that need fan-out to have completed
    /// before proceeding (e.g. the CLI's synchronous request path).
    pub async fn publish_sync(&self, event: BusEvent) {
        let subscriptions = self.subscriptions.read().await;
        for sub in subscriptions.iter().filter(|s| matches(&s.pattern, &event.event_type)) {
            if let Err(error) = sub.subscriber.on_event(&event).await {
                tracing::warn!(event_type = %event.event_type, %error, "bus subscriber failed");
            }
        }
    }

    /// Number of currently registered subscriptions (not distinct
    /// subscribers — one subscriber registered under two patterns counts
    /// twice).
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscriber for Counter {
        async fn on_event(&self, _event: &BusEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Subscriber for AlwaysFails {
        async fn on_event(&self, _event: &BusEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("boom".into())
        }
    }

    #[tokio::test]
    async fn exact_match_dispatches_once() {
        let bus = Bus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe("task.started", Arc::new(Counter(count.clone()))).await;
        bus.subscribe("task.completed", Arc::new(Counter(count.clone()))).await;

        bus.publish_sync(BusEvent::task_started("p1", "t1", "coder")).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wildcard_receives_every_event() {
        let bus = Bus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe("*", Arc::new(Counter(count.clone()))).await;

        bus.publish_sync(BusEvent::task_started("p1", "t1", "coder")).await;
        bus.publish_sync(BusEvent::task_completed("p1", "t1")).await;
        bus.publish_sync(BusEvent::plan_completed("p1", false)).await;

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_affect_siblings() {
        let bus = Bus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe("*", Arc::new(AlwaysFails)).await;
        bus.subscribe("*", Arc::new(Counter(count.clone()))).await;

        bus.publish_sync(BusEvent::task_started("p1", "t1", "coder")).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn async_publish_eventually_reaches_subscriber() {
        let bus = Bus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe("*", Arc::new(Counter(count.clone()))).await;

        bus.publish(BusEvent::task_started("p1", "t1", "coder")).await;
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
