//! `GET /events`: server-sent events of the message bus (spec.md §4.10,
//! §6). [`forge_bus::Bus`] is push-only (a `Subscriber` callback, no
//! stream), so [`EventBridge`] is a `Subscriber` that forwards every event
//! onto a `tokio::sync::broadcast` channel, and the handler turns a fresh
//! receiver into an SSE stream per connection.

use async_trait::async_trait;
use axum::response::sse::{Event, Sse};
use forge_bus::Subscriber;
use forge_types::BusEvent;
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast;

pub(crate) struct EventBridge {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBridge {
    pub(crate) fn new(sender: broadcast::Sender<BusEvent>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Subscriber for EventBridge {
    async fn on_event(&self, event: &BusEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // No receivers connected is not an error — the dashboard may not
        // be watching `/events` right now.
        let _ = self.sender.send(event.clone());
        Ok(())
    }
}

pub(crate) fn event_stream(receiver: broadcast::Receiver<BusEvent>) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    return Some((Ok(Event::default().event(event.event_type.clone()).data(payload)), receiver));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

/// Build the `GET /events` SSE response from a fresh receiver.
pub(crate) fn sse_response(receiver: broadcast::Receiver<BusEvent>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(event_stream(receiver)).keep_alive(axum::response::sse::KeepAlive::default())
}
