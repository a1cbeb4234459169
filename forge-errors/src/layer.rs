//! Wires the [`ErrorCollector`] into the `tracing` subscriber stack: a
//! [`tracing_subscriber::Layer`] that forwards every `ERROR`-level event to
//! the collector, concretizing spec.md §4.11's "subscription to the
//! process-wide structured log stream".

use crate::collector::ErrorCollector;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// A `tracing_subscriber::Layer` that feeds every `ERROR`-level event's
/// target and formatted message into an [`ErrorCollector`].
pub struct ErrorCollectorLayer {
    collector: Arc<ErrorCollector>,
}

impl ErrorCollectorLayer {
    /// Build a layer forwarding into `collector`.
    pub fn new(collector: Arc<ErrorCollector>) -> Self {
        Self { collector }
    }
}

impl<S: Subscriber> Layer<S> for ErrorCollectorLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.message.unwrap_or_else(|| event.metadata().name().to_string());
        self.collector.record(event.metadata().target(), &message, None);
    }
}
