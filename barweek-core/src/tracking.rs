//! Fire-and-forget usage tracking.
//!
//! `track` returns nothing: a sink that fails must swallow the failure so
//! tracking never changes the outcome of the operation that triggered it.

use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingEvent {
    pub category: &'static str,
    pub action: &'static str,
    pub label: Option<String>,
    pub value: Option<i64>,
}

impl TrackingEvent {
    pub fn new(category: &'static str, action: &'static str) -> Self {
        TrackingEvent {
            category,
            action,
            label: None,
            value: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }
}

pub trait Tracker: Send + Sync {
    fn track(&self, event: TrackingEvent);
}

/// Emits tracking events as structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTracker;

impl Tracker for LogTracker {
    fn track(&self, event: TrackingEvent) {
        info!(
            target: "barweek::tracking",
            category = event.category,
            action = event.action,
            label = event.label.as_deref(),
            value = event.value,
            "tracked"
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl Tracker for NoopTracker {
    fn track(&self, _event: TrackingEvent) {}
}
