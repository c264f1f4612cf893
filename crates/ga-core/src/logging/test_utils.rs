//! Capture tracing events in memory for assertions in tests.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// A captured tracing event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// The log level.
    pub level: Level,
    /// The target module.
    pub target: String,
    /// The formatted message.
    pub message: String,
    /// Field key-value pairs, in recording order.
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Value of a recorded field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Shared store of captured events.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// All captured events.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Whether any event contains the message substring.
    pub fn has_message(&self, message_contains: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.message.contains(message_contains))
    }

    /// Whether any event at `level` contains the message substring.
    pub fn has_event(&self, level: Level, message_contains: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(message_contains))
    }

    /// Whether any event recorded `field` with exactly `value`.
    pub fn has_field(&self, field: &str, value: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.field(field) == Some(value))
    }

    /// Count events at a specific level.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .count()
    }

    /// Clear all captured events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

struct CaptureLayer {
    logs: CapturedLogs,
}

struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let val = format!("{value:?}");
        if field.name() == "message" {
            self.message = val;
        } else {
            self.fields.push((field.name().to_owned(), val));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.message);
        } else {
            self.fields.push((field.name().to_owned(), value.to_owned()));
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.push((field.name().to_owned(), value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.push((field.name().to_owned(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.push((field.name().to_owned(), value.to_string()));
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor {
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut visitor);

        self.logs.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_owned(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Install a capturing subscriber for the current thread.
///
/// Uses `set_default`, so parallel tests do not see each other's events.
/// Keep the returned guard alive for the duration of the test. Events
/// emitted on other threads (e.g. the blocking pool) are not captured.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let layer = CaptureLayer { logs: logs.clone() };

    let subscriber = tracing_subscriber::registry()
        .with(layer)
        .with(LevelFilter::TRACE);

    let guard = subscriber.set_default();
    (logs, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_levels() {
        let (logs, _guard) = capture_logs();
        tracing::info!("info");
        tracing::warn!("warn");
        tracing::error!("error");

        assert_eq!(logs.count_at_level(Level::INFO), 1);
        assert_eq!(logs.count_at_level(Level::WARN), 1);
        assert_eq!(logs.count_at_level(Level::ERROR), 1);
        assert!(logs.has_event(Level::WARN, "warn"));
        assert!(!logs.has_event(Level::INFO, "warn"));
    }

    #[test]
    fn captures_fields() {
        let (logs, _guard) = capture_logs();
        tracing::warn!(kind = "no_session", conn_id = %"c1", "frame dropped");

        assert!(logs.has_field("kind", "no_session"));
        assert!(logs.has_field("conn_id", "c1"));
        let events = logs.events();
        assert_eq!(events[0].field("kind"), Some("no_session"));
    }

    #[test]
    fn clear_empties_store() {
        let (logs, _guard) = capture_logs();
        tracing::info!("before");
        logs.clear();
        assert!(logs.events().is_empty());
    }

    #[test]
    fn other_threads_not_captured() {
        let (logs, _guard) = capture_logs();
        std::thread::spawn(|| tracing::info!("elsewhere")).join().unwrap();
        assert!(!logs.has_message("elsewhere"));
    }
}
