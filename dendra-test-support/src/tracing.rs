//! Recording layer for asserting spans and events emitted during tests.

use std::{
    collections::HashMap,
    fmt::{self, Write as _},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{
    Event, Level, Subscriber,
    dispatcher::DefaultGuard,
    field::{Field, Visit},
    span::{Attributes, Id, Record},
};
use tracing_subscriber::{
    Layer, layer::Context, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

/// Closed span captured by [`RecordingLayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    /// Span name from the callsite metadata.
    pub name: String,
    /// Fields recorded when the span opened or later via `record`.
    pub fields: HashMap<String, String>,
}

impl SpanRecord {
    /// Returns the recorded value of `field`, if any.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Event captured by [`RecordingLayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Event level.
    pub level: Level,
    /// Event target, usually the emitting module path.
    pub target: String,
    /// Structured fields, including `message`.
    pub fields: HashMap<String, String>,
}

impl EventRecord {
    /// Returns the formatted `message` field.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").map(String::as_str)
    }
}

#[derive(Default)]
struct Recording {
    spans: Vec<SpanRecord>,
    events: Vec<EventRecord>,
}

/// Layer that keeps every closed span and emitted event for later inspection.
///
/// Clones share one recording, so a test keeps a handle while the subscriber
/// owns the installed copy.
///
/// # Examples
/// ```
/// use dendra_test_support::tracing::RecordingLayer;
///
/// let (layer, _guard) = RecordingLayer::install();
/// tracing::info_span!("demo", answer = 42).in_scope(|| tracing::info!("inside"));
/// let span = layer.spans_named("demo").pop().expect("span closed");
/// assert_eq!(span.field("answer"), Some("42"));
/// assert_eq!(layer.events()[0].message(), Some("inside"));
/// ```
#[derive(Clone, Default)]
pub struct RecordingLayer {
    recording: Arc<Mutex<Recording>>,
}

impl RecordingLayer {
    /// Installs a fresh layer as the thread's default subscriber.
    ///
    /// The subscriber stays active until the returned guard drops.
    #[must_use]
    pub fn install() -> (Self, DefaultGuard) {
        let layer = Self::default();
        let guard = tracing_subscriber::registry()
            .with(layer.clone())
            .set_default();
        (layer, guard)
    }

    /// Returns every closed span in completion order.
    #[must_use]
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.lock().spans.clone()
    }

    /// Returns the closed spans called `name`.
    #[must_use]
    pub fn spans_named(&self, name: &str) -> Vec<SpanRecord> {
        self.lock()
            .spans
            .iter()
            .filter(|span| span.name == name)
            .cloned()
            .collect()
    }

    /// Returns every event in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.lock().events.clone()
    }

    /// Returns the events emitted at `level`.
    #[must_use]
    pub fn events_at(&self, level: Level) -> Vec<EventRecord> {
        self.lock()
            .events
            .iter()
            .filter(|event| event.level == level)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.recording
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct OpenSpan(SpanRecord);

impl<S> Layer<S> for RecordingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = HashMap::new();
        attrs.record(&mut FieldCollector(&mut fields));
        span.extensions_mut().insert(OpenSpan(SpanRecord {
            name: attrs.metadata().name().to_owned(),
            fields,
        }));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if let Some(open) = span.extensions_mut().get_mut::<OpenSpan>() {
            values.record(&mut FieldCollector(&mut open.0.fields));
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        let Some(OpenSpan(record)) = span.extensions_mut().remove::<OpenSpan>() else {
            return;
        };
        self.lock().spans.push(record);
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldCollector(&mut fields));
        let metadata = event.metadata();
        self.lock().events.push(EventRecord {
            level: *metadata.level(),
            target: metadata.target().to_owned(),
            fields,
        });
    }
}

struct FieldCollector<'a>(&'a mut HashMap<String, String>);

impl FieldCollector<'_> {
    fn put(&mut self, field: &Field, value: String) {
        self.0.insert(field.name().to_owned(), value);
    }
}

impl Visit for FieldCollector<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    fn record_bytes(&mut self, field: &Field, value: &[u8]) {
        let mut hex = String::with_capacity(value.len() * 2);
        for byte in value {
            let _ = write!(hex, "{byte:02x}");
        }
        self.put(field, hex);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_recorded_fields_are_kept() {
        let (layer, _guard) = RecordingLayer::install();
        let span = tracing::info_span!("stage", edges = tracing::field::Empty);
        span.record("edges", 12_u64);
        drop(span);

        let spans = layer.spans_named("stage");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].field("edges"), Some("12"));
    }

    #[test]
    fn events_are_filtered_by_level() {
        let (layer, _guard) = RecordingLayer::install();
        tracing::warn!(reason = "empty", "skipping");
        tracing::debug!("detail");

        assert_eq!(layer.events().len(), 2);
        let warnings = layer.events_at(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message(), Some("skipping"));
        assert_eq!(warnings[0].fields.get("reason").map(String::as_str), Some("empty"));
    }
}
