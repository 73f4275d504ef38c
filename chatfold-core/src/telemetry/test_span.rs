#![cfg(test)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{Event, Level, Subscriber, span};
use tracing_core::field::{Field, Visit};
use tracing_subscriber::registry;
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

#[derive(Debug)]
pub struct SpanData {
    pub name: String,
    pub fields: HashMap<String, String>, // stringified values via Debug
}

#[derive(Debug)]
pub struct EventData {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

#[derive(Default, Debug)]
pub struct CaptureStore {
    pub spans: Mutex<HashMap<span::Id, SpanData>>,
    pub events: Mutex<Vec<EventData>>,
}

impl CaptureStore {
    /// Fields of the first captured span called `name`.
    pub fn span_fields(&self, name: &str) -> Option<HashMap<String, String>> {
        self.spans
            .lock()
            .unwrap()
            .values()
            .find(|s| s.name == name)
            .map(|s| s.fields.clone())
    }

    /// Fields of every captured event at `level`, in emission order.
    pub fn event_fields_at(&self, level: Level) -> Vec<HashMap<String, String>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.fields.clone())
            .collect()
    }

    /// Messages of every captured event at `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .filter_map(|e| e.fields.get("message").cloned())
            .collect()
    }
}

struct MapVisitor<'a> {
    map: &'a mut HashMap<String, String>,
}

impl Visit for MapVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn core::fmt::Debug) {
        self.map.insert(field.name().to_string(), format!("{value:?}"));
    }
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.map.insert(field.name().to_string(), value.to_string());
    }
    fn record_str(&mut self, field: &Field, value: &str) {
        self.map.insert(field.name().to_string(), value.to_string());
    }
    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.map.insert(field.name().to_string(), format!("{value}"));
    }
}

#[derive(Clone)]
pub struct CaptureLayer {
    pub store: Arc<CaptureStore>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        attrs.record(&mut MapVisitor { map: &mut fields });
        let data = SpanData {
            name: attrs.metadata().name().to_string(),
            fields,
        };
        self.store.spans.lock().unwrap().insert(id.clone(), data);
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, _ctx: Context<'_, S>) {
        if let Some(data) = self.store.spans.lock().unwrap().get_mut(id) {
            values.record(&mut MapVisitor { map: &mut data.fields });
        }
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut MapVisitor { map: &mut fields });
        self.store.events.lock().unwrap().push(EventData {
            level: *event.metadata().level(),
            fields,
        });
    }
}

/// Captures spans and events on the current thread until the returned guard is dropped.
pub struct Capture {
    pub store: Arc<CaptureStore>,
    _guard: tracing::subscriber::DefaultGuard,
}

pub fn install_capture() -> Capture {
    use tracing_subscriber::prelude::*;
    let store = Arc::new(CaptureStore::default());
    let layer = CaptureLayer { store: store.clone() };
    let subscriber = registry::Registry::default().with(layer);
    let guard = tracing::subscriber::set_default(subscriber);
    Capture { store, _guard: guard }
}
