use crate::record::{LogRecord, Severity};
use crate::request::RequestContext;
use crate::sink::LogSink;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex, atomic::{AtomicU64, Ordering}};
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Event field that overrides the severity derived from the tracing level,
/// e.g. `error!(severity = "critical", "db down")`.
pub const SEVERITY_FIELD: &str = "severity";

/// Events from the HTTP stack are never forwarded, otherwise delivering a
/// message could log about itself.
const IGNORED_TARGETS: [&str; 4] = ["reqwest", "hyper", "h2", "rustls"];

fn is_ignored_target(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|crate_name| {
        target == *crate_name
            || target
                .strip_prefix(crate_name)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// hands them to a [`LogSink`].
///
/// Only events at or above `min_severity` are forwarded. Each record is
/// delivered on its own Tokio task, but a task waits for the previous
/// record to finish first, so messages reach chat in the order they were
/// logged. There is no batching or retry: a failed delivery is reported on
/// stderr and counted. Use [`ChatLogLayer::handle`] to drain in-flight
/// deliveries before shutdown. Fields of enclosing spans become the
/// record's [`RequestContext`].
pub struct ChatLogLayer {
    sink: Arc<dyn LogSink>,
    min_severity: Severity,
    tracker: TaskTracker,
    /// Completion signal of the most recently spawned delivery.
    previous: Mutex<Option<oneshot::Receiver<()>>>,
    /// Total events seen by the layer (before filtering by severity).
    pub total_events: Arc<AtomicU64>,
    /// Records the sink accepted.
    pub dispatched_events: Arc<AtomicU64>,
    /// Records the sink rejected.
    pub failed_events: Arc<AtomicU64>,
    /// Records dropped because no Tokio runtime was available.
    pub skipped_events: Arc<AtomicU64>,
    /// Deliveries cancelled before finishing, e.g. by runtime shutdown.
    pub lost_events: Arc<AtomicU64>,
}

/// Cloneable handle for waiting on a [`ChatLogLayer`]'s deliveries after
/// the layer has been moved into a subscriber.
#[derive(Clone)]
pub struct ChatLogHandle {
    sink: Arc<dyn LogSink>,
    tracker: TaskTracker,
}

impl ChatLogHandle {
    /// Wait until every delivery spawned so far has finished, then flush
    /// the sink. Records logged while draining are waited for as well.
    pub async fn drain(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
        self.sink.flush().await
    }

    /// Number of deliveries still running or waiting their turn.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}

/// Counts the delivery as lost if its task is dropped before settling.
struct DeliveryGuard {
    lost: Arc<AtomicU64>,
    settled: bool,
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.lost.fetch_add(1, Ordering::Relaxed);
            eprintln!("google chat delivery cancelled before completion, log record lost");
        }
    }
}

impl ChatLogLayer {
    pub fn new(sink: Arc<dyn LogSink>, min_severity: Severity) -> Self {
        Self {
            sink,
            min_severity,
            tracker: TaskTracker::new(),
            previous: Mutex::new(None),
            total_events: Arc::new(AtomicU64::new(0)),
            dispatched_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
            skipped_events: Arc::new(AtomicU64::new(0)),
            lost_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn handle(&self) -> ChatLogHandle {
        ChatLogHandle {
            sink: Arc::clone(&self.sink),
            tracker: self.tracker.clone(),
        }
    }

    fn deliver(&self, record: LogRecord) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.skipped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("no tokio runtime, dropping google chat log record");
                return;
            }
        };

        let (done_tx, done_rx) = oneshot::channel::<()>();
        let previous = {
            let mut slot = self.previous.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.replace(done_rx)
        };

        let sink = Arc::clone(&self.sink);
        let dispatched = Arc::clone(&self.dispatched_events);
        let failed = Arc::clone(&self.failed_events);
        let guard = DeliveryGuard {
            lost: Arc::clone(&self.lost_events),
            settled: false,
        };

        self.tracker.spawn_on(
            async move {
                // Capture the whole guard, not just `guard.settled` (edition 2021 disjoint capture).
                let mut guard = guard;
                // Sender dropped (finished or cancelled) either way.
                if let Some(previous) = previous {
                    let _ = previous.await;
                }

                match sink.send(&record).await {
                    Ok(()) => {
                        dispatched.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        eprintln!("error sending log record to google chat: {}", e);
                    }
                }
                guard.settled = true;
                drop(done_tx);
            },
            &handle,
        );
    }
}

/// Fields recorded on a span, stored in its extensions.
struct SpanFields(BTreeMap<String, serde_json::Value>);

impl<S> Layer<S> for ChatLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut fields = BTreeMap::new();
        let mut message = None;
        attrs.record(&mut FieldVisitor { fields: &mut fields, message: &mut message });
        if let Some(message) = message {
            fields.insert("message".to_string(), serde_json::Value::String(message));
        }
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            let mut message = None;
            values.record(&mut FieldVisitor { fields, message: &mut message });
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        if is_ignored_target(meta.target()) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor { fields: &mut fields, message: &mut message });

        let override_severity = fields
            .get(SEVERITY_FIELD)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Severity>().ok());
        let severity = match override_severity {
            Some(severity) => {
                fields.remove(SEVERITY_FIELD);
                severity
            }
            None => Severity::from(*meta.level()),
        };
        if severity < self.min_severity {
            return;
        }

        let request = ctx.event_scope(event).and_then(|scope| {
            let mut span_fields = BTreeMap::new();
            for span in scope.from_root() {
                if let Some(SpanFields(recorded)) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(recorded.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            RequestContext::from_fields(span_fields)
        });

        let timestamp = Utc::now();
        let message = message.unwrap_or_default();
        let record = LogRecord {
            formatted: format_line(timestamp, meta.target(), severity, &message, &fields),
            timestamp,
            severity,
            message,
            target: meta.target().to_string(),
            fields,
            request,
        };

        self.deliver(record);
    }
}

/// `[time] target.LEVEL: message {fields} []`, the usual line layout.
fn format_line(
    timestamp: DateTime<Utc>,
    target: &str,
    severity: Severity,
    message: &str,
    fields: &BTreeMap<String, serde_json::Value>,
) -> String {
    let context = if fields.is_empty() {
        "[]".to_string()
    } else {
        serde_json::to_string(fields).unwrap_or_else(|_| "[]".to_string())
    };
    format!(
        "[{}] {}.{}: {} {} []",
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
        target,
        severity.name().to_ascii_uppercase(),
        message,
        context
    )
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
