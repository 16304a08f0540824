//! Structured logging emitted by the predictor and its worker thread.
//!
//! The worker logs from its own thread, so the capture layer is installed
//! as the global default. Keep a single test in this binary.
//!
//! Run:
//!   cargo test -p overbounce-runtime --test replay_logging

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use overbounce_runtime::{PredictorConfig, ReplayPredictor, Scenario};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    message: String,
    fields: HashMap<String, String>,
    parent_span_name: Option<String>,
}

/// A tracing Layer that records every event with its enclosing span.
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);

        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();
        let parent_span_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span_ref| span_ref.name().to_string());

        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message,
            fields,
            parent_span_name,
        });
    }
}

fn find<'a>(events: &'a [CapturedEvent], message: &str) -> Option<&'a CapturedEvent> {
    events.iter().find(|e| e.message == message)
}

#[test]
fn predictor_lifecycle_is_logged() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(EventCapture {
            events: Arc::clone(&events),
        });
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let config = PredictorConfig::default().with_poll_interval(Duration::from_millis(1));
    let (mut predictor, mut reporter) = ReplayPredictor::new(config);
    predictor.set_parameters(4.1, 800.0, 0.5);
    predictor.start().unwrap();
    for _ in 0..15 {
        reporter.report_last_frametime(0.01);
    }
    let start = Instant::now();
    while predictor.tally(Scenario::Go).total < 6 {
        assert!(start.elapsed() < Duration::from_secs(10), "worker made no progress");
        thread::sleep(Duration::from_millis(1));
    }
    predictor.stop().unwrap();

    let events = events.lock().unwrap().clone();
    for e in &events {
        if e.target.starts_with("overbounce") {
            assert_eq!(e.target, "overbounce.replay", "unexpected target: {e:?}");
        }
    }

    let updated = find(&events, "physics parameters updated").expect("parameter update event");
    assert_eq!(updated.level, tracing::Level::DEBUG);
    assert_eq!(updated.fields["trajectory_changed"], "true");

    let started = find(&events, "replay predictor started").expect("start event");
    assert_eq!(started.level, tracing::Level::INFO);
    assert_eq!(started.fields["capacity"], "1250");

    assert!(find(&events, "replay worker started").is_some());
    assert!(find(&events, "read cursor reset after parameter change").is_some());

    let committed: Vec<_> = events
        .iter()
        .filter(|e| e.message == "replay pass committed")
        .collect();
    assert!(!committed.is_empty());
    let resolved: u64 = committed
        .iter()
        .map(|e| e.fields["resolved"].parse::<u64>().unwrap())
        .sum();
    assert_eq!(resolved, 6);
    for e in committed {
        assert_eq!(e.level, tracing::Level::TRACE);
        assert_eq!(e.parent_span_name.as_deref(), Some("overbounce.replay.pass"));
    }

    assert!(find(&events, "replay worker stopped").is_some());
    assert!(find(&events, "replay predictor stopped").is_some());
}
