//! Resolution logs the URL and outcome of every catalog request at debug level.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use kaggleease::catalog::resolve::Resolver;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

mod common;

use common::{listing, MockApi, Reply, TIMEOUT};

type Fields = BTreeMap<String, String>;

struct FieldRecorder<'a>(&'a mut Fields);

impl Visit for FieldRecorder<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Collects every event as its level and recorded fields.
#[derive(Clone, Default)]
struct EventLog(Arc<Mutex<Vec<(Level, Fields)>>>);

impl EventLog {
    fn debug_events_with(&self, keys: &[&str]) -> Vec<Fields> {
        self.0
            .lock()
            .expect("event log")
            .iter()
            .filter(|(level, fields)| {
                *level == Level::DEBUG && keys.iter().all(|key| fields.contains_key(*key))
            })
            .map(|(_, fields)| fields.clone())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for EventLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::new();
        event.record(&mut FieldRecorder(&mut fields));
        self.0
            .lock()
            .expect("event log")
            .push((*event.metadata().level(), fields));
    }
}

#[test]
fn every_issued_request_logs_url_and_status() {
    let api = Arc::new(
        MockApi::new()
            .route("datasets/list/files/owner%2Fslug", Reply::Status(401))
            .route(
                "datasets/list/files?ownerSlug=owner&datasetSlug=slug",
                Reply::Json(200, listing(&[("iris.csv", 10)])),
            ),
    );
    let resolver = Resolver::new(api.clone());
    let log = EventLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());

    tracing::subscriber::with_default(subscriber, || {
        resolver.resolve("owner/slug", TIMEOUT).expect("resolve");
    });

    let issued = api.probe_calls();
    assert_eq!(issued.len(), 3);
    let events = log.debug_events_with(&["url", "status"]);
    let logged: Vec<(String, String)> = events
        .iter()
        .map(|fields| (fields["url"].clone(), fields["status"].clone()))
        .collect();
    let expected: Vec<(String, String)> = issued
        .iter()
        .zip(["404", "401", "200"])
        .map(|(path, status)| (format!("mock://api/{path}"), status.to_string()))
        .collect();
    assert_eq!(logged, expected);
}

#[test]
fn unreachable_request_logs_url_and_error() {
    let api = Arc::new(
        MockApi::new()
            .route("competitions/storage/list/files/titanic", Reply::Refused)
            .route("datasets/list/files/titanic", Reply::Timeout),
    );
    let resolver = Resolver::new(api);
    let log = EventLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());

    tracing::subscriber::with_default(subscriber, || {
        resolver.resolve("titanic", TIMEOUT).expect_err("unreachable");
    });

    let events = log.debug_events_with(&["url", "error"]);
    let urls: Vec<&str> = events.iter().map(|fields| fields["url"].as_str()).collect();
    assert_eq!(
        urls,
        [
            "competitions/storage/list/files/titanic",
            "datasets/list/files/titanic"
        ]
    );
}
