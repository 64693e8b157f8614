// tests/common/mod.rs
//
// In-process stand-ins for the collaborators (suggestion providers,
// concordance, blacklister). A stub answers every path with a fixed status and
// body and records each request it received.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

use public_suggestions_api::suggest::types::{ConceptCategory, SourceFlags};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Values of every `key=` pair in the query string, in order.
    pub fn query_values(&self, key: &str) -> Vec<String> {
        self.query
            .as_deref()
            .unwrap_or_default()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    pub fn hits(&self) -> usize {
        self.inner.lock().len()
    }

    /// Requests that were not health checks.
    pub fn calls(&self) -> Vec<Recorded> {
        self.inner
            .lock()
            .iter()
            .filter(|r| r.path != "/__gtg")
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<Recorded> {
        self.calls().pop()
    }

    fn push(&self, r: Recorded) {
        self.inner.lock().push(r);
    }
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: Arc<String>,
    delay: Duration,
    recorder: Recorder,
}

async fn respond(
    State(s): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    s.recorder.push(Recorded {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: body.to_vec(),
    });
    if !s.delay.is_zero() {
        tokio::time::sleep(s.delay).await;
    }
    if s.status == StatusCode::NO_CONTENT {
        return StatusCode::NO_CONTENT.into_response();
    }
    (
        s.status,
        [(header::CONTENT_TYPE, "application/json")],
        s.body.to_string(),
    )
        .into_response()
}

pub struct Stub {
    pub base_url: String,
    pub recorder: Recorder,
}

pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{addr}")
}

pub async fn stub(status: u16, body: Value) -> Stub {
    stub_with_delay(status, body, Duration::ZERO).await
}

pub async fn stub_with_delay(status: u16, body: Value, delay: Duration) -> Stub {
    let recorder = Recorder::default();
    let state = StubState {
        status: StatusCode::from_u16(status).expect("valid status"),
        body: Arc::new(body.to_string()),
        delay,
        recorder: recorder.clone(),
    };
    let base_url = serve(Router::new().fallback(respond).with_state(state)).await;
    Stub { base_url, recorder }
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let addr = listener.local_addr().expect("throwaway addr");
    drop(listener);
    format!("http://{addr}")
}

pub const PERSON: &str = "http://www.ft.com/ontology/person/Person";
pub const LOCATION: &str = "http://www.ft.com/ontology/Location";
pub const ORGANISATION: &str = "http://www.ft.com/ontology/organisation/Organisation";
pub const HAS_AUTHOR: &str = "http://www.ft.com/ontology/annotation/hasAuthor";
pub const MENTIONS: &str = "http://www.ft.com/ontology/annotation/mentions";

pub fn suggestion(key: &str, concept_type: &str) -> Value {
    json!({
        "id": format!("http://www.ft.com/thing/{key}"),
        "apiUrl": format!("http://api.ft.com/things/{key}"),
        "type": concept_type,
        "prefLabel": key,
    })
}

pub fn suggestion_with_predicate(key: &str, concept_type: &str, predicate: &str) -> Value {
    let mut v = suggestion(key, concept_type);
    v["predicate"] = json!(predicate);
    v
}

pub fn suggestions(items: Vec<Value>) -> Value {
    json!({ "suggestions": items })
}

pub fn canonical_id(key: &str) -> String {
    format!("http://www.ft.com/thing/canonical-{key}")
}

/// Concordance body resolving each `(key, type)` to `canonical-<key>`.
pub fn concordance(entries: &[(&str, &str)]) -> Value {
    let concepts: serde_json::Map<String, Value> = entries
        .iter()
        .map(|(key, concept_type)| {
            (
                key.to_string(),
                json!({
                    "id": canonical_id(key),
                    "apiUrl": format!("http://api.ft.com/things/canonical-{key}"),
                    "type": concept_type,
                    "prefLabel": format!("Canonical {key}"),
                }),
            )
        })
        .collect();
    json!({ "concepts": concepts })
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("test http client")
}

pub fn flags(person: &str, location: &str, organisation: &str) -> SourceFlags {
    SourceFlags::new([
        (ConceptCategory::Person, person),
        (ConceptCategory::Location, location),
        (ConceptCategory::Organisation, organisation),
    ])
}
