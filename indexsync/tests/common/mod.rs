//! Scripted stand-in for the search service's REST API.
//!
//! Starts a real Axum server on a random port. Every request is recorded;
//! indexes, data sources and indexers are kept in memory; indexer status
//! responses are replayed from a script (the last entry repeats).

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use indexsync::{SearchServiceClient, SyncConfig};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_KEY: &str = "test-admin-key";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct MockState {
    requests: Vec<RecordedRequest>,
    indexes: HashMap<String, Value>,
    datasources: HashSet<String>,
    indexers: HashSet<String>,
    overrides: HashMap<String, (StatusCode, Value)>,
    delays: HashMap<String, Duration>,
    status_script: VecDeque<Value>,
    documents: Vec<Value>,
}

#[derive(Clone)]
pub struct MockSearchService {
    state: Arc<Mutex<MockState>>,
    pub base_url: String,
}

impl MockSearchService {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState::default()));

        let router = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        // Give the server a moment to start accepting connections.
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            state,
            base_url: format!("http://{}", addr),
        }
    }

    pub fn client(&self) -> Arc<SearchServiceClient> {
        Arc::new(SearchServiceClient::new(&self.base_url, API_KEY).unwrap())
    }

    /// Config pointing at this server with a fast poll interval
    pub fn config(&self) -> SyncConfig {
        let mut config = SyncConfig::default();
        config.service.endpoint = Some(self.base_url.clone());
        config.service.api_key = API_KEY.to_string();
        config.datasource.connection_string =
            "Server=tcp:db.example.net,1433;Database=usgs;Password=secret;".to_string();
        config.poll.interval_ms = 10;
        config
    }

    /// Answer `"{METHOD} {path}"` with a fixed status and body
    pub fn respond(&self, route: &str, status: StatusCode, body: Value) {
        self.state
            .lock()
            .unwrap()
            .overrides
            .insert(route.to_string(), (status, body));
    }

    /// Hold `"{METHOD} {path}"` for `delay` before answering
    pub fn delay(&self, route: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(route.to_string(), delay);
    }

    pub fn script_status(&self, responses: Vec<Value>) {
        self.state.lock().unwrap().status_script = responses.into();
    }

    pub fn seed_index(&self, name: &str) {
        self.state.lock().unwrap().indexes.insert(
            name.to_string(),
            json!({ "name": name, "fields": [ { "name": "id", "type": "Edm.String", "key": true } ] }),
        );
    }

    pub fn set_documents(&self, docs: Vec<Value>) {
        self.state.lock().unwrap().documents = docs;
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.state.lock().unwrap().indexes.contains_key(name)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// `"{METHOD} {path}"` for every request, in arrival order
    pub fn routes(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn count(&self, route: &str) -> usize {
        self.routes().iter().filter(|r| r.as_str() == route).count()
    }
}

/// Base URL of a port nothing is listening on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn in_progress(items: u64) -> Value {
    json!({
        "status": "running",
        "lastResult": { "status": "inProgress", "itemsProcessed": items, "itemsFailed": 0 }
    })
}

pub fn finished(status: &str, items: u64, failed: u64) -> Value {
    json!({
        "status": "running",
        "lastResult": { "status": status, "itemsProcessed": items, "itemsFailed": failed, "errors": [] }
    })
}

pub fn no_result() -> Value {
    json!({ "status": "running", "lastResult": null })
}

fn error_body(message: &str) -> Value {
    json!({ "error": { "code": "", "message": message } })
}

async fn handle(
    State(state): State<Arc<Mutex<MockState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let body_json: Option<Value> = serde_json::from_slice(&body).ok();
    let route = format!("{} {}", method, path);

    let delay = state.lock().unwrap().delays.get(&route).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        body: body_json.clone(),
    });

    if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (StatusCode::FORBIDDEN, Json(error_body("Invalid api-key"))).into_response();
    }

    if let Some((status, body)) = state.overrides.get(&route).cloned() {
        return (status, Json(body)).into_response();
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("DELETE", ["indexes", name]) => match state.indexes.remove(*name) {
            Some(_) => StatusCode::NO_CONTENT.into_response(),
            None => (
                StatusCode::NOT_FOUND,
                Json(error_body(&format!("No index with the name '{}' was found", name))),
            )
                .into_response(),
        },
        ("PUT", ["indexes", name]) => {
            let existed = state
                .indexes
                .insert(name.to_string(), body_json.clone().unwrap_or(Value::Null))
                .is_some();
            if existed {
                StatusCode::NO_CONTENT.into_response()
            } else {
                (StatusCode::CREATED, Json(body_json.unwrap_or(Value::Null))).into_response()
            }
        }
        ("GET", ["indexes", name]) => match state.indexes.get(*name) {
            Some(def) => {
                // The real service adds attributes the client does not declare.
                let mut def = def.clone();
                if let Some(fields) = def.get_mut("fields").and_then(Value::as_array_mut) {
                    for field in fields {
                        field["analyzer"] = Value::Null;
                        field["synonymMaps"] = json!([]);
                    }
                }
                def["@odata.etag"] = json!("\"0x1\"");
                (StatusCode::OK, Json(def)).into_response()
            }
            None => (StatusCode::NOT_FOUND, Json(error_body("index not found"))).into_response(),
        },
        ("PUT", ["datasources", name]) => {
            if state.datasources.insert(name.to_string()) {
                (StatusCode::CREATED, Json(body_json.unwrap_or(Value::Null))).into_response()
            } else {
                StatusCode::NO_CONTENT.into_response()
            }
        }
        ("PUT", ["indexers", name]) => {
            if state.indexers.insert(name.to_string()) {
                (StatusCode::CREATED, Json(body_json.unwrap_or(Value::Null))).into_response()
            } else {
                StatusCode::NO_CONTENT.into_response()
            }
        }
        ("POST", ["indexers", name, "run"]) => {
            if state.indexers.contains(*name) {
                StatusCode::ACCEPTED.into_response()
            } else {
                (StatusCode::NOT_FOUND, Json(error_body("indexer not found"))).into_response()
            }
        }
        ("GET", ["indexers", _name, "status"]) => {
            let next = if state.status_script.len() > 1 {
                state.status_script.pop_front()
            } else {
                state.status_script.front().cloned()
            };
            (StatusCode::OK, Json(next.unwrap_or_else(no_result))).into_response()
        }
        ("POST", ["indexes", _name, "docs", "search"]) => {
            let value: Vec<Value> = state
                .documents
                .iter()
                .map(|doc| {
                    let mut doc = doc.clone();
                    doc["@search.score"] = json!(1.0);
                    doc
                })
                .collect();
            (
                StatusCode::OK,
                Json(json!({ "@odata.context": "", "value": value })),
            )
                .into_response()
        }
        _ => (StatusCode::NOT_FOUND, Json(error_body("unknown route"))).into_response(),
    }
}
