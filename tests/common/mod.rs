//! Shared harness: fake upstream services on an ephemeral port and a desk
//! wired to them through the real HTTP clients.

#![allow(dead_code, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower::ServiceExt;

use auto_order_desk::app_state::AppState;
use auto_order_desk::domain::EventBus;
use auto_order_desk::persistence::MemoryDraftStore;
use auto_order_desk::remote::{HttpSearchBackend, HttpSimulationService, HttpTemplateStore};
use auto_order_desk::service::{LifecycleRegistry, SearchRegistry, SimulationController};

/// Product the fake simulation service cannot find.
pub const UNKNOWN_PRODUCT: i64 = 99;

/// Every POST body received by the fake services, tagged with its route.
pub type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

/// Running fake upstream.
pub struct Upstream {
    pub base: String,
    pub log: CallLog,
}

impl Upstream {
    pub fn templates_url(&self) -> String {
        format!("{}/templates", self.base)
    }

    pub fn simulation_url(&self) -> String {
        format!("{}/simulation", self.base)
    }

    pub fn search_url(&self) -> String {
        format!("{}/search", self.base)
    }

    /// Bodies posted under `route`, e.g. `templates:save`.
    pub async fn posts(&self, route: &str) -> Vec<Value> {
        self.log
            .lock()
            .await
            .iter()
            .filter(|(r, _)| r == route)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

fn server_template() -> Value {
    json!({
        "id": "12",
        "template_type": "auto_order",
        "template_name": "Comanda automata",
        "subject_template": "Comanda {{ORDER_NUMBER}}",
        "body_template": "Buna ziua {{SUPPLIER_NAME}},\nva rugam confirmati.",
        "is_active": "1",
        "is_default": 1,
        "created_at": "2026-01-02 09:00:00",
        "updated_at": "2026-01-05 10:00:00",
        "updated_by_name": "Ana"
    })
}

async fn templates_get(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    match q.get("action").map(String::as_str) {
        Some("load") => Json(json!({
            "success": true,
            "template": server_template(),
            "sample_data": {
                "SUPPLIER_NAME": "Acme SRL",
                "ORDER_NUMBER": "PO-1001",
                "SUPPLIER_EMAIL": "orders@acme.ro"
            },
            "available_variables": {
                "SUPPLIER_NAME": {"description": "Supplier"},
                "ORDER_NUMBER": {"description": "Order"}
            }
        })),
        Some("history") => Json(json!({
            "success": true,
            "history": [
                {
                    "id": 11,
                    "template_name": "Varianta veche",
                    "subject_template": "Comanda veche {{ORDER_NUMBER}}",
                    "body_template": "Stimate {{SUPPLIER_NAME}}",
                    "is_active": 0,
                    "updated_at": "2025-12-01T08:00:00Z"
                },
                { "template_name": "fara id" }
            ]
        })),
        _ => Json(json!({"success": false, "message": "unknown action"})),
    }
}

async fn templates_post(
    State(log): State<CallLog>,
    Query(q): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let action = q.get("action").cloned().unwrap_or_default();
    log.lock()
        .await
        .push((format!("templates:{action}"), body.clone()));
    match action.as_str() {
        "save" => {
            let id = body
                .get("template_id")
                .and_then(Value::as_i64)
                .unwrap_or(13);
            let mut record = body.clone();
            if let Some(map) = record.as_object_mut() {
                let _ = map.insert("id".to_string(), json!(id));
                let _ = map.insert("updated_at".to_string(), json!("2026-10-19 12:00:00"));
            }
            Json(json!({"success": true, "template": record}))
        }
        "test" => Json(json!({
            "success": true,
            "preview": {"subject": "Comanda PO-1001", "body": "Buna ziua Acme SRL"}
        })),
        _ => Json(json!({"success": false, "message": "unknown action"})),
    }
}

async fn simulation_get(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let product_id: i64 = q
        .get("product_id")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();
    if product_id == UNKNOWN_PRODUCT {
        return Json(json!({"success": false, "mesaj": "Produs inexistent"}));
    }
    Json(json!({
        "success": true,
        "data": {
            "validations": [
                {"conditie": "Stoc sub minim", "rezultat": "OK", "detalii": "2 < 5"},
                {"condition": "Furnizor activ", "result": "warning", "details": "fara telefon"}
            ],
            "template": {
                "subject_preview": "Comanda PO-1001",
                "body_preview": "Buna ziua <Acme>\nva rugam"
            },
            "simulation": {
                "poate_comanda": true,
                "cantitate": 10,
                "email_furnizor": "orders@acme.ro"
            }
        }
    }))
}

async fn simulation_post(State(log): State<CallLog>, Json(body): Json<Value>) -> Json<Value> {
    let action = body
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    log.lock()
        .await
        .push((format!("simulation:{action}"), body.clone()));
    match action.as_str() {
        "execute_auto_order" => Json(json!({
            "success": true,
            "mesaj": "Comanda creata",
            "numar_comanda": 5012
        })),
        "send_test_email" => Json(json!({"success": true, "message": "Email trimis"})),
        _ => Json(json!({"success": false, "message": "unknown action"})),
    }
}

async fn search_get(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let query = q.get("q").cloned().unwrap_or_default().to_lowercase();
    let rows: Vec<Value> = match q.get("entity").map(String::as_str) {
        Some("products") => vec![
            json!({"id": 1, "denumire": "Faina alba", "stoc": 3}),
            json!({"id": 2, "denumire": "Zahar", "stoc": 40}),
        ],
        Some("sellers") => vec![json!({"id": "S-7", "name": "Acme SRL"})],
        _ => Vec::new(),
    }
    .into_iter()
    .filter(|row| {
        ["denumire", "name"]
            .iter()
            .filter_map(|key| row.get(*key).and_then(Value::as_str))
            .any(|label| label.to_lowercase().contains(&query))
    })
    .collect();
    Json(json!({"success": true, "results": rows}))
}

/// Starts the fake template, simulation and search services.
pub async fn spawn_upstream() -> Upstream {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/templates", get(templates_get).post(templates_post))
        .route("/simulation", get(simulation_get).post(simulation_post))
        .route("/search", get(search_get))
        .with_state(Arc::clone(&log));

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind fake upstream");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("fake upstream address");
    };
    let _server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Upstream {
        base: format!("http://{addr}"),
        log,
    }
}

/// Builds desk state talking to `upstream` through the HTTP clients.
pub fn desk_state(upstream: &Upstream) -> AppState {
    let client = reqwest::Client::new();
    let event_bus = EventBus::new(64);
    AppState {
        templates: Arc::new(LifecycleRegistry::new(
            Arc::new(HttpTemplateStore::new(client.clone(), upstream.templates_url())),
            Arc::new(MemoryDraftStore::new()),
            event_bus.clone(),
            Duration::from_secs(3600),
        )),
        simulation: Arc::new(SimulationController::new(
            Arc::new(HttpSimulationService::new(client.clone(), upstream.simulation_url())),
            event_bus.clone(),
        )),
        search: Arc::new(SearchRegistry::new(
            Arc::new(HttpSearchBackend::new(client, upstream.search_url())),
            Duration::from_millis(5),
            2,
        )),
        event_bus,
    }
}

/// Sends one request through `app` and decodes the JSON reply.
pub async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let body = body.map_or_else(Body::empty, |value| Body::from(value.to_string()));
    let Ok(request) = builder.body(body) else {
        panic!("request builds");
    };
    let Ok(response) = app.clone().oneshot(request).await else {
        panic!("router is infallible");
    };
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body readable");
    };
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Reads a nested JSON field by path.
pub fn field<'a>(value: &'a Value, path: &[&str]) -> &'a Value {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .unwrap_or(&Value::Null)
}
