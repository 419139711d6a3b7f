//! REST surface driven through the router, with the remote services faked
//! over HTTP so the real clients and wire decoding are exercised too.

#![allow(clippy::panic)]

mod common;

use axum::Router;
use axum::http::StatusCode;
use serde_json::{Value, json};

use auto_order_desk::api::build_app;
use common::{UNKNOWN_PRODUCT, Upstream, call, desk_state, field, spawn_upstream};

async fn desk() -> (Router, Upstream) {
    let upstream = spawn_upstream().await;
    let app = build_app(desk_state(&upstream));
    (app, upstream)
}

async fn loaded_desk() -> (Router, Upstream) {
    let (app, upstream) = desk().await;
    let (status, _) = call(&app, "POST", "/api/v1/templates/auto_order/load", None).await;
    assert_eq!(status, StatusCode::OK);
    (app, upstream)
}

#[tokio::test]
async fn health_reports_version() {
    let (app, _upstream) = desk().await;
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["status"]), &json!("healthy"));
    assert_eq!(
        field(&body, &["version"]),
        &json!(env!("CARGO_PKG_VERSION"))
    );
}

#[tokio::test]
async fn idle_slot_is_reported_without_network() {
    let (app, upstream) = desk().await;
    let (status, body) = call(&app, "GET", "/api/v1/templates/auto_order", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["state"]), &json!("idle"));
    assert!(upstream.log.lock().await.is_empty());
}

#[tokio::test]
async fn reading_unopened_types_creates_no_slots() {
    let upstream = spawn_upstream().await;
    let state = desk_state(&upstream);
    let app = build_app(state.clone());

    for i in 0..20 {
        let (status, body) = call(&app, "GET", &format!("/api/v1/templates/junk_{i}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(field(&body, &["state"]), &json!("idle"));
    }
    assert!(state.templates.is_empty().await);
}

#[tokio::test]
async fn malformed_template_type_is_rejected() {
    let (app, _upstream) = desk().await;
    let (status, body) = call(&app, "GET", "/api/v1/templates/Auto-Order", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field(&body, &["error", "code"]), &json!(1005));
}

#[tokio::test]
async fn load_decodes_lenient_wire_fields() {
    let (app, _upstream) = desk().await;
    let (status, body) = call(&app, "POST", "/api/v1/templates/auto_order/load", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["state"]), &json!("loaded"));
    assert_eq!(field(&body, &["template", "id"]), &json!(12));
    assert_eq!(field(&body, &["template", "active"]), &json!(true));
    assert_eq!(field(&body, &["template", "default"]), &json!(true));
    assert_eq!(
        field(&body, &["sample_data", "SUPPLIER_NAME"]),
        &json!("Acme SRL")
    );
    assert_eq!(field(&body, &["validation", "has_errors"]), &json!(false));

    let Some(history) = field(&body, &["history"]).as_array() else {
        panic!("history array expected");
    };
    let [entry] = history.as_slice() else {
        panic!("rows without an id are dropped");
    };
    assert_eq!(field(entry, &["id"]), &json!(11));
}

#[tokio::test]
async fn invalid_edit_blocks_save_without_network() {
    let (app, upstream) = loaded_desk().await;

    let (status, body) = call(
        &app,
        "PATCH",
        "/api/v1/templates/auto_order/fields",
        Some(json!({"body": "Buna ziua,\nva rugam confirmati."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["state"]), &json!("editing"));
    assert_eq!(field(&body, &["unsaved_changes"]), &json!(true));
    assert_eq!(
        field(&body, &["validation", "missing_required"]),
        &json!(["SUPPLIER_NAME"])
    );

    let (status, body) = call(&app, "POST", "/api/v1/templates/auto_order/save", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field(&body, &["error", "code"]), &json!(1001));
    assert!(upstream.posts("templates:save").await.is_empty());
}

#[tokio::test]
async fn valid_edit_saves_over_current_row() {
    let (app, upstream) = loaded_desk().await;

    let (status, _) = call(
        &app,
        "PATCH",
        "/api/v1/templates/auto_order/fields",
        Some(json!({"subject": "Comanda noua {{ORDER_NUMBER}}"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", "/api/v1/templates/auto_order/save", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["state"]), &json!("loaded"));
    assert_eq!(field(&body, &["unsaved_changes"]), &json!(false));

    let saves = upstream.posts("templates:save").await;
    let [request] = saves.as_slice() else {
        panic!("exactly one save expected");
    };
    assert_eq!(field(request, &["template_id"]), &json!(12));
    assert_eq!(
        field(request, &["subject_template"]),
        &json!("Comanda noua {{ORDER_NUMBER}}")
    );
}

#[tokio::test]
async fn duplicate_creates_a_new_row() {
    let (app, upstream) = loaded_desk().await;

    let (status, body) = call(&app, "POST", "/api/v1/templates/auto_order/duplicate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["template", "id"]), &json!(13));

    let saves = upstream.posts("templates:save").await;
    let [request] = saves.as_slice() else {
        panic!("exactly one save expected");
    };
    assert_eq!(field(request, &["template_id"]), &Value::Null);
    assert_eq!(
        field(request, &["template_name"]),
        &json!("Comanda automata - copie")
    );
}

#[tokio::test]
async fn preview_renders_sample_data() {
    let (app, _upstream) = loaded_desk().await;
    let (status, body) = call(&app, "GET", "/api/v1/templates/auto_order/preview", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["subject"]), &json!("Comanda PO-1001"));
    assert_eq!(field(&body, &["unresolved"]), &json!([]));
}

#[tokio::test]
async fn deactivate_requires_confirmation() {
    let (app, upstream) = loaded_desk().await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/templates/auto_order/deactivate",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(upstream.posts("templates:save").await.is_empty());

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/templates/auto_order/deactivate",
        Some(json!({"confirm": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["template", "active"]), &json!(false));
}

#[tokio::test]
async fn history_restore_keeps_current_id() {
    let (app, _upstream) = loaded_desk().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/templates/auto_order/history/11/restore",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["template", "id"]), &json!(12));
    assert_eq!(
        field(&body, &["template", "subject"]),
        &json!("Comanda veche {{ORDER_NUMBER}}")
    );
    assert_eq!(field(&body, &["unsaved_changes"]), &json!(true));

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/templates/auto_order/history/404/restore",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_falls_back_to_sample_recipient() {
    let (app, upstream) = loaded_desk().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/templates/auto_order/test-send",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["subject"]), &json!("Comanda PO-1001"));

    let sends = upstream.posts("templates:test").await;
    let [request] = sends.as_slice() else {
        panic!("one test send expected");
    };
    assert_eq!(field(request, &["recipient_email"]), &json!("orders@acme.ro"));
}

#[tokio::test]
async fn test_send_rejects_invalid_recipient_locally() {
    let (app, upstream) = loaded_desk().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/templates/auto_order/test-send",
        Some(json!({"recipient": "not-an-address"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field(&body, &["error", "code"]), &json!(1004));
    assert!(upstream.posts("templates:test").await.is_empty());
}

#[tokio::test]
async fn simulation_open_then_execute() {
    let (app, upstream) = desk().await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/simulation/open",
        Some(json!({"product_id": 7, "product_name": "Faina alba"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["state"]), &json!("ready"));
    assert_eq!(field(&body, &["can_execute"]), &json!(true));
    assert_eq!(
        field(&body, &["fallback_recipient"]),
        &json!("orders@acme.ro")
    );
    assert_eq!(
        field(&body, &["rendered_preview", "body"]),
        &json!("Buna ziua &lt;Acme&gt;<br>va rugam")
    );

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/simulation/execute",
        Some(json!({"product_id": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(field(&body, &["order_number"]), &json!("5012"));
    assert_eq!(field(&body, &["message"]), &json!("Comanda creata"));
    assert_eq!(upstream.posts("simulation:execute_auto_order").await.len(), 1);

    let (status, _) = call(&app, "GET", "/api/v1/simulation", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejected_simulation_is_shown_inline() {
    let (app, upstream) = desk().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/simulation/open",
        Some(json!({"product_id": UNKNOWN_PRODUCT, "product_name": "?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["state"]), &json!("ready"));
    assert_eq!(field(&body, &["can_execute"]), &json!(false));
    let Some(rows) = field(&body, &["validation_results"]).as_array() else {
        panic!("validation rows expected");
    };
    let [row] = rows.as_slice() else {
        panic!("a single error row expected");
    };
    assert_eq!(field(row, &["status"]), &json!("error"));

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/simulation/execute",
        Some(json!({"product_id": UNKNOWN_PRODUCT})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(upstream.posts("simulation:execute_auto_order").await.is_empty());
}

#[tokio::test]
async fn simulation_test_email_uses_reported_address() {
    let (app, upstream) = desk().await;
    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/simulation/open",
        Some(json!({"product_id": 7, "product_name": "Faina alba"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/simulation/test-email",
        Some(json!({"product_id": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["state"]), &json!("ready"));

    let sends = upstream.posts("simulation:send_test_email").await;
    let [request] = sends.as_slice() else {
        panic!("one test email expected");
    };
    assert_eq!(field(request, &["test_recipient"]), &json!("orders@acme.ro"));
}

#[tokio::test]
async fn search_filters_and_clears() {
    let (app, _upstream) = desk().await;

    let (status, body) = call(&app, "GET", "/api/v1/search/products?q=fa", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["status"]), &json!("results"));
    let Some(hits) = field(&body, &["results"]).as_array() else {
        panic!("results array expected");
    };
    let [hit] = hits.as_slice() else {
        panic!("one product expected");
    };
    assert_eq!(field(hit, &["label"]), &json!("Faina alba"));

    let (status, body) = call(&app, "GET", "/api/v1/search/products?q=f", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, &["status"]), &json!("cleared"));

    let (status, _) = call(&app, "GET", "/api/v1/search/pools?q=fa", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
