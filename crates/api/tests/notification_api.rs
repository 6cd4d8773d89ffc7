//! Integration tests for the `/notification` routes.

mod common;

use axum::http::{Method, StatusCode};
use comanda_core::event_types::RESERVATION_CREATE;
use comanda_core::types::Tenant;
use common::{body_json, get, get_as, post_json, send_json_as, TENANT};
use serde_json::json;

// ---------------------------------------------------------------------------
// Tenant headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_tenant_headers_are_rejected() {
    let app = common::build_test_app();
    let response = get(&app, "/notification/logs/1/10").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "Missing X-Org-Id header");
}

#[tokio::test]
async fn tenant_mismatch_is_forbidden() {
    let app = common::build_test_app();
    let response = get_as(&app, Tenant::new(1, 11), "/notification/logs/1/10").await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

// ---------------------------------------------------------------------------
// Manual send
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manual_send_to_unsupported_channel_is_500_without_log() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/notification/send",
        json!({
            "org_id": 1,
            "project_id": 10,
            "recipient": "+5511999990000",
            "channel": "fax",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "unsupported channel: fax");
    assert!(app.store.logs().is_empty());
}

#[tokio::test]
async fn manual_send_uses_active_template() {
    let app = common::build_test_app();
    app.store
        .seed_template(TENANT, "sms", "", "Olá {{nome}}, sua mesa está pronta");

    let response = post_json(
        &app,
        "/notification/send",
        json!({
            "org_id": 1,
            "project_id": 10,
            "event_type": "table_available",
            "recipient": "+5511999990000",
            "channel": "sms",
            "variables": {"nome": "Ana"},
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "sent");
    assert_eq!(json["data"]["external_id"], "ext-sms-1");

    let sent = app.recorders.sms.sent();
    assert_eq!(sent[0].body, "Olá Ana, sua mesa está pronta");
    assert!(app.store.logs().is_empty());
}

#[tokio::test]
async fn manual_send_without_template_is_500() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/notification/send",
        json!({"org_id": 1, "project_id": 10, "recipient": "a@b.c", "channel": "email"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "no active email template");
}

// ---------------------------------------------------------------------------
// Events and logs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn event_ingest_dispatches_and_lists_logs() {
    let app = common::build_test_app();
    app.store
        .seed_config(TENANT, RESERVATION_CREATE, true, &["sms", "email"]);
    app.store
        .seed_template(TENANT, "sms", "", "Reserva de {{customer_name}} confirmada");
    app.store
        .seed_template(TENANT, "email", "Reserva", "Olá {{customer_name}}");

    let response = post_json(
        &app,
        "/notification/event",
        json!({
            "org_id": 1,
            "project_id": 10,
            "event_type": RESERVATION_CREATE,
            "entity_type": "reservation",
            "entity_id": 42,
            "payload": {"customer_name": "Ana", "customer_phone": "+5511999990000"},
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["report"]["attempted"], 1);
    assert_eq!(json["data"]["report"]["delivered"], 1);
    assert_eq!(json["data"]["report"]["channels"][1]["outcome"], "no_recipient");
    assert!(app.store.events()[0].processed);

    let response = get_as(&app, TENANT, "/notification/logs/1/10?limit=5").await;
    assert_eq!(response.status(), StatusCode::OK);
    let logs = body_json(response).await;
    let logs = logs["data"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["channel"], "sms");
    assert_eq!(logs[0]["status"], "sent");
    assert_eq!(logs[0]["message"], "Reserva de {{customer_name}} confirmada");
}

#[tokio::test]
async fn disabled_config_ingests_event_without_logs() {
    let app = common::build_test_app();
    app.store.seed_config(TENANT, RESERVATION_CREATE, false, &["sms"]);
    app.store.seed_template(TENANT, "sms", "", "x");

    let response = post_json(
        &app,
        "/notification/event",
        json!({
            "org_id": 1,
            "project_id": 10,
            "event_type": RESERVATION_CREATE,
            "entity_type": "reservation",
            "entity_id": 1,
            "payload": {"customer_phone": "+5511"},
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await["data"]["report"]["skipped"],
        "config_disabled"
    );
    assert!(app.store.logs().is_empty());
}

#[tokio::test]
async fn event_with_non_object_payload_is_400() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/notification/event",
        json!({
            "org_id": 1,
            "project_id": 10,
            "event_type": RESERVATION_CREATE,
            "entity_type": "reservation",
            "entity_id": 1,
            "payload": "nope",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Templates and configs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn template_create_update_and_list() {
    let app = common::build_test_app();

    let response = post_json(
        &app,
        "/notification/template",
        json!({
            "org_id": 1,
            "project_id": 10,
            "channel": "whatsapp",
            "name": "Lembrete",
            "body": "Até amanhã, {{customer_name}}",
            "variables": ["customer_name"],
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["active"], true);
    assert_eq!(created["data"]["subject"], "");

    let response = send_json_as(
        &app,
        Method::PUT,
        Some(TENANT),
        "/notification/template",
        json!({"org_id": 1, "project_id": 10, "id": id, "active": false}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["active"], false);

    let response = get_as(&app, TENANT, "/notification/templates/1/10").await;
    let list = body_json(response).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
    assert_eq!(list["data"][0]["name"], "Lembrete");
}

#[tokio::test]
async fn updating_unknown_template_is_404() {
    let app = common::build_test_app();
    let response = send_json_as(
        &app,
        Method::PUT,
        Some(TENANT),
        "/notification/template",
        json!({"org_id": 1, "project_id": 10, "id": 999, "name": "x"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn template_with_unknown_channel_is_400() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/notification/template",
        json!({"org_id": 1, "project_id": 10, "channel": "fax", "name": "n", "body": "b"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "unsupported channel: fax");
}

#[tokio::test]
async fn config_upsert_overwrites_in_place() {
    let app = common::build_test_app();

    let first = body_json(
        post_json(
            &app,
            "/notification/config",
            json!({"org_id": 1, "project_id": 10, "event_type": RESERVATION_CREATE, "enabled": true, "channels": ["sms"]}),
        )
        .await,
    )
    .await;
    let second = body_json(
        post_json(
            &app,
            "/notification/config",
            json!({"org_id": 1, "project_id": 10, "event_type": RESERVATION_CREATE, "enabled": false, "channels": ["email", "sms"]}),
        )
        .await,
    )
    .await;

    assert_eq!(first["data"]["id"], second["data"]["id"]);
    assert_eq!(second["data"]["enabled"], false);
    assert_eq!(second["data"]["channels"], json!(["email", "sms"]));

    let response = get_as(&app, TENANT, "/notification/config/1/10").await;
    let configs = body_json(response).await;
    assert_eq!(configs["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn config_with_unknown_channel_is_400() {
    let app = common::build_test_app();
    let response = post_json(
        &app,
        "/notification/config",
        json!({"org_id": 1, "project_id": 10, "event_type": RESERVATION_CREATE, "enabled": true, "channels": ["pigeon"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.logs().is_empty());
}
