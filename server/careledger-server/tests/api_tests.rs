/// HTTP surface tests over the in-memory store
///
/// Exercises the JSON wire format, the error envelope, and the HTTP status
/// mapping of the ledger error taxonomy.
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use careledger_server::{routes, CareLedgerServer};
use http_body_util::BodyExt;
use ledger_service::MemoryLedgerStore;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let server = CareLedgerServer::new_with_store(Arc::new(MemoryLedgerStore::new()));
    routes::create_router(server)
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");

    let response = app.clone().oneshot(req).await.expect("handler responds");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is json")
    };
    (status, value)
}

async fn register_patient(app: &Router, id: &str, monthly_fee: &str) {
    let (status, body) = request(
        app,
        Method::POST,
        "/api/patients",
        Some(json!({
            "id": id,
            "name": "Asha Verma",
            "phone": "9876500001",
            "admission_date": "2025-01-02",
            "monthly_fee": monthly_fee,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn test_health_reports_store_mode() {
    let app = app();
    let (status, body) = request(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("healthy"));
    assert_eq!(body["data"]["checks"]["database"], json!("not_configured"));
}

#[tokio::test]
async fn test_payment_flow_over_http() {
    let app = app();
    register_patient(&app, "P0001", "0.00").await;

    let (status, _) = request(
        &app,
        Method::PUT,
        "/api/patients/P0001/records/2099/1/fees",
        Some(json!({"monthly_fee": "100.00", "other_fees": "0.00"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/patients/P0001/payments",
        Some(json!({
            "amount": "60.00",
            "payment_date": "2099-01-05",
            "payment_mode": "upi",
            "type": "fee_payment",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let record = &body["data"]["months"][0]["record"];
    assert_eq!(record["amount_paid"], json!("60.00"));
    assert_eq!(record["amount_pending"], json!("40.00"));
    assert_eq!(record["payment_status"], json!("partial"));
    assert_eq!(body["data"]["summary"]["balance_due"], json!("40.00"));

    let (status, body) = request(&app, Method::GET, "/api/patients/P0001/statement", None).await;
    assert_eq!(status, StatusCode::OK);
    let payments = body["data"]["months"][0]["payments"]
        .as_array()
        .expect("payments array");
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["applied_amount"], json!("60.00"));

    let (status, body) = request(&app, Method::GET, "/api/patients/P0001/payments", None).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().expect("payment history array");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["type"], json!("fee_payment"));
    assert_eq!(history[0]["payment_mode"], json!("upi"));
}

#[tokio::test]
async fn test_statement_for_unknown_patient_is_404() {
    let app = app();
    let (status, body) = request(&app, Method::GET, "/api/patients/P9999/statement", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("not_found"));
}

#[tokio::test]
async fn test_invalid_payment_is_400() {
    let app = app();
    register_patient(&app, "P0002", "0.00").await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/patients/P0002/payments",
        Some(json!({
            "amount": "0.00",
            "payment_date": "2099-01-05",
            "payment_mode": "cash",
            "type": "fee_payment",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("validation_error"));

    // A half-specified target period is rejected before touching the ledger.
    let (status, _) = request(
        &app,
        Method::POST,
        "/api/patients/P0002/payments",
        Some(json!({
            "amount": "50.00",
            "payment_date": "2099-01-05",
            "payment_mode": "cash",
            "type": "fee_payment",
            "month": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_open_period_seeds_default_fee() {
    let app = app();
    register_patient(&app, "P0003", "750.00").await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/patients/P0003/records/2099/3",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let record = &body["data"]["months"][0]["record"];
    assert_eq!(record["monthly_fee"], json!("750.00"));
    assert_eq!(record["payment_status"], json!("pending"));
}

#[tokio::test]
async fn test_delete_patient_removes_ledger() {
    let app = app();
    register_patient(&app, "P0004", "0.00").await;

    let (status, body) = request(&app, Method::DELETE, "/api/patients/P0004", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], json!(true));

    let (status, _) = request(&app, Method::GET, "/api/patients/P0004", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app();
    let (status, body) = request(&app, Method::GET, "/api/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/patients/{id}/statement"].is_object());
}
