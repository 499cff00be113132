//! End-to-end requests through the router: auth, gate and response envelopes.

mod common;

use assetflow_api::auth::Role;
use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

fn new_order_body() -> serde_json::Value {
    json!({
        "title": "Formworks for Level 4",
        "items": [
            { "item_name": "Phenolic board", "quantity": 40, "unit_price": "1150.00", "unit": "sheet" }
        ]
    })
}

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/v1/procurement-orders", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .request(Method::GET, "/api/v1/procurement-orders", Some("not-a-jwt"), None)
        .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_fetch_over_http() {
    let app = TestApp::new().await;
    let token = app.token(Uuid::new_v4(), Role::ProcurementOfficer);

    let created = app
        .request(
            Method::POST,
            "/api/v1/procurement-orders",
            Some(&token),
            Some(new_order_body()),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = response_json(created).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "Draft");
    let subtotal: Decimal = body["data"]["subtotal"].as_str().unwrap().parse().unwrap();
    assert_eq!(subtotal, dec!(46000));
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let fetched = app
        .request(
            Method::GET,
            &format!("/api/v1/procurement-orders/{}", id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(fetched.status(), StatusCode::OK);
    let detail = response_json(fetched).await;
    assert_eq!(detail["data"]["items"].as_array().unwrap().len(), 1);
    assert!(detail["data"]["allowed_actions"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a == "submit"));

    let submitted = app
        .request(
            Method::POST,
            &format!("/api/v1/procurement-orders/{}/submit", id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(submitted.status(), StatusCode::OK);
    assert_eq!(response_json(submitted).await["data"]["status"], "Pending");
}

#[tokio::test]
async fn gate_denials_map_to_forbidden() {
    let app = TestApp::new().await;
    let clerk = app.token(Uuid::new_v4(), Role::SiteInventoryClerk);

    let response = app
        .request(
            Method::POST,
            "/api/v1/procurement-orders",
            Some(&clerk),
            Some(new_order_body()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn invalid_bodies_list_field_errors() {
    let app = TestApp::new().await;
    let token = app.token(Uuid::new_v4(), Role::ProcurementOfficer);

    let response = app
        .request(
            Method::POST,
            "/api/v1/procurement-orders",
            Some(&token),
            Some(json!({ "title": "", "items": [] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    let errors: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e.as_str())
        .collect();
    assert!(errors.contains(&"title: Title is required"));
    assert!(errors.contains(&"items: At least one item is required"));
}

#[tokio::test]
async fn unknown_orders_are_not_found() {
    let app = TestApp::new().await;
    let token = app.token(Uuid::new_v4(), Role::FinanceDirector);
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/procurement-orders/{}", Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wrong_method_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token(Uuid::new_v4(), Role::FinanceDirector);
    let response = app
        .request(
            Method::DELETE,
            "/api/v1/procurement-orders",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn metrics_and_openapi_are_served() {
    let app = TestApp::new().await;
    let metrics = app.request(Method::GET, "/metrics", None, None).await;
    assert_eq!(metrics.status(), StatusCode::OK);

    let docs = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(docs.status(), StatusCode::OK);
    let doc = response_json(docs).await;
    assert!(doc["paths"]["/api/v1/procurement-orders/{id}/receive"].is_object());
}
