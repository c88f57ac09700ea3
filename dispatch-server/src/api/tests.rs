use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use shared::DriverProfile;
use tower::ServiceExt;

use super::build_app;
use crate::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::core::{Config, ServerState};
use crate::orders::{OrderStorage, OrdersManager};
use crate::profiles::InMemoryProfiles;

fn test_app() -> Router {
    let profiles = Arc::new(InMemoryProfiles::with_profiles([
        DriverProfile::new("d1", true, false),
        DriverProfile::new("d2", true, false),
    ]));
    let orders = OrdersManager::with_storage(OrderStorage::open_in_memory().unwrap(), profiles);
    build_app(ServerState::with_orders(Config::default(), orders))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = user {
        builder = builder.header(USER_ID_HEADER, id).header(USER_ROLE_HEADER, role);
    }
    let request = match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

async fn create_order(app: &Router) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/orders",
        Some(("c1", "client")),
        Some(json!({
            "client_name": "Ana García",
            "items": [{
                "product_id": "p1",
                "name": "Paella",
                "quantity": 2,
                "unit_price": "50.00"
            }],
            "delivery_address": { "street": "Calle Colón 5", "city": "Valencia" },
            "delivery_fee": "10.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["code"], "E0000");
    body["data"]["order_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_identity_is_rejected() {
    let app = test_app();
    let (status, body) = call(&app, "GET", "/api/orders/pending", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "E3001");

    let (status, _) = call(&app, "GET", "/api/orders", Some(("x", "system")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delivery_over_http() {
    let app = test_app();
    let order_id = create_order(&app).await;

    let (status, body) = call(&app, "GET", "/api/orders/pending", Some(("d1", "driver")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let accept = format!("/api/orders/{order_id}/accept");
    let (status, body) = call(&app, "POST", &accept, Some(("d1", "driver")), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "driver_assigned");

    let (status, body) = call(&app, "POST", &accept, Some(("d2", "driver")), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "E0004");
    assert_eq!(body["data"]["reason"], "ALREADY_ASSIGNED");

    let start = format!("/api/orders/{order_id}/start");
    let (status, body) = call(&app, "POST", &start, Some(("d1", "driver")), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["reason"], "VALIDATION_ERROR");

    let (status, body) = call(
        &app,
        "POST",
        &start,
        Some(("d1", "driver")),
        Some(json!({ "pickup_photo_url": "photos/pickup.jpg" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "out_for_delivery");

    let complete = format!("/api/orders/{order_id}/complete");
    let proof = json!({
        "command_id": "deliver-1",
        "delivery_photo_url": "photos/door.jpg",
        "signature_data": "sig-base64"
    });
    let (status, body) = call(&app, "POST", &complete, Some(("d1", "driver")), Some(proof.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "delivered");

    // Retried with the same command id: acknowledged, not applied again
    let (status, _) = call(&app, "POST", &complete, Some(("d1", "driver")), Some(proof)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "GET", "/api/wallet/d1/balance", Some(("d1", "driver")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["balance"]), dec!(10.00));
    assert_eq!(body["data"]["transaction_count"], 1);

    let (status, _) = call(&app, "GET", "/api/wallet/d1/balance", Some(("d2", "driver")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "POST", &complete, Some(("d1", "driver")), Some(json!({
        "delivery_photo_url": "photos/door.jpg",
        "signature_data": "sig-base64"
    })))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["reason"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = test_app();
    let order_id = create_order(&app).await;

    let (status, _) = call(&app, "GET", "/api/orders", Some(("c1", "client")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, "GET", "/api/rejections", Some(("d1", "driver")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let cancel = format!("/api/orders/{order_id}/cancel");
    let (status, _) = call(&app, "POST", &cancel, Some(("d1", "driver")), Some(json!({ "reason": "x" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        "POST",
        &cancel,
        Some(("admin-1", "admin")),
        Some(json!({ "reason": "Client called" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, body) = call(&app, "GET", "/api/orders?status=cancelled", Some(("admin-1", "admin")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_profile_gate_over_http() {
    let app = test_app();
    let order_id = create_order(&app).await;

    // Unknown driver is not eligible
    let (status, _) = call(&app, "GET", "/api/orders/pending", Some(("d9", "driver")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let reject = format!("/api/orders/{order_id}/reject");
    let (status, body) = call(&app, "POST", &reject, Some(("d9", "driver")), Some(json!({ "reason": "too far" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["data"]["reason"], "NOT_ELIGIBLE");

    let (status, _) = call(
        &app,
        "PUT",
        "/api/drivers/d9/profile",
        Some(("admin-1", "admin")),
        Some(json!({ "is_approved": true, "is_blocked": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", &reject, Some(("d9", "driver")), Some(json!({ "reason": "too far" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reason"], "too far");

    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/rejections?order_id={order_id}"),
        Some(("admin-1", "admin")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Rejecting leaves the order in the pool
    let (_, body) = call(&app, "GET", &format!("/api/orders/{order_id}"), Some(("c1", "client")), None).await;
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn test_sync_endpoint() {
    let app = test_app();
    create_order(&app).await;

    let (status, body) = call(&app, "GET", "/api/sync?since_sequence=0", Some(("a1", "admin")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["server_sequence"], 1);
    let epoch = body["data"]["server_epoch"].as_str().unwrap().to_string();

    let (_, body) = call(
        &app,
        "GET",
        &format!("/api/sync?since_sequence=1&epoch={epoch}"),
        Some(("a1", "admin")),
        None,
    )
    .await;
    assert!(body["data"]["events"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["requires_full_sync"], false);
}
