use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use delivery_core::api::rest::router;
use delivery_core::config::Config;
use delivery_core::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const PICKUP: (f64, f64) = (12.3714, -1.5197);
const DROPOFF: (f64, f64) = (12.38, -1.51);

fn setup() -> Router {
    router(Arc::new(AppState::new(Config::default())))
}

fn json_request(method: &str, uri: &str, actor: Option<(&str, &str)>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((id, role)) = actor {
        builder = builder.header("x-actor-id", id).header("x-actor-role", role);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, actor: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((id, role)) = actor {
        builder = builder.header("x-actor-id", id).header("x-actor-role", role);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn stop(point: (f64, f64), address: &str) -> Value {
    json!({ "location": { "lat": point.0, "lng": point.1 }, "address": address })
}

fn order_body(payment_method: &str) -> Value {
    json!({
        "pickup": stop(PICKUP, "Avenue Kwame Nkrumah"),
        "dropoff": stop(DROPOFF, "Rue de la Chance"),
        "package": { "description": "documents", "size": "small" },
        "payment_method": payment_method
    })
}

async fn create_client(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/clients",
            None,
            json!({ "name": "Awa", "phone": "+22670000001" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

async fn create_online_courier(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            None,
            json!({
                "name": "Issa",
                "phone": "+22670000002",
                "vehicle": { "kind": "motorcycle", "plate_number": "11 KK 2233" },
                "location": { "lat": PICKUP.0, "lng": PICKUP.1 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/couriers/{id}/availability"),
            Some((id.as_str(), "courier")),
            json!({ "is_available": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    id
}

async fn create_order(app: &Router, client_id: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            Some((client_id, "client")),
            order_body("cash"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

async fn set_status(app: &Router, order_id: &str, actor: (&str, &str), body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "PUT",
            &format!("/orders/{order_id}/status"),
            Some(actor),
            body,
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["orders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("pending_orders"));
}

#[tokio::test]
async fn create_courier_starts_offline() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            None,
            json!({
                "name": "Alice",
                "phone": "+22670000003",
                "vehicle": { "kind": "bicycle" }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["is_available"], false);
    assert_eq!(body["account_status"], "active");
    assert_eq!(body["wallet_balance"], 0.0);
}

#[tokio::test]
async fn create_client_empty_name_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/clients",
            None,
            json!({ "name": "  ", "phone": "+22670000004" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "validation");
}

#[tokio::test]
async fn estimate_uses_default_rates() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders/estimate",
            None,
            json!({
                "pickup": { "lat": PICKUP.0, "lng": PICKUP.1 },
                "dropoff": { "lat": DROPOFF.0, "lng": DROPOFF.1 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["zone_id"], Value::Null);
    assert_eq!(body["distance_km"], 1.42);
    assert_eq!(body["total_price"], 784.0);
    assert_eq!(body["eta_minutes"], 4);
}

#[tokio::test]
async fn estimate_rejects_invalid_coordinate() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders/estimate",
            None,
            json!({
                "pickup": { "lat": 91.0, "lng": 0.0 },
                "dropoff": { "lat": DROPOFF.0, "lng": DROPOFF.1 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "invalid_coordinate");
}

#[tokio::test]
async fn create_order_without_actor_returns_403() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/orders", None, order_body("cash")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn full_delivery_flow() {
    let app = setup();
    let client_id = create_client(&app).await;
    let courier_id = create_online_courier(&app).await;
    let order_id = create_order(&app, &client_id).await;

    let response = app
        .clone()
        .oneshot(get_request(
            "/orders/available",
            Some((courier_id.as_str(), "courier")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/accept"),
            Some((courier_id.as_str(), "courier")),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "assigned");
    assert_eq!(body["courier_id"], courier_id.as_str());

    let courier = (courier_id.as_str(), "courier");
    let response = set_status(&app, &order_id, courier, json!({ "status": "picked_up" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = set_status(&app, &order_id, courier, json!({ "status": "delivered" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "delivered");
    assert_eq!(body["payment_status"], "paid");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/rate-courier"),
            Some((client_id.as_str(), "client")),
            json!({ "score": 5, "review": "fast" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/couriers/{courier_id}"), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["rating"], 5.0);
    assert_eq!(body["total_deliveries"], 1);
    assert_eq!(body["current_order_id"], Value::Null);
    assert!((body["wallet_balance"].as_f64().unwrap() - 666.4).abs() < 1e-9);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/rate-courier"),
            Some((client_id.as_str(), "client")),
            json!({ "score": 4 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "duplicate_rating");
}

#[tokio::test]
async fn second_accept_returns_409() {
    let app = setup();
    let client_id = create_client(&app).await;
    let first = create_online_courier(&app).await;
    let second = create_online_courier(&app).await;
    let order_id = create_order(&app, &client_id).await;

    let accept = |courier: String| {
        let app = app.clone();
        let uri = format!("/orders/{order_id}/accept");
        async move {
            app.oneshot(json_request(
                "POST",
                &uri,
                Some((courier.as_str(), "courier")),
                json!({}),
            ))
            .await
            .unwrap()
        }
    };

    let response = accept(first).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = accept(second).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "order_already_assigned");
}

#[tokio::test]
async fn cancel_after_pickup_returns_409() {
    let app = setup();
    let client_id = create_client(&app).await;
    let courier_id = create_online_courier(&app).await;
    let order_id = create_order(&app, &client_id).await;
    let admin = Uuid::new_v4().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/admin/orders/{order_id}/assign"),
            Some((admin.as_str(), "admin")),
            json!({ "courier_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = set_status(
        &app,
        &order_id,
        (courier_id.as_str(), "courier"),
        json!({ "status": "picked_up" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            Some((client_id.as_str(), "client")),
            json!({ "reason": "changed my mind" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "illegal_transition");
}

#[tokio::test]
async fn mobile_money_order_waits_for_payment() {
    let app = setup();
    let client_id = create_client(&app).await;
    let courier_id = create_online_courier(&app).await;
    let admin = Uuid::new_v4().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            Some((client_id.as_str(), "client")),
            order_body("mobile_money"),
        ))
        .await
        .unwrap();
    let order_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let accept = json_request(
        "POST",
        &format!("/orders/{order_id}/accept"),
        Some((courier_id.as_str(), "courier")),
        json!({}),
    );
    let response = app.clone().oneshot(accept).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "payment_pending");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/payment"),
            Some((admin.as_str(), "admin")),
            json!({ "status": "paid" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/accept"),
            Some((courier_id.as_str(), "courier")),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn nearby_lists_online_couriers_by_distance() {
    let app = setup();
    let courier_id = create_online_courier(&app).await;

    let response = app
        .oneshot(get_request(
            &format!("/couriers/nearby?lat={}&lng={}", DROPOFF.0, DROPOFF.1),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let couriers = body.as_array().unwrap();
    assert_eq!(couriers.len(), 1);
    assert_eq!(couriers[0]["id"], courier_id.as_str());
    assert!(couriers[0]["distance_km"].as_f64().unwrap() > 1.0);
}

#[tokio::test]
async fn bulk_cancel_reports_each_order() {
    let app = setup();
    let client_id = create_client(&app).await;
    let first = create_order(&app, &client_id).await;
    let second = create_order(&app, &client_id).await;
    let missing = Uuid::new_v4().to_string();
    let admin = Uuid::new_v4().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/admin/orders/bulk-status",
            Some((admin.as_str(), "admin")),
            json!({
                "order_ids": [first, second, missing],
                "status": "cancelled",
                "reason": "depot closed"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["processed"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["items"][2]["error"]["code"], "not_found");

    let response = app
        .oneshot(get_request("/admin/stats", Some((admin.as_str(), "admin"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_orders"], 2);
    assert_eq!(body["orders_by_status"]["cancelled"], 2);
}

#[tokio::test]
async fn stats_require_admin() {
    let app = setup();
    let client_id = create_client(&app).await;

    let response = app
        .oneshot(get_request("/admin/stats", Some((client_id.as_str(), "client"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_order_returns_404() {
    let app = setup();
    let admin = Uuid::new_v4().to_string();
    let response = app
        .oneshot(get_request(
            &format!("/orders/{}", Uuid::new_v4()),
            Some((admin.as_str(), "admin")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_requests_return_structured_validation_errors() {
    let app = setup();
    let client_id = create_client(&app).await;
    let order_id = create_order(&app, &client_id).await;
    let admin = Uuid::new_v4().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/rate-courier"),
            Some((client_id.as_str(), "client")),
            json!({ "score": 300 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation");

    let response = set_status(
        &app,
        &order_id,
        (admin.as_str(), "admin"),
        json!({ "status": "teleported" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation");

    let response = app
        .clone()
        .oneshot(get_request(
            "/orders/not-a-uuid",
            Some((admin.as_str(), "admin")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation");

    let response = app
        .oneshot(get_request("/couriers/nearby?lat=abc&lng=1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation");
}

#[tokio::test]
async fn estimate_rejects_zone_outside_pickup() {
    let app = setup();
    let admin = Uuid::new_v4().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/zones",
            Some((admin.as_str(), "admin")),
            json!({
                "name": "Abidjan Plateau",
                "shape": {
                    "type": "rectangle",
                    "south_west": { "lat": 5.3, "lng": -4.05 },
                    "north_east": { "lat": 5.35, "lng": -4.0 }
                },
                "base_price": 800.0,
                "price_per_km": 300.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let zone_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request(
            "POST",
            "/orders/estimate",
            None,
            json!({
                "pickup": { "lat": PICKUP.0, "lng": PICKUP.1 },
                "dropoff": { "lat": DROPOFF.0, "lng": DROPOFF.1 },
                "zone_id": zone_id
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation");
}

#[tokio::test]
async fn suspended_client_cannot_order() {
    let app = setup();
    let client_id = create_client(&app).await;
    let admin = Uuid::new_v4().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/clients/{client_id}/account"),
            Some((admin.as_str(), "admin")),
            json!({ "status": "suspended" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["account_status"], "suspended");

    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            Some((client_id.as_str(), "client")),
            order_body("cash"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
