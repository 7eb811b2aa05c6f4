use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::extract::{Json, Path, Query};
use crate::engine::dispatch;
use crate::engine::lifecycle::{self, NewOrder, StatusChange};
use crate::engine::payment::{self, PaymentOutcome};
use crate::engine::pricing;
use crate::engine::rating::{self, RatingRequest};
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::courier::GeoPoint;
use crate::models::order::{Order, Quote};
use crate::models::rating::{RaterRole, Rating};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/estimate", post(estimate_order))
        .route("/orders/available", get(available_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/status", put(change_order_status))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/payment", post(update_payment))
        .route("/orders/:id/rate-courier", post(rate_courier))
        .route("/orders/:id/rate-client", post(rate_client))
        .route("/orders/:id/ratings", get(order_ratings))
}

#[derive(Deserialize)]
pub struct EstimateRequest {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    #[serde(default)]
    pub zone_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct EstimateResponse {
    pub zone_id: Option<Uuid>,
    #[serde(flatten)]
    pub quote: Quote,
}

#[derive(Deserialize)]
pub struct AvailableQuery {
    pub zone_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub status: PaymentOutcome,
}

async fn estimate_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, AppError> {
    let zone = pricing::quote_zone(&state, &payload.pickup, payload.zone_id)?;

    let quote = pricing::estimate(
        &payload.pickup,
        &payload.dropoff,
        zone.as_ref(),
        &state.config.pricing,
    )?;

    Ok(Json(EstimateResponse {
        zone_id: zone.map(|zone| zone.id),
        quote,
    }))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<NewOrder>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(lifecycle::create_order(&state, &actor, payload)?))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(lifecycle::get_order(&state, id, &actor)?))
}

async fn available_orders(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<AvailableQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    if actor.role != Role::Courier {
        return Err(AppError::Unauthorized(
            "only couriers can browse available orders".to_string(),
        ));
    }
    Ok(Json(dispatch::find_available(
        &state,
        actor.id,
        query.zone_id,
    )?))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(dispatch::assign(&state, id, actor.id, &actor)?))
}

async fn change_order_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChange>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(lifecycle::change_status(&state, id, &actor, &payload)?))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(lifecycle::cancel(&state, id, &actor, payload.reason)?))
}

async fn update_payment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<PaymentRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(payment::record_payment(
        &state,
        id,
        &actor,
        payload.status,
    )?))
}

async fn rate_courier(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<Rating>, AppError> {
    Ok(Json(rating::record_rating(
        &state,
        id,
        &actor,
        RaterRole::Client,
        payload,
    )?))
}

async fn rate_client(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<Rating>, AppError> {
    Ok(Json(rating::record_rating(
        &state,
        id,
        &actor,
        RaterRole::Courier,
        payload,
    )?))
}

async fn order_ratings(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Rating>>, AppError> {
    lifecycle::get_order(&state, id, &actor)?;
    Ok(Json(rating::ratings_for_order(&state, id)))
}
