use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::{Json, Path, Query};
use crate::engine::couriers::{self, NewCourier};
use crate::engine::dispatch::{self, NearbyCourier};
use crate::engine::wallet;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::courier::{AccountStatus, Courier, GeoPoint};
use crate::models::withdrawal::Withdrawal;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/nearby", get(nearby_couriers))
        .route("/couriers/:id", get(get_courier))
        .route("/couriers/:id/location", patch(update_courier_location))
        .route("/couriers/:id/availability", patch(update_courier_availability))
        .route("/couriers/:id/account", patch(update_courier_account))
        .route(
            "/couriers/:id/withdrawals",
            post(request_withdrawal).get(list_withdrawals),
        )
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: bool,
}

#[derive(Deserialize)]
pub struct UpdateAccountRequest {
    pub status: AccountStatus,
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct WithdrawalRequest {
    pub amount: f64,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewCourier>,
) -> Result<Json<Courier>, AppError> {
    Ok(Json(couriers::register(&state, payload)?))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    Json(couriers::list(&state))
}

async fn get_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Courier>, AppError> {
    Ok(Json(couriers::get(&state, id)?))
}

async fn nearby_couriers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyCourier>>, AppError> {
    let point = GeoPoint {
        lat: query.lat,
        lng: query.lng,
    };
    let radius_km = query.radius_km.unwrap_or(state.config.nearby_radius_km);
    let limit = query.limit.unwrap_or(state.config.nearby_limit);

    Ok(Json(dispatch::find_nearby(&state, &point, radius_km, limit)?))
}

async fn update_courier_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    Ok(Json(couriers::update_location(
        &state,
        id,
        &actor,
        payload.location,
    )?))
}

async fn update_courier_availability(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Courier>, AppError> {
    Ok(Json(couriers::set_availability(
        &state,
        id,
        &actor,
        payload.is_available,
    )?))
}

async fn update_courier_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<Courier>, AppError> {
    Ok(Json(couriers::set_account_status(
        &state,
        id,
        &actor,
        payload.status,
    )?))
}

async fn request_withdrawal(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<WithdrawalRequest>,
) -> Result<Json<Withdrawal>, AppError> {
    Ok(Json(wallet::request_withdrawal(
        &state,
        id,
        &actor,
        payload.amount,
    )?))
}

async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Withdrawal>>, AppError> {
    Ok(Json(wallet::list_withdrawals(&state, id, &actor)?))
}
