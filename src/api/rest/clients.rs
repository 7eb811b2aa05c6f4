use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::{Json, Path};
use crate::engine::clients::{self, NewClient};
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::client::Client;
use crate::models::courier::AccountStatus;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/clients", post(create_client))
        .route("/clients/:id", get(get_client))
        .route("/clients/:id/account", patch(update_client_account))
}

async fn create_client(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewClient>,
) -> Result<Json<Client>, AppError> {
    Ok(Json(clients::register(&state, payload)?))
}

async fn get_client(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    Ok(Json(clients::get(&state, id, &actor)?))
}

#[derive(Deserialize)]
pub struct UpdateAccountRequest {
    pub status: AccountStatus,
}

async fn update_client_account(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<Client>, AppError> {
    Ok(Json(clients::set_account_status(
        &state,
        id,
        &actor,
        payload.status,
    )?))
}
