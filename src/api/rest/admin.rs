use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::extract::{Json, Path};
use crate::engine::dispatch;
use crate::engine::lifecycle::{self, BatchReport, StatusChange};
use crate::engine::stats::{self, DashboardStats};
use crate::engine::wallet;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::order::Order;
use crate::models::withdrawal::Withdrawal;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/orders/:id/assign", post(assign_order))
        .route("/admin/orders/bulk-status", post(bulk_status))
        .route("/admin/stats", get(dashboard))
        .route("/admin/withdrawals/:id/resolve", post(resolve_withdrawal))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub courier_id: Uuid,
}

#[derive(Deserialize)]
pub struct BulkStatusRequest {
    pub order_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub change: StatusChange,
}

#[derive(Deserialize)]
pub struct ResolveWithdrawalRequest {
    pub approve: bool,
}

async fn assign_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Order>, AppError> {
    actor.require_admin()?;
    Ok(Json(dispatch::assign(&state, id, payload.courier_id, &actor)?))
}

async fn bulk_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<BulkStatusRequest>,
) -> Result<Json<BatchReport>, AppError> {
    actor.require_admin()?;
    if payload.order_ids.is_empty() {
        return Err(AppError::Validation("order_ids cannot be empty".to_string()));
    }

    let transition = payload.change.to_transition(&actor)?.ok_or_else(|| {
        AppError::Validation(format!(
            "{} is not a valid bulk target",
            payload.change.status
        ))
    })?;

    Ok(Json(lifecycle::apply_batch(
        &state,
        &payload.order_ids,
        &actor,
        &transition,
    )))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<DashboardStats>, AppError> {
    actor.require_admin()?;
    Ok(Json(stats::dashboard_stats(&state).await))
}

async fn resolve_withdrawal(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveWithdrawalRequest>,
) -> Result<Json<Withdrawal>, AppError> {
    Ok(Json(wallet::resolve_withdrawal(
        &state,
        id,
        &actor,
        payload.approve,
    )?))
}
