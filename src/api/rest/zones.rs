use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::extract::Json;
use crate::error::AppError;
use crate::geo;
use crate::models::actor::Actor;
use crate::models::zone::{Zone, ZoneShape};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/zones", post(create_zone).get(list_zones))
}

#[derive(Deserialize)]
pub struct CreateZoneRequest {
    pub name: String,
    pub shape: ZoneShape,
    pub base_price: f64,
    pub price_per_km: f64,
    #[serde(default)]
    pub is_surge: bool,
    #[serde(default = "default_surge_multiplier")]
    pub surge_multiplier: f64,
}

fn default_surge_multiplier() -> f64 {
    1.0
}

async fn create_zone(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateZoneRequest>,
) -> Result<Json<Zone>, AppError> {
    actor.require_admin()?;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if !(payload.base_price >= 0.0 && payload.price_per_km >= 0.0) {
        return Err(AppError::Validation("prices must be >= 0".to_string()));
    }
    if payload.is_surge && !(payload.surge_multiplier.is_finite() && payload.surge_multiplier > 0.0)
    {
        return Err(AppError::Validation(
            "surge_multiplier must be a positive number".to_string(),
        ));
    }
    geo::validate_shape(&payload.shape)?;

    let zone = Zone {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        shape: payload.shape,
        base_price: payload.base_price,
        price_per_km: payload.price_per_km,
        is_surge: payload.is_surge,
        surge_multiplier: payload.surge_multiplier,
        is_active: true,
        created_at: state.clock.now(),
    };

    state.zones.insert(zone.id, zone.clone());
    info!(zone_id = %zone.id, name = %zone.name, "zone created");
    Ok(Json(zone))
}

async fn list_zones(State(state): State<Arc<AppState>>) -> Json<Vec<Zone>> {
    let mut zones: Vec<Zone> = state
        .zones
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    zones.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Json(zones)
}
