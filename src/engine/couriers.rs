use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo;
use crate::models::actor::Actor;
use crate::models::courier::{AccountStatus, Courier, GeoPoint, Vehicle};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourier {
    pub name: String,
    pub phone: String,
    pub vehicle: Vehicle,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

pub fn register(state: &AppState, request: NewCourier) -> Result<Courier, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if request.phone.trim().is_empty() {
        return Err(AppError::Validation("phone cannot be empty".to_string()));
    }
    if let Some(location) = &request.location {
        geo::validate(location)?;
    }

    let now = state.clock.now();
    let courier = Courier {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        phone: request.phone.trim().to_string(),
        vehicle: request.vehicle,
        account_status: AccountStatus::Active,
        is_available: false,
        location: request.location,
        current_order_id: None,
        rating: 0.0,
        total_ratings: 0,
        wallet_balance: 0.0,
        total_deliveries: 0,
        created_at: now,
        updated_at: now,
    };

    state.couriers.insert(courier.id, courier.clone());
    info!(courier_id = %courier.id, "courier registered");
    Ok(courier)
}

pub fn get(state: &AppState, courier_id: Uuid) -> Result<Courier, AppError> {
    state
        .couriers
        .get(&courier_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))
}

fn require_self_or_admin(actor: &Actor, courier_id: Uuid) -> Result<(), AppError> {
    if actor.is_admin() || actor.is_courier(courier_id) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!(
            "{} {} cannot act for courier {courier_id}",
            actor.role, actor.id
        )))
    }
}

/// Last write wins; no order locks are taken.
pub fn update_location(
    state: &AppState,
    courier_id: Uuid,
    actor: &Actor,
    location: GeoPoint,
) -> Result<Courier, AppError> {
    require_self_or_admin(actor, courier_id)?;
    geo::validate(&location)?;

    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    courier.location = Some(location);
    courier.updated_at = state.clock.now();
    debug!(courier_id = %courier_id, lat = location.lat, lng = location.lng, "courier moved");

    Ok(courier.clone())
}

/// Going online requires an active account and no order in hand.
pub fn set_availability(
    state: &AppState,
    courier_id: Uuid,
    actor: &Actor,
    is_available: bool,
) -> Result<Courier, AppError> {
    require_self_or_admin(actor, courier_id)?;

    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    if is_available {
        if !courier.is_active() {
            return Err(AppError::CourierUnavailable(courier_id));
        }
        if let Some(order_id) = courier.current_order_id {
            return Err(AppError::Validation(format!(
                "courier {courier_id} is busy with order {order_id}"
            )));
        }
    }

    courier.is_available = is_available;
    courier.updated_at = state.clock.now();
    info!(courier_id = %courier_id, is_available, "courier availability changed");

    Ok(courier.clone())
}

/// Admin-only. Anything but `active` also takes the courier offline.
pub fn set_account_status(
    state: &AppState,
    courier_id: Uuid,
    actor: &Actor,
    status: AccountStatus,
) -> Result<Courier, AppError> {
    actor.require_admin()?;

    let mut courier = state
        .couriers
        .get_mut(&courier_id)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    courier.account_status = status;
    if status != AccountStatus::Active {
        courier.is_available = false;
    }
    courier.updated_at = state.clock.now();
    info!(courier_id = %courier_id, account_status = ?status, "courier account status changed");

    Ok(courier.clone())
}

pub fn list(state: &AppState) -> Vec<Courier> {
    let mut couriers: Vec<Courier> = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    couriers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    couriers
}
