use std::time::Instant;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::engine::lifecycle::{self, Transition};
use crate::error::AppError;
use crate::geo;
use crate::models::actor::Actor;
use crate::models::courier::{Courier, GeoPoint};
use crate::models::order::Order;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct NearbyCourier {
    #[serde(flatten)]
    pub courier: Courier,
    pub distance_km: f64,
}

/// Orders a courier may accept, oldest first.
pub fn find_available(
    state: &AppState,
    courier_id: Uuid,
    zone_id: Option<Uuid>,
) -> Result<Vec<Order>, AppError> {
    let courier_active = state
        .couriers
        .get(&courier_id)
        .map(|courier| courier.is_active())
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;
    if !courier_active {
        return Err(AppError::CourierUnavailable(courier_id));
    }

    let zone_shape = match zone_id {
        Some(zone_id) => Some(
            state
                .zones
                .get(&zone_id)
                .map(|zone| zone.shape.clone())
                .ok_or_else(|| AppError::NotFound(format!("zone {zone_id} not found")))?,
        ),
        None => None,
    };

    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| entry.is_dispatchable())
        .filter(|entry| match &zone_shape {
            Some(shape) => geo::point_in_zone(&entry.pickup.location, shape).unwrap_or(false),
            None => true,
        })
        .map(|entry| entry.value().clone())
        .collect();

    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(orders)
}

/// Atomically hands a pending order to a courier. A lost race surfaces as
/// `OrderAlreadyAssigned` and is never retried here.
pub fn assign(
    state: &AppState,
    order_id: Uuid,
    courier_id: Uuid,
    actor: &Actor,
) -> Result<Order, AppError> {
    lifecycle::apply_transition(state, order_id, actor, Transition::Assign { courier_id })
        .inspect_err(|err| {
            if let Some(reason) = rejection_reason(err) {
                state
                    .metrics
                    .dispatch_rejections_total
                    .with_label_values(&[reason])
                    .inc();
                debug!(
                    order_id = %order_id,
                    courier_id = %courier_id,
                    reason,
                    "assignment rejected"
                );
            }
        })
}

fn rejection_reason(err: &AppError) -> Option<&'static str> {
    match err {
        AppError::OrderAlreadyAssigned(_) => Some("order_already_assigned"),
        AppError::CourierUnavailable(_) => Some("courier_unavailable"),
        AppError::PaymentPending(_) => Some("payment_pending"),
        AppError::IllegalTransition { .. } => Some("illegal_transition"),
        _ => None,
    }
}

/// Couriers free to take an order within `radius_km`, nearest first.
pub fn find_nearby(
    state: &AppState,
    point: &GeoPoint,
    radius_km: f64,
    limit: usize,
) -> Result<Vec<NearbyCourier>, AppError> {
    geo::validate(point)?;
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(AppError::Validation("radius_km must be > 0".to_string()));
    }
    if limit == 0 {
        return Err(AppError::Validation("limit must be > 0".to_string()));
    }

    let start = Instant::now();
    let mut nearby: Vec<NearbyCourier> = state
        .couriers
        .iter()
        .filter(|entry| entry.can_take_orders())
        .filter_map(|entry| {
            let location = entry.location?;
            let distance_km = geo::haversine_km(point, &location);
            (distance_km <= radius_km).then(|| NearbyCourier {
                courier: entry.value().clone(),
                distance_km,
            })
        })
        .collect();

    nearby.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then(a.courier.id.cmp(&b.courier.id))
    });
    nearby.truncate(limit);

    state
        .metrics
        .operation_latency_seconds
        .with_label_values(&["find_nearby"])
        .observe(start.elapsed().as_secs_f64());

    Ok(nearby)
}
