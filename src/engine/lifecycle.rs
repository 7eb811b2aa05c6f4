//! Order lifecycle: creation and the status state machine.
//!
//! ```text
//! pending -> assigned -> picked_up -> delivered
//!    \          |
//!     `---------+--> cancelled
//! ```
//!
//! Every transition runs while holding the order's map entry exclusively, so
//! writers for the same order are serialized. Courier side effects are applied
//! under the same critical section and only after every check has passed.

use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::mapref::one::RefMut;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::pricing;
use crate::error::{AppError, ErrorBody};
use crate::geo;
use crate::models::actor::{Actor, Role};
use crate::models::courier::{AccountStatus, Courier};
use crate::models::event::{OrderEvent, OrderEventKind};
use crate::models::order::{Order, OrderStatus, Package, PaymentMethod, PaymentStatus, Stop};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Assign { courier_id: Uuid },
    PickUp,
    Deliver,
    Cancel { reason: String },
}

impl Transition {
    pub fn target(&self) -> OrderStatus {
        match self {
            Transition::Assign { .. } => OrderStatus::Assigned,
            Transition::PickUp => OrderStatus::PickedUp,
            Transition::Deliver => OrderStatus::Delivered,
            Transition::Cancel { .. } => OrderStatus::Cancelled,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Transition::Assign { .. } => "assign",
            Transition::PickUp => "pick_up",
            Transition::Deliver => "deliver",
            Transition::Cancel { .. } => "cancel",
        }
    }
}

pub fn is_allowed(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    matches!(
        (from, to),
        (Pending, Assigned)
            | (Assigned, PickedUp)
            | (PickedUp, Delivered)
            | (Pending, Cancelled)
            | (Assigned, Cancelled)
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub pickup: Stop,
    pub dropoff: Stop,
    pub package: Package,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `PUT /orders/{id}/status` and the bulk admin action.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub courier_id: Option<Uuid>,
}

impl StatusChange {
    /// Maps the requested status onto a transition. `None` means the status
    /// can never be a transition target.
    pub fn to_transition(&self, actor: &Actor) -> Result<Option<Transition>, AppError> {
        let transition = match self.status {
            OrderStatus::Pending => return Ok(None),
            OrderStatus::Assigned => {
                let courier_id = match (self.courier_id, actor.role) {
                    (Some(courier_id), _) => courier_id,
                    (None, Role::Courier) => actor.id,
                    (None, _) => {
                        return Err(AppError::Validation(
                            "courier_id is required to assign an order".to_string(),
                        ));
                    }
                };
                Transition::Assign { courier_id }
            }
            OrderStatus::PickedUp => Transition::PickUp,
            OrderStatus::Delivered => Transition::Deliver,
            OrderStatus::Cancelled => Transition::Cancel {
                reason: self.reason.clone().unwrap_or_default(),
            },
        };
        Ok(Some(transition))
    }
}

pub fn create_order(state: &AppState, actor: &Actor, request: NewOrder) -> Result<Order, AppError> {
    if actor.role != Role::Client {
        return Err(AppError::Unauthorized(
            "only clients can place orders".to_string(),
        ));
    }

    let client_status = state
        .clients
        .get(&actor.id)
        .map(|client| client.account_status)
        .ok_or_else(|| AppError::NotFound(format!("client {} not found", actor.id)))?;
    if client_status != AccountStatus::Active {
        return Err(AppError::Unauthorized(format!(
            "client {} account is not active",
            actor.id
        )));
    }

    validate_stop("pickup", &request.pickup)?;
    validate_stop("dropoff", &request.dropoff)?;
    validate_package(&request.package)?;

    let zone = pricing::resolve_zone(state, &request.pickup.location)?;
    let price = pricing::estimate(
        &request.pickup.location,
        &request.dropoff.location,
        zone.as_ref(),
        &state.config.pricing,
    )?;

    let order = Order {
        id: Uuid::new_v4(),
        client_id: actor.id,
        courier_id: None,
        zone_id: zone.map(|zone| zone.id),
        status: OrderStatus::Pending,
        pickup: request.pickup,
        dropoff: request.dropoff,
        package: request.package,
        notes: request.notes.filter(|notes| !notes.trim().is_empty()),
        price,
        payment_method: request.payment_method,
        payment_status: PaymentStatus::Pending,
        created_at: state.clock.now(),
        assigned_at: None,
        picked_up_at: None,
        delivered_at: None,
        cancelled_at: None,
        cancellation_reason: None,
        courier_rating: None,
        client_rating: None,
    };

    state.orders.insert(order.id, order.clone());
    state.metrics.orders_created_total.inc();
    state.metrics.pending_orders.inc();

    info!(
        order_id = %order.id,
        client_id = %order.client_id,
        total_price = order.price.total_price,
        "order created"
    );
    state.publish(OrderEvent::for_order(
        &order,
        None,
        OrderEventKind::Created,
        order.created_at,
    ));

    Ok(order)
}

fn validate_stop(label: &str, stop: &Stop) -> Result<(), AppError> {
    geo::validate(&stop.location)?;
    if stop.address.trim().is_empty() {
        return Err(AppError::Validation(format!("{label} address cannot be empty")));
    }
    Ok(())
}

fn validate_package(package: &Package) -> Result<(), AppError> {
    if package.description.trim().is_empty() {
        return Err(AppError::Validation(
            "package description cannot be empty".to_string(),
        ));
    }
    if let Some(weight) = package.weight_kg {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(AppError::Validation(
                "package weight must be > 0".to_string(),
            ));
        }
    }
    Ok(())
}

/// Admins see everything, parties see their own orders, and any courier may
/// look at an order that is open for dispatch.
pub fn get_order(state: &AppState, order_id: Uuid, actor: &Actor) -> Result<Order, AppError> {
    let order = state
        .orders
        .get(&order_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    let visible = actor.is_admin()
        || actor.is_client(order.client_id)
        || order.courier_id.is_some_and(|id| actor.is_courier(id))
        || (actor.role == Role::Courier && order.is_dispatchable());

    if !visible {
        return Err(AppError::Unauthorized(format!(
            "{} {} cannot view order {order_id}",
            actor.role, actor.id
        )));
    }
    Ok(order)
}

pub fn change_status(
    state: &AppState,
    order_id: Uuid,
    actor: &Actor,
    change: &StatusChange,
) -> Result<Order, AppError> {
    match change.to_transition(actor)? {
        Some(transition) => apply_transition(state, order_id, actor, transition),
        None => {
            let from = state
                .orders
                .get(&order_id)
                .map(|entry| entry.status)
                .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
            Err(AppError::IllegalTransition {
                from,
                to: change.status,
            })
        }
    }
}

pub fn cancel(
    state: &AppState,
    order_id: Uuid,
    actor: &Actor,
    reason: String,
) -> Result<Order, AppError> {
    apply_transition(state, order_id, actor, Transition::Cancel { reason })
}

struct Committed {
    order: Order,
    from: OrderStatus,
    courier_id: Option<Uuid>,
}

pub fn apply_transition(
    state: &AppState,
    order_id: Uuid,
    actor: &Actor,
    transition: Transition,
) -> Result<Order, AppError> {
    let start = Instant::now();
    let result = commit(state, order_id, actor, &transition);
    state
        .metrics
        .operation_latency_seconds
        .with_label_values(&[transition.label()])
        .observe(start.elapsed().as_secs_f64());

    let Committed {
        order,
        from,
        courier_id,
    } = result?;
    let to = order.status;

    state
        .metrics
        .order_transitions_total
        .with_label_values(&[to.as_str()])
        .inc();
    if from == OrderStatus::Pending {
        state.metrics.pending_orders.dec();
    }

    info!(
        order_id = %order.id,
        from = %from,
        to = %to,
        actor_id = %actor.id,
        actor_role = %actor.role,
        "order transitioned"
    );
    state.publish(OrderEvent::for_order(
        &order,
        courier_id,
        OrderEventKind::StatusChanged { from, to },
        order.last_transition_at(),
    ));

    Ok(order)
}

fn commit(
    state: &AppState,
    order_id: Uuid,
    actor: &Actor,
    transition: &Transition,
) -> Result<Committed, AppError> {
    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let current = entry.value().clone();
    let from = current.status;
    let to = transition.target();

    // Compare-and-swap on `status = pending AND courier_id IS NULL`.
    if matches!(transition, Transition::Assign { .. }) && current.courier_id.is_some() {
        return Err(AppError::OrderAlreadyAssigned(order_id));
    }
    if !is_allowed(from, to) {
        return Err(AppError::IllegalTransition { from, to });
    }
    authorize(&current, actor, transition)?;

    let now = state.clock.now().max(current.last_transition_at());
    let mut next = current.clone();

    let courier_guard: Option<RefMut<'_, Uuid, Courier>> = match transition {
        Transition::Assign { courier_id } => {
            if !current.payment_settled_for_dispatch() {
                return Err(AppError::PaymentPending(order_id));
            }

            let mut courier = state
                .couriers
                .get_mut(courier_id)
                .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;
            if !courier.can_take_orders() {
                return Err(AppError::CourierUnavailable(*courier_id));
            }

            courier.is_available = false;
            courier.current_order_id = Some(order_id);
            courier.updated_at = now;

            next.status = OrderStatus::Assigned;
            next.courier_id = Some(*courier_id);
            next.assigned_at = Some(now);
            Some(courier)
        }
        Transition::PickUp => {
            next.status = OrderStatus::PickedUp;
            next.picked_up_at = Some(now);
            None
        }
        Transition::Deliver => {
            let mut courier = assigned_courier(state, &current)?;

            release_courier(&mut courier, order_id, now);
            courier.wallet_balance =
                pricing::round_2(courier.wallet_balance + current.price.courier_earnings);
            courier.total_deliveries = courier.total_deliveries.saturating_add(1);

            next.status = OrderStatus::Delivered;
            next.delivered_at = Some(now);
            if current.payment_method == PaymentMethod::Cash {
                next.payment_status = PaymentStatus::Paid;
            }
            Some(courier)
        }
        Transition::Cancel { reason } => {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(AppError::Validation(
                    "a cancellation reason is required".to_string(),
                ));
            }

            let courier = match current.courier_id {
                Some(_) => {
                    let mut courier = assigned_courier(state, &current)?;
                    release_courier(&mut courier, order_id, now);
                    Some(courier)
                }
                None => None,
            };

            next.status = OrderStatus::Cancelled;
            next.courier_id = None;
            next.cancelled_at = Some(now);
            next.cancellation_reason = Some(reason.to_string());
            if current.payment_status == PaymentStatus::Paid {
                next.payment_status = PaymentStatus::Refunded;
            }
            courier
        }
    };

    let courier_id = current.courier_id.or(next.courier_id);
    *entry = next.clone();
    drop(courier_guard);

    Ok(Committed {
        order: next,
        from,
        courier_id,
    })
}

fn assigned_courier<'a>(
    state: &'a AppState,
    order: &Order,
) -> Result<RefMut<'a, Uuid, Courier>, AppError> {
    let courier_id = order.courier_id.ok_or_else(|| {
        AppError::Storage(format!("order {} is {} without a courier", order.id, order.status))
    })?;

    state.couriers.get_mut(&courier_id).ok_or_else(|| {
        AppError::Storage(format!(
            "courier {courier_id} referenced by order {} is missing",
            order.id
        ))
    })
}

/// Frees the courier from `order_id`; availability only comes back while the
/// account is active.
fn release_courier(courier: &mut Courier, order_id: Uuid, now: DateTime<Utc>) {
    if courier.current_order_id == Some(order_id) {
        courier.current_order_id = None;
    }
    courier.is_available = courier.is_active() && courier.current_order_id.is_none();
    courier.updated_at = now;
}

fn authorize(order: &Order, actor: &Actor, transition: &Transition) -> Result<(), AppError> {
    if actor.is_admin() {
        return Ok(());
    }

    let allowed = match transition {
        Transition::Assign { courier_id } => actor.is_courier(*courier_id),
        Transition::PickUp | Transition::Deliver => {
            order.courier_id.is_some_and(|id| actor.is_courier(id))
        }
        Transition::Cancel { .. } => actor.is_client(order.client_id),
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!(
            "{} {} may not {} order {}",
            actor.role,
            actor.id,
            transition.label(),
            order.id
        )))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub order_id: Uuid,
    pub status: Option<OrderStatus>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
    pub items: Vec<BatchItem>,
}

/// Applies one transition to each order independently and reports per item.
pub fn apply_batch(
    state: &AppState,
    order_ids: &[Uuid],
    actor: &Actor,
    transition: &Transition,
) -> BatchReport {
    let items: Vec<BatchItem> = order_ids
        .iter()
        .map(
            |&order_id| match apply_transition(state, order_id, actor, transition.clone()) {
                Ok(order) => BatchItem {
                    order_id,
                    status: Some(order.status),
                    error: None,
                },
                Err(err) => BatchItem {
                    order_id,
                    status: None,
                    error: Some(err.body()),
                },
            },
        )
        .collect();

    let processed = items.iter().filter(|item| item.error.is_none()).count();
    let failed = items.len() - processed;

    info!(
        action = transition.label(),
        processed, failed, "{processed} orders processed"
    );

    BatchReport {
        processed,
        failed,
        items,
    }
}
