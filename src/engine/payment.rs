use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::event::{OrderEvent, OrderEventKind};
use crate::models::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::state::AppState;

/// Result reported by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Paid,
    Failed,
}

impl From<PaymentOutcome> for PaymentStatus {
    fn from(outcome: PaymentOutcome) -> Self {
        match outcome {
            PaymentOutcome::Paid => PaymentStatus::Paid,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        }
    }
}

/// Records the outcome of a non-cash payment. Only pending orders accept
/// updates, and a confirmed payment is final.
pub fn record_payment(
    state: &AppState,
    order_id: Uuid,
    actor: &Actor,
    outcome: PaymentOutcome,
) -> Result<Order, AppError> {
    actor.require_admin()?;

    let order = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if order.status != OrderStatus::Pending {
            return Err(AppError::Validation(format!(
                "payment can only change while the order is pending, order {order_id} is {}",
                order.status
            )));
        }
        if order.payment_method == PaymentMethod::Cash {
            return Err(AppError::Validation(format!(
                "order {order_id} is paid in cash on delivery"
            )));
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(AppError::Validation(format!(
                "payment for order {order_id} is already confirmed"
            )));
        }

        order.payment_status = outcome.into();
        order.clone()
    };

    info!(
        order_id = %order.id,
        payment_status = ?order.payment_status,
        "payment updated"
    );
    state.publish(OrderEvent::for_order(
        &order,
        None,
        OrderEventKind::PaymentUpdated {
            status: order.payment_status,
        },
        state.clock.now(),
    ));

    Ok(order)
}
