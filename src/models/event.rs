use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus, PaymentStatus};
use crate::models::rating::RaterRole;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    StatusChanged { from: OrderStatus, to: OrderStatus },
    PaymentUpdated { status: PaymentStatus },
    Rated { rater_role: RaterRole, score: u8 },
}

/// Published on every order mutation for the payment and notification
/// collaborators. Delivery is best effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub client_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub kind: OrderEventKind,
    pub at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn for_order(
        order: &Order,
        courier_id: Option<Uuid>,
        kind: OrderEventKind,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order.id,
            client_id: order.client_id,
            courier_id,
            kind,
            at,
        }
    }
}
