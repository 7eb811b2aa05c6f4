use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    PickedUp,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::PickedUp,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses in which the order must reference a courier.
    pub fn holds_courier(&self) -> bool {
        matches!(
            self,
            OrderStatus::Assigned | OrderStatus::PickedUp | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    MobileMoney,
    Card,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackageSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub description: String,
    pub size: PackageSize,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub fragile: bool,
}

/// A pickup or dropoff point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub location: GeoPoint,
    pub address: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

/// Price breakdown produced by the pricing engine. When surge applies, both
/// `base_price` and `distance_price` already include the multiplier, so
/// `total_price == base_price + distance_price` always holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub distance_km: f64,
    pub base_price: f64,
    pub distance_price: f64,
    pub surge_multiplier: f64,
    pub total_price: f64,
    pub commission: f64,
    pub courier_earnings: f64,
    pub eta_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub client_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub status: OrderStatus,
    pub pickup: Stop,
    pub dropoff: Stop,
    pub package: Package,
    pub notes: Option<String>,
    pub price: Quote,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub courier_rating: Option<u8>,
    pub client_rating: Option<u8>,
}

impl Order {
    /// Pending, unassigned and, unless paid in cash, with payment confirmed.
    pub fn is_dispatchable(&self) -> bool {
        self.status == OrderStatus::Pending
            && self.courier_id.is_none()
            && self.payment_settled_for_dispatch()
    }

    pub fn payment_settled_for_dispatch(&self) -> bool {
        self.payment_method == PaymentMethod::Cash || self.payment_status == PaymentStatus::Paid
    }

    /// Latest lifecycle stamp recorded so far.
    pub fn last_transition_at(&self) -> DateTime<Utc> {
        [
            self.assigned_at,
            self.picked_up_at,
            self.delivered_at,
            self.cancelled_at,
        ]
        .into_iter()
        .flatten()
        .fold(self.created_at, |latest, stamp| latest.max(stamp))
    }

    pub fn is_consistent(&self) -> bool {
        if self.courier_id.is_some() != self.status.holds_courier() {
            return false;
        }

        let mut previous = self.created_at;
        for stamp in [self.assigned_at, self.picked_up_at, self.delivered_at]
            .into_iter()
            .flatten()
        {
            if stamp < previous {
                return false;
            }
            previous = stamp;
        }

        match self.cancelled_at {
            Some(cancelled_at) => cancelled_at >= previous,
            None => true,
        }
    }
}
