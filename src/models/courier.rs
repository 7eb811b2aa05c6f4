use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Account standing shared by clients and couriers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    Bicycle,
    Motorcycle,
    Car,
    Van,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub kind: VehicleKind,
    #[serde(default)]
    pub plate_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub vehicle: Vehicle,
    pub account_status: AccountStatus,
    pub is_available: bool,
    pub location: Option<GeoPoint>,
    pub current_order_id: Option<Uuid>,
    pub rating: f64,
    pub total_ratings: u32,
    pub wallet_balance: f64,
    pub total_deliveries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Courier {
    pub fn is_active(&self) -> bool {
        self.account_status == AccountStatus::Active
    }

    /// True when the courier may be handed a new order right now.
    pub fn can_take_orders(&self) -> bool {
        self.is_active() && self.is_available && self.current_order_id.is_none()
    }
}
