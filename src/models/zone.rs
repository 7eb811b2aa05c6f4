use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

/// Geometry of a pricing zone. Rectangles do not wrap the antimeridian.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZoneShape {
    Polygon { vertices: Vec<GeoPoint> },
    Rectangle { south_west: GeoPoint, north_east: GeoPoint },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: Uuid,
    pub name: String,
    pub shape: ZoneShape,
    pub base_price: f64,
    pub price_per_km: f64,
    pub is_surge: bool,
    pub surge_multiplier: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
