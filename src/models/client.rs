use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::AccountStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub account_status: AccountStatus,
    pub rating: f64,
    pub total_ratings: u32,
    pub created_at: DateTime<Utc>,
}
