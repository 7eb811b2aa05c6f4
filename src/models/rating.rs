use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who left the rating. A client rates the courier and vice versa.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RaterRole {
    Client,
    Courier,
}

impl RaterRole {
    pub fn rated_label(&self) -> &'static str {
        match self {
            RaterRole::Client => "courier",
            RaterRole::Courier => "client",
        }
    }
}

impl fmt::Display for RaterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaterRole::Client => f.write_str("client"),
            RaterRole::Courier => f.write_str("courier"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub id: Uuid,
    pub order_id: Uuid,
    pub rater_id: Uuid,
    pub rated_id: Uuid,
    pub rater_role: RaterRole,
    pub score: u8,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}
