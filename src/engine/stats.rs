use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::engine::pricing::round_2;
use crate::models::order::OrderStatus;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardStats {
    pub total_orders: usize,
    pub orders_by_status: BTreeMap<String, usize>,
    pub clients_total: usize,
    pub couriers_total: usize,
    pub couriers_available: usize,
    pub delivered_revenue: f64,
    pub commission_collected: f64,
    pub average_courier_rating: f64,
    pub generated_at: DateTime<Utc>,
}

const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

/// Dashboard reads tolerate staleness up to the configured TTL.
pub struct StatsCache {
    ttl: Duration,
    slot: RwLock<Option<DashboardStats>>,
}

impl StatsCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
            slot: RwLock::new(None),
        }
    }

    fn is_fresh(&self, stats: &DashboardStats, now: DateTime<Utc>) -> bool {
        now >= stats.generated_at && now - stats.generated_at < self.ttl
    }
}

pub async fn dashboard_stats(state: &AppState) -> DashboardStats {
    let now = state.clock.now();

    if let Some(stats) = state.stats_cache.slot.read().await.as_ref() {
        if state.stats_cache.is_fresh(stats, now) {
            return stats.clone();
        }
    }

    let mut slot = state.stats_cache.slot.write().await;
    if let Some(stats) = slot.as_ref() {
        if state.stats_cache.is_fresh(stats, now) {
            return stats.clone();
        }
    }

    let stats = compute(state, now);
    *slot = Some(stats.clone());
    stats
}

pub fn compute(state: &AppState, now: DateTime<Utc>) -> DashboardStats {
    let mut orders_by_status: BTreeMap<String, usize> = OrderStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    let mut total_orders = 0;
    let mut delivered_revenue = 0.0;
    let mut commission_collected = 0.0;

    for order in state.orders.iter() {
        total_orders += 1;
        *orders_by_status
            .entry(order.status.as_str().to_string())
            .or_insert(0) += 1;
        if order.status == OrderStatus::Delivered {
            delivered_revenue += order.price.total_price;
            commission_collected += order.price.commission;
        }
    }

    let mut couriers_total = 0;
    let mut couriers_available = 0;
    let mut rating_sum = 0.0;
    let mut rated_couriers = 0;

    for courier in state.couriers.iter() {
        couriers_total += 1;
        if courier.can_take_orders() {
            couriers_available += 1;
        }
        if courier.total_ratings > 0 {
            rating_sum += courier.rating;
            rated_couriers += 1;
        }
    }

    let average_courier_rating = if rated_couriers == 0 {
        0.0
    } else {
        round_2(rating_sum / f64::from(rated_couriers))
    };

    DashboardStats {
        total_orders,
        orders_by_status,
        clients_total: state.clients.len(),
        couriers_total,
        couriers_available,
        delivered_revenue: round_2(delivered_revenue),
        commission_collected: round_2(commission_collected),
        average_courier_rating,
        generated_at: now,
    }
}
