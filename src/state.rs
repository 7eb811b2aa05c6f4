use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::engine::stats::StatsCache;
use crate::models::client::Client;
use crate::models::courier::Courier;
use crate::models::event::OrderEvent;
use crate::models::order::Order;
use crate::models::rating::Rating;
use crate::models::withdrawal::Withdrawal;
use crate::models::zone::Zone;
use crate::observability::metrics::Metrics;

/// Shared service state.
///
/// Writers that touch several maps lock in a fixed order: withdrawal, then
/// order, then courier or client. Nothing locks an order while holding a
/// courier or client entry.
pub struct AppState {
    pub clients: DashMap<Uuid, Client>,
    pub couriers: DashMap<Uuid, Courier>,
    pub orders: DashMap<Uuid, Order>,
    pub zones: DashMap<Uuid, Zone>,
    pub ratings: DashMap<Uuid, Rating>,
    pub withdrawals: DashMap<Uuid, Withdrawal>,
    pub events_tx: broadcast::Sender<OrderEvent>,
    pub clock: Arc<dyn Clock>,
    pub config: Config,
    pub stats_cache: StatsCache,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);
        let stats_cache = StatsCache::new(config.stats_cache_ttl_secs);

        Self {
            clients: DashMap::new(),
            couriers: DashMap::new(),
            orders: DashMap::new(),
            zones: DashMap::new(),
            ratings: DashMap::new(),
            withdrawals: DashMap::new(),
            events_tx,
            clock,
            config,
            stats_cache,
            metrics: Metrics::new(),
        }
    }

    /// Fire-and-forget: a missing subscriber never fails the caller.
    pub fn publish(&self, event: OrderEvent) {
        let _ = self.events_tx.send(event);
    }
}
