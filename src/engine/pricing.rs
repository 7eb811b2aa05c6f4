use uuid::Uuid;

use crate::config::PricingConfig;
use crate::error::AppError;
use crate::geo;
use crate::models::courier::GeoPoint;
use crate::models::order::Quote;
use crate::models::zone::Zone;
use crate::state::AppState;

pub const MIN_SURGE_MULTIPLIER: f64 = 1.0;
pub const MAX_SURGE_MULTIPLIER: f64 = 5.0;

/// Prices a trip. Pure: the same inputs always produce the same quote.
pub fn estimate(
    pickup: &GeoPoint,
    dropoff: &GeoPoint,
    zone: Option<&Zone>,
    config: &PricingConfig,
) -> Result<Quote, AppError> {
    let distance_km = round_2(geo::distance_km(pickup, dropoff)?);

    let (base_rate, per_km_rate) = match zone {
        Some(zone) => (zone.base_price, zone.price_per_km),
        None => (config.default_base_price, config.default_price_per_km),
    };
    let surge_multiplier = zone.map(surge_factor).unwrap_or(MIN_SURGE_MULTIPLIER);

    let base_price = round_2(base_rate * surge_multiplier);
    let distance_price = round_2(distance_km * per_km_rate * surge_multiplier);
    let total_price = round_2(base_price + distance_price);
    let commission = round_2(total_price * config.commission_rate);

    Ok(Quote {
        distance_km,
        base_price,
        distance_price,
        surge_multiplier,
        total_price,
        commission,
        courier_earnings: round_2(total_price - commission),
        eta_minutes: eta_minutes(distance_km, config.average_speed_kmh),
    })
}

pub fn surge_factor(zone: &Zone) -> f64 {
    if !zone.is_surge || !zone.surge_multiplier.is_finite() {
        return MIN_SURGE_MULTIPLIER;
    }
    zone.surge_multiplier
        .clamp(MIN_SURGE_MULTIPLIER, MAX_SURGE_MULTIPLIER)
}

pub fn eta_minutes(distance_km: f64, average_speed_kmh: f64) -> u32 {
    if distance_km <= 0.0 || average_speed_kmh <= 0.0 {
        return 0;
    }
    (distance_km / average_speed_kmh * 60.0).ceil() as u32
}

/// Oldest active zone containing the pickup, if any.
pub fn resolve_zone(state: &AppState, pickup: &GeoPoint) -> Result<Option<Zone>, AppError> {
    geo::validate(pickup)?;

    let mut matching: Vec<Zone> = state
        .zones
        .iter()
        .filter(|entry| entry.is_active)
        .filter(|entry| geo::point_in_zone(pickup, &entry.shape).unwrap_or(false))
        .map(|entry| entry.value().clone())
        .collect();

    matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(matching.into_iter().next())
}

/// Zone a quote is priced with. An explicit zone must be active and contain
/// the pickup, so the quote matches what `create_order` would charge.
pub fn quote_zone(
    state: &AppState,
    pickup: &GeoPoint,
    zone_id: Option<Uuid>,
) -> Result<Option<Zone>, AppError> {
    let Some(zone_id) = zone_id else {
        return resolve_zone(state, pickup);
    };

    geo::validate(pickup)?;
    let zone = state
        .zones
        .get(&zone_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("zone {zone_id} not found")))?;

    if !zone.is_active {
        return Err(AppError::Validation(format!("zone {zone_id} is not active")));
    }
    if !geo::point_in_zone(pickup, &zone.shape)? {
        return Err(AppError::Validation(format!(
            "pickup is outside zone {zone_id}"
        )));
    }
    Ok(Some(zone))
}

/// Money and distances are kept to two decimals.
pub fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
