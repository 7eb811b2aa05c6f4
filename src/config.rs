use std::env;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other}, expected compact/json")),
        }
    }
}

/// Knobs for the pricing engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingConfig {
    /// Assumed average courier speed used for ETAs.
    pub average_speed_kmh: f64,
    /// Platform share of the total price, in [0, 1].
    pub commission_rate: f64,
    /// Rates applied when no active zone contains the pickup.
    pub default_base_price: f64,
    pub default_price_per_km: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            average_speed_kmh: 25.0,
            commission_rate: 0.15,
            default_base_price: 500.0,
            default_price_per_km: 200.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub pricing: PricingConfig,
    pub stats_cache_ttl_secs: u64,
    pub nearby_radius_km: f64,
    pub nearby_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_buffer_size: 1024,
            pricing: PricingConfig::default(),
            stats_cache_ttl_secs: 300,
            nearby_radius_km: 5.0,
            nearby_limit: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: parse_or_default("LOG_FORMAT", defaults.log_format)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            pricing: PricingConfig {
                average_speed_kmh: parse_or_default(
                    "AVERAGE_SPEED_KMH",
                    defaults.pricing.average_speed_kmh,
                )?,
                commission_rate: parse_or_default(
                    "COMMISSION_RATE",
                    defaults.pricing.commission_rate,
                )?,
                default_base_price: parse_or_default(
                    "DEFAULT_BASE_PRICE",
                    defaults.pricing.default_base_price,
                )?,
                default_price_per_km: parse_or_default(
                    "DEFAULT_PRICE_PER_KM",
                    defaults.pricing.default_price_per_km,
                )?,
            },
            stats_cache_ttl_secs: parse_or_default(
                "STATS_CACHE_TTL_SECS",
                defaults.stats_cache_ttl_secs,
            )?,
            nearby_radius_km: parse_or_default("NEARBY_RADIUS_KM", defaults.nearby_radius_km)?,
            nearby_limit: parse_or_default("NEARBY_LIMIT", defaults.nearby_limit)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let pricing = &self.pricing;
        if !(pricing.average_speed_kmh.is_finite() && pricing.average_speed_kmh > 0.0) {
            return Err(AppError::Internal(
                "invalid AVERAGE_SPEED_KMH: must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&pricing.commission_rate) {
            return Err(AppError::Internal(
                "invalid COMMISSION_RATE: must be within [0, 1]".to_string(),
            ));
        }
        if pricing.default_base_price < 0.0 || pricing.default_price_per_km < 0.0 {
            return Err(AppError::Internal(
                "invalid default pricing: rates must be >= 0".to_string(),
            ));
        }
        if self.event_buffer_size == 0 {
            return Err(AppError::Internal(
                "invalid EVENT_BUFFER_SIZE: must be > 0".to_string(),
            ));
        }
        if !(self.nearby_radius_km > 0.0) || self.nearby_limit == 0 {
            return Err(AppError::Internal(
                "invalid nearby defaults: radius and limit must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
