use std::env;

use crate::error::DispatchError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub order_queue_size: usize,
    pub event_buffer_size: usize,
    pub default_max_batch_size: u8,
    pub default_max_batch_distance_km: f64,
    pub default_base_delivery_fee: f64,
    pub rider_fee_share: f64,
    pub rider_assignment_limit: u8,
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            order_queue_size: 1024,
            event_buffer_size: 1024,
            default_max_batch_size: 3,
            default_max_batch_distance_km: 2.0,
            default_base_delivery_fee: 5.0,
            rider_fee_share: 0.8,
            rider_assignment_limit: 1,
            retry_delay_ms: 250,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, DispatchError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            order_queue_size: parse_or_default("ORDER_QUEUE_SIZE", defaults.order_queue_size)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            default_max_batch_size: parse_or_default(
                "DEFAULT_MAX_BATCH_SIZE",
                defaults.default_max_batch_size,
            )?,
            default_max_batch_distance_km: parse_or_default(
                "DEFAULT_MAX_BATCH_DISTANCE_KM",
                defaults.default_max_batch_distance_km,
            )?,
            default_base_delivery_fee: parse_or_default(
                "DEFAULT_BASE_DELIVERY_FEE",
                defaults.default_base_delivery_fee,
            )?,
            rider_fee_share: parse_or_default("RIDER_FEE_SHARE", defaults.rider_fee_share)?,
            rider_assignment_limit: parse_or_default(
                "RIDER_ASSIGNMENT_LIMIT",
                defaults.rider_assignment_limit,
            )?,
            retry_delay_ms: parse_or_default("RETRY_DELAY_MS", defaults.retry_delay_ms)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, DispatchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| DispatchError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
