use std::{env, sync::Arc};

use async_trait::async_trait;
use service::{
    config::{Config, ConfigService},
    ServiceError,
};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

pub struct ConfigServiceImpl;

#[async_trait]
impl ConfigService for ConfigServiceImpl {
    async fn get_config(&self) -> Result<Config, ServiceError> {
        let default_timezone = env::var("DEFAULT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let default_currency = env::var("DEFAULT_CURRENCY").unwrap_or_else(|_| "INR".to_string());

        Ok(Config {
            default_timezone: Arc::from(default_timezone),
            default_currency: Arc::from(default_currency),
            pattern_cache_ttl_seconds: env_or("PATTERN_CACHE_TTL_SECONDS", 120),
            slot_page_cache_ttl_seconds: env_or("SLOT_PAGE_CACHE_TTL_SECONDS", 30),
            pattern_lock_ttl_seconds: env_or("PATTERN_LOCK_TTL_SECONDS", 30),
            stale_lock_age_seconds: env_or("STALE_LOCK_AGE_SECONDS", 25),
            horizon_default_days: env_or("HORIZON_DEFAULT_DAYS", 30),
            horizon_cap_days: env_or("HORIZON_CAP_DAYS", 90),
        })
    }
}
