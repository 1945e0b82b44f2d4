use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;

use crate::ServiceError;

/// Runtime-tunable policy constants (§4.3 TTL policy, §4.4 lock/horizon
/// policy). Defaults mirror the spec's own recommended values; every field
/// is independently overridable by environment variable so operators can
/// tighten or loosen the policy without a code change.
#[derive(Debug, Clone)]
pub struct Config {
    pub default_timezone: Arc<str>,
    pub default_currency: Arc<str>,
    pub pattern_cache_ttl_seconds: u64,
    pub slot_page_cache_ttl_seconds: u64,
    pub pattern_lock_ttl_seconds: u64,
    pub stale_lock_age_seconds: u64,
    pub horizon_default_days: i64,
    pub horizon_cap_days: i64,
}

#[automock]
#[async_trait]
pub trait ConfigService {
    async fn get_config(&self) -> Result<Config, ServiceError>;
}
