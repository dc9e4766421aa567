use std::sync::Arc;
use boxoffice_core::BookingOrchestrator;
use boxoffice_store::app_config::RateLimitConfig;
use boxoffice_store::RedisClient;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BookingOrchestrator>,
    /// Rate limiting is skipped when unset
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
}

impl AppState {
    pub fn new(orchestrator: Arc<BookingOrchestrator>) -> Self {
        Self {
            orchestrator,
            redis: None,
            rate_limit: RateLimitConfig::default(),
        }
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, rate_limit: RateLimitConfig) -> Self {
        self.redis = Some(redis);
        self.rate_limit = rate_limit;
        self
    }
}
