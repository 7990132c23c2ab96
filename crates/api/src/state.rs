use std::sync::Arc;
use std::time::Duration;

use empathy_core::rate_limit::{FixedWindowLimiter, RateLimitConfig};

use crate::ai::AiProvider;
use crate::audit::{AuditLogger, AuditSink};
use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: empathy_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub audit: AuditLogger,
    pub ai: Arc<dyn AiProvider>,
    /// Limiter for `/auth/*`.
    pub rate_limiter: Arc<FixedWindowLimiter>,
    /// Limiter for `/ai/*`.
    pub ai_rate_limiter: Arc<FixedWindowLimiter>,
}

impl AppState {
    /// Assemble state, sizing both limiters from `config.rate_limit`.
    pub fn new(
        pool: empathy_db::DbPool,
        config: ServerConfig,
        audit_sink: Arc<dyn AuditSink>,
        ai: Arc<dyn AiProvider>,
    ) -> Self {
        let window = Duration::from_secs(config.rate_limit.window_secs);
        let rate_limiter = Arc::new(FixedWindowLimiter::new(RateLimitConfig {
            max_requests: config.rate_limit.max_requests,
            window,
        }));
        let ai_rate_limiter = Arc::new(FixedWindowLimiter::new(RateLimitConfig {
            max_requests: config.rate_limit.ai_max_requests,
            window,
        }));

        Self {
            pool,
            config: Arc::new(config),
            audit: AuditLogger::new(audit_sink),
            ai,
            rate_limiter,
            ai_rate_limiter,
        }
    }
}
