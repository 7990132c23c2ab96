//! Drops expired rate-limit windows so idle keys do not accumulate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use empathy_core::rate_limit::FixedWindowLimiter;
use tokio_util::sync::CancellationToken;

/// Sweep `limiters` once per `every` until `cancel` is triggered.
pub async fn run(
    limiters: Vec<Arc<FixedWindowLimiter>>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rate limiter sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let now = Instant::now();
                let removed: usize = limiters.iter().map(|l| l.sweep_at(now)).sum();
                if removed > 0 {
                    tracing::debug!(removed, "Rate limiter sweep: dropped expired windows");
                }
            }
        }
    }
}
