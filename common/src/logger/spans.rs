use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{Span, field};

use super::TraceId;

/// Root span for one polling tick. `day` is filled in once the tick knows
/// which trading day it belongs to.
pub fn tick_span(trace_id: &TraceId, market: &str) -> Span {
    tracing::info_span!(
        "tick",
        trace_id = %trace_id.as_str(),
        market = %market,
        day = field::Empty
    )
}

pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
