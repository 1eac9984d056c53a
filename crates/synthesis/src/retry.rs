//! Warm-up retry policy.
//!
//! A cold inference endpoint answers `503` with a JSON body such as
//! `{"error": "Model is currently loading", "estimated_time": 20.0}`. The
//! client sleeps for the estimate (bounded by [`WarmupPolicy::max_wait`])
//! and resubmits.

use std::time::Duration;

/// Tunable parameters for warm-up retries.
#[derive(Debug, Clone)]
pub struct WarmupPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Upper bound on a single wait.
    pub max_wait: Duration,
    /// Wait used when the service gives no usable estimate.
    pub default_wait: Duration,
}

impl Default for WarmupPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_wait: Duration::from_secs(60),
            default_wait: Duration::from_secs(1),
        }
    }
}

/// How long to wait before resubmitting after a warm-up response.
pub fn warmup_delay(estimated_secs: Option<f64>, policy: &WarmupPolicy) -> Duration {
    match estimated_secs {
        Some(secs) if secs.is_finite() && secs > 0.0 => {
            Duration::try_from_secs_f64(secs).map_or(policy.max_wait, |d| d.min(policy.max_wait))
        }
        _ => policy.default_wait.min(policy.max_wait),
    }
}

/// Extract `estimated_time` from a warm-up response body.
pub fn parse_estimated_time(body: &str) -> Option<f64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("estimated_time")?
        .as_f64()
}
