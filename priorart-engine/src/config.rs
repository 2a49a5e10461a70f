//! Engine configuration
//!
//! Constructed at the composition root and injected into the engine;
//! nothing here is read from global state after startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retries per variant on transient provider errors.
    pub max_retries: u32,
    /// Sleep between retry attempts.
    pub retry_backoff_ms: u64,
    /// Upper bound on concurrent variant calls. The provider budget
    /// assumes at most the three variants in flight.
    pub max_parallel_variants: usize,
    /// Shortlist cap when multi-variant intersections exist.
    pub shortlist_max: usize,
    /// Shortlist cap for the top-scored fallback.
    pub fallback_shortlist_max: usize,
    /// Score multiplier per additional variant an item was found in.
    /// Must be > 1 so intersection count strictly raises the score.
    pub intersection_weight: f64,
    /// Enforced delay between successive detail-fetch calls.
    pub detail_fetch_delay_ms: u64,
    /// Whether to run the detail fetcher after aggregation.
    pub fetch_details: bool,
    /// Whole-run timeout; on expiry the run finishes Failed.
    pub run_timeout_secs: u64,
    /// Hard cap on query variant length.
    pub max_query_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff_ms: 500,
            max_parallel_variants: 3,
            shortlist_max: 25,
            fallback_shortlist_max: 15,
            intersection_weight: 3.0,
            detail_fetch_delay_ms: 2_000,
            fetch_details: true,
            run_timeout_secs: 300,
            max_query_chars: 300,
        }
    }
}

impl Config {
    /// Defaults overridden by `PRIORART_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        read_env("PRIORART_MAX_RETRIES", &mut config.max_retries);
        read_env("PRIORART_RETRY_BACKOFF_MS", &mut config.retry_backoff_ms);
        read_env("PRIORART_SHORTLIST_MAX", &mut config.shortlist_max);
        read_env("PRIORART_FALLBACK_SHORTLIST_MAX", &mut config.fallback_shortlist_max);
        read_env("PRIORART_DETAIL_FETCH_DELAY_MS", &mut config.detail_fetch_delay_ms);
        read_env("PRIORART_FETCH_DETAILS", &mut config.fetch_details);
        read_env("PRIORART_RUN_TIMEOUT_SECS", &mut config.run_timeout_secs);
        config
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn detail_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.detail_fetch_delay_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

fn read_env<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        if let Ok(value) = raw.parse() {
            *target = value;
        }
    }
}
