//! Query execution
//!
//! Issues the three variant calls against the search provider with
//! bounded parallelism and per-variant retry. A failed variant never
//! aborts the run; the caller decides the terminal run status from the
//! mix of outcomes.

use crate::Config;
use chrono::Utc;
use priorart_core::{Bundle, Timestamp, VariantLabel, VariantOutcome};
use priorart_providers::{RawSearchItem, SearchProvider, SearchRequest};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Outcome of executing one variant, successful or not.
#[derive(Debug, Clone)]
pub struct VariantFetch {
    pub label: VariantLabel,
    pub query: String,
    pub items: Vec<RawSearchItem>,
    pub outcome: VariantOutcome,
    pub api_calls: u32,
    pub executed_at: Timestamp,
}

impl VariantFetch {
    pub fn succeeded(&self) -> bool {
        self.outcome == VariantOutcome::Succeeded
    }
}

/// Execute every variant of the bundle. Returns one fetch per variant
/// in canonical label order.
pub async fn execute_variants(
    provider: Arc<dyn SearchProvider>,
    bundle: &Bundle,
    include_scholar: bool,
    config: &Config,
) -> Vec<VariantFetch> {
    let limiter = Arc::new(Semaphore::new(config.max_parallel_variants.clamp(1, 3)));
    let mut tasks = JoinSet::new();

    for variant in bundle.query_variants.clone() {
        let provider = Arc::clone(&provider);
        let limiter = Arc::clone(&limiter);
        let config = config.clone();

        tasks.spawn(async move {
            let _permit = match limiter.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(variant = %variant.label, "variant limiter closed before dispatch");
                    return VariantFetch {
                        label: variant.label,
                        query: variant.query,
                        items: Vec::new(),
                        outcome: VariantOutcome::Failed,
                        api_calls: 0,
                        executed_at: Utc::now(),
                    };
                }
            };
            execute_one(provider, variant.label, variant.query, variant.num_results, variant.page,
                include_scholar, &config)
                .await
        });
    }

    let mut fetches = Vec::with_capacity(3);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(fetch) => fetches.push(fetch),
            Err(e) => warn!(error = %e, "variant task panicked"),
        }
    }

    fetches.sort_by_key(|f| f.label);
    fetches
}

async fn execute_one(
    provider: Arc<dyn SearchProvider>,
    label: VariantLabel,
    query: String,
    num_results: u32,
    page: u32,
    include_scholar: bool,
    config: &Config,
) -> VariantFetch {
    let request = SearchRequest {
        query: query.clone(),
        num_results,
        page,
        scholar: include_scholar,
    };

    let mut api_calls = 0u32;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            tokio::time::sleep(config.retry_backoff()).await;
        }
        api_calls += 1;

        match provider.search(&request).await {
            Ok(result_page) => {
                info!(variant = %label, results = result_page.items.len(), api_calls, "variant succeeded");
                return VariantFetch {
                    label,
                    query,
                    items: result_page.items,
                    outcome: VariantOutcome::Succeeded,
                    api_calls,
                    executed_at: Utc::now(),
                };
            }
            Err(error) if error.transient() && attempt < config.max_retries => {
                warn!(variant = %label, attempt, error = %error, "transient provider error, retrying");
            }
            Err(error) => {
                warn!(variant = %label, api_calls, error = %error, "variant failed");
                break;
            }
        }
    }

    VariantFetch {
        label,
        query,
        items: Vec::new(),
        outcome: VariantOutcome::Failed,
        api_calls,
        executed_at: Utc::now(),
    }
}
