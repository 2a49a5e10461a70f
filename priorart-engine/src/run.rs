//! Run pipeline
//!
//! Drives one detached search execution from variant fetch through
//! unified-result persistence, and derives the terminal run status
//! from the variant outcomes. The run record is written by exactly
//! this task; readers poll it.

use crate::normalize::{normalize_page, NormalizedItem};
use crate::{aggregate, detail, execute, Config};
use chrono::Utc;
use priorart_core::{
    Bundle, ContentType, EngineResult, PatentRecord, QueryVariantExecution, Run, RunStatus,
    ScholarRecord, VariantLabel,
};
use priorart_providers::SearchProvider;
use priorart_storage::{RunUpdate, StorageTrait};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Execute the pipeline for an already-admitted run and finish it in a
/// terminal state. Never leaves the run RUNNING: timeouts and internal
/// errors finish it FAILED, preserving whatever progress was persisted.
pub(crate) async fn execute_run(
    config: Config,
    storage: Arc<dyn StorageTrait>,
    provider: Arc<dyn SearchProvider>,
    run: Run,
    bundle: Bundle,
) {
    let run_id = run.run_id;
    // Shared with the pipeline so calls already made survive a failure
    // or timeout of the remainder.
    let api_calls = AtomicU32::new(0);
    let outcome = tokio::time::timeout(
        config.run_timeout(),
        pipeline(&config, storage.as_ref(), provider, &run, &bundle, &api_calls),
    )
    .await;

    let status = match outcome {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            error!(run_id = %run_id, error = %e, "run pipeline failed");
            RunStatus::Failed
        }
        Err(_) => {
            error!(run_id = %run_id, timeout_secs = config.run_timeout_secs, "run timed out");
            RunStatus::Failed
        }
    };
    let api_calls = api_calls.load(Ordering::Relaxed);

    let update = RunUpdate {
        status: Some(status),
        finished_at: Some(Utc::now()),
        api_calls_made: Some(api_calls),
        ..RunUpdate::default()
    };
    if let Err(e) = storage.run_update(run_id, update) {
        error!(run_id = %run_id, error = %e, "failed to finish run");
    } else {
        info!(run_id = %run_id, status = ?status, api_calls, "run finished");
    }
}

async fn pipeline(
    config: &Config,
    storage: &dyn StorageTrait,
    provider: Arc<dyn SearchProvider>,
    run: &Run,
    bundle: &Bundle,
    api_calls: &AtomicU32,
) -> EngineResult<RunStatus> {
    let fetches =
        execute::execute_variants(Arc::clone(&provider), bundle, run.include_scholar, config)
            .await;

    for fetch in &fetches {
        api_calls.fetch_add(fetch.api_calls, Ordering::Relaxed);
        storage.variant_execution_insert(&QueryVariantExecution {
            run_id: run.run_id,
            label: fetch.label,
            query: fetch.query.clone(),
            result_count: fetch.items.len() as u32,
            api_calls: fetch.api_calls,
            outcome: fetch.outcome,
            executed_at: fetch.executed_at,
        })?;
    }

    let succeeded = fetches.iter().filter(|f| f.succeeded()).count();
    if succeeded == 0 {
        // All variants failed: empty unified table, no aggregation.
        storage.unified_results_put(run.run_id, Vec::new())?;
        return Ok(RunStatus::Failed);
    }

    let per_variant: Vec<(VariantLabel, Vec<NormalizedItem>)> = fetches
        .iter()
        .filter(|f| f.succeeded())
        .map(|f| (f.label, normalize_page(&f.items)))
        .collect();

    cache_records(storage, &per_variant);

    let results = aggregate::aggregate(run.run_id, &per_variant, config);
    info!(
        run_id = %run.run_id,
        unified = results.len(),
        shortlisted = results.iter().filter(|r| r.shortlisted).count(),
        "unified result table written"
    );
    storage.unified_results_put(run.run_id, results.clone())?;

    if config.fetch_details {
        detail::fetch_details(provider, storage, run.run_id, &results, config, api_calls).await;
    }

    let status = if succeeded == fetches.len() {
        RunStatus::Completed
    } else {
        RunStatus::CompletedWithWarnings
    };

    Ok(status)
}

/// Refresh the cross-run record cache from this run's normalized items.
/// Cache failures are logged and tolerated; the unified table is the
/// source of truth for the run itself.
fn cache_records(storage: &dyn StorageTrait, per_variant: &[(VariantLabel, Vec<NormalizedItem>)]) {
    let now = Utc::now();

    for (_, items) in per_variant {
        for item in items {
            let result = match item.content_type {
                ContentType::Patent => storage.patent_record_upsert(PatentRecord {
                    identifier: item.identifier.clone(),
                    title: item.title.clone(),
                    abstract_text: item.snippet.clone(),
                    link: item.link.clone(),
                    detail: None,
                    raw_detail: None,
                    first_seen_at: now,
                    last_seen_at: now,
                }),
                ContentType::Scholar => storage.scholar_record_upsert(ScholarRecord {
                    identifier: item.identifier.clone(),
                    title: item.title.clone(),
                    abstract_text: item.snippet.clone(),
                    link: item.link.clone(),
                    authors: item.authors.clone(),
                    doi: item.doi.clone(),
                    first_seen_at: now,
                    last_seen_at: now,
                }),
            };
            if let Err(e) = result {
                warn!(identifier = %item.identifier, error = %e, "record cache upsert failed");
            }
        }
    }
}
