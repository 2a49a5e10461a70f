//! Detail fetching
//!
//! Retrieves full-text detail (claims, citations, classifications) for
//! shortlisted items that intersected in at least two variants.
//! Scholarly items are complete from the search pass and are never
//! re-fetched. The provider behind this stage imposes a stricter
//! per-caller budget, so calls are strictly sequential with an
//! enforced delay.

use crate::Config;
use once_cell::sync::Lazy;
use priorart_core::{ContentType, FetchOutcome, PatentDetail, RunId, UnifiedResult};
use priorart_providers::SearchProvider;
use priorart_storage::StorageTrait;
use regex::Regex;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const DETAIL_FIELDS: [&str; 3] = ["claims", "citations", "classifications"];

static CANONICAL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]{2})(\d+)([A-Z]\d?)?$").expect("static regex"));

/// Fetch and persist detail for eligible shortlisted items, adding
/// every external call to `api_calls` as it is made. Per-item failures
/// are recorded and do not abort the remaining items. Shortlisted items
/// outside the fetcher's scope (scholarly, or single-variant fallback
/// entries) are marked SKIPPED.
pub async fn fetch_details(
    provider: Arc<dyn SearchProvider>,
    storage: &dyn StorageTrait,
    run_id: RunId,
    results: &[UnifiedResult],
    config: &Config,
    api_calls: &AtomicU32,
) {
    let mut calls_made = 0u32;
    let mut first_call = true;

    for result in results {
        if !result.shortlisted {
            continue;
        }
        if result.content_type != ContentType::Patent || !result.intersection.is_multi() {
            record_outcome(storage, run_id, &result.identifier, FetchOutcome::Skipped);
            continue;
        }

        let mut fetched = false;

        for candidate_id in identifier_format_variants(&result.identifier) {
            if !first_call {
                tokio::time::sleep(config.detail_fetch_delay()).await;
            }
            first_call = false;
            api_calls.fetch_add(1, Ordering::Relaxed);
            calls_made += 1;

            match provider.get_details(&candidate_id, &DETAIL_FIELDS).await {
                Ok(raw) => {
                    if let Some(detail) = parse_detail_payload(&raw) {
                        persist(storage, run_id, &result.identifier, detail, raw);
                        fetched = true;
                        break;
                    }
                    warn!(
                        identifier = %result.identifier,
                        attempted = %candidate_id,
                        "detail payload failed shape validation"
                    );
                }
                Err(error) => {
                    warn!(
                        identifier = %result.identifier,
                        attempted = %candidate_id,
                        error = %error,
                        "detail fetch attempt failed"
                    );
                }
            }
        }

        if !fetched {
            record_outcome(storage, run_id, &result.identifier, FetchOutcome::Failed);
        }
    }

    info!(run_id = %run_id, api_calls = calls_made, "detail fetch pass finished");
}

/// Identifier formats tried in sequence: canonical, hyphenated, and the
/// provider's path form. The first payload that validates wins.
pub fn identifier_format_variants(canonical: &str) -> Vec<String> {
    let mut variants = vec![canonical.to_string()];

    if let Some(captures) = CANONICAL_ID.captures(canonical) {
        let country = &captures[1];
        let number = &captures[2];
        match captures.get(3) {
            Some(kind) => variants.push(format!("{country}-{number}-{}", kind.as_str())),
            None => variants.push(format!("{country}-{number}")),
        }
    }

    variants.push(format!("patent/{canonical}/en"));
    variants
}

/// Validate the expected detail shape and project it. A payload without
/// a claims array is rejected.
pub fn parse_detail_payload(raw: &Value) -> Option<PatentDetail> {
    let claims = raw.get("claims")?.as_array()?;

    let claims: Vec<String> = claims
        .iter()
        .filter_map(|c| {
            c.as_str().map(str::to_string).or_else(|| c.get("text")?.as_str().map(str::to_string))
        })
        .collect();

    if claims.is_empty() {
        return None;
    }

    let citations = string_list(raw.get("citations"), "publication_number");
    let classifications = string_list(raw.get("classifications"), "code");

    Some(PatentDetail { claims, citations, classifications })
}

fn string_list(value: Option<&Value>, object_key: &str) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|entry| {
                    entry
                        .as_str()
                        .map(str::to_string)
                        .or_else(|| entry.get(object_key)?.as_str().map(str::to_string))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn persist(
    storage: &dyn StorageTrait,
    run_id: RunId,
    identifier: &str,
    detail: PatentDetail,
    raw: Value,
) {
    if let Err(error) = storage.patent_record_set_detail(identifier, detail, raw) {
        warn!(identifier, error = %error, "failed to persist patent detail");
        record_outcome(storage, run_id, identifier, FetchOutcome::Failed);
        return;
    }
    record_outcome(storage, run_id, identifier, FetchOutcome::Fetched);
}

fn record_outcome(
    storage: &dyn StorageTrait,
    run_id: RunId,
    identifier: &str,
    outcome: FetchOutcome,
) {
    if let Err(error) = storage.unified_result_set_fetch_outcome(run_id, identifier, outcome) {
        warn!(identifier, error = %error, "failed to record fetch outcome");
    }
}
