//! Rank aggregation and intersection classification
//!
//! Merges the per-variant result sets into one unified, deduplicated
//! table. Each identifier gets its rank per variant, the set of
//! variants it appeared in, an intersection classification (I1..I3)
//! and an aggregate score. Items found in more variants always outscore
//! single-variant items at equivalent rank.

use crate::normalize::NormalizedItem;
use crate::Config;
use priorart_core::{Intersection, RunId, UnifiedResult, VariantLabel, VariantRanks};
use std::collections::BTreeMap;

/// Merge per-variant normalized pages into the unified result table.
///
/// The returned rows are sorted by score descending, then best rank
/// ascending, then identifier, so the ordering is deterministic for
/// identical inputs. Shortlisting is applied before returning.
pub fn aggregate(
    run_id: RunId,
    per_variant: &[(VariantLabel, Vec<NormalizedItem>)],
    config: &Config,
) -> Vec<UnifiedResult> {
    // BTreeMap keyed by identifier keeps accumulation order stable.
    let mut merged: BTreeMap<String, UnifiedResult> = BTreeMap::new();

    for (label, items) in per_variant {
        for item in items {
            let entry = merged.entry(item.identifier.clone()).or_insert_with(|| UnifiedResult {
                run_id,
                identifier: item.identifier.clone(),
                content_type: item.content_type,
                title: item.title.clone(),
                snippet: item.snippet.clone(),
                link: item.link.clone(),
                ranks: VariantRanks::new(),
                found_in: Vec::new(),
                intersection: Intersection::I1,
                score: 0.0,
                shortlisted: false,
                fetch_outcome: None,
            });

            // First sighting per variant wins; pages were already
            // deduplicated within a variant.
            if entry.ranks.get(*label).is_none() {
                entry.ranks.set(*label, item.rank);
            }
            if entry.snippet.is_none() {
                entry.snippet = item.snippet.clone();
            }
        }
    }

    let mut results: Vec<UnifiedResult> = merged.into_values().collect();

    for result in &mut results {
        result.found_in = result.ranks.present();
        result.intersection = Intersection::from_count(result.found_in.len())
            .unwrap_or(Intersection::I1);
        result.score = score(&result.ranks, config);
    }

    sort_deterministic(&mut results);
    shortlist(&mut results, config);

    results
}

/// Aggregate score: a monotonically decreasing function of the best
/// rank, weighted upward by intersection count. With weight w > 1 an
/// item in n variants scores w^(n-1)/best_rank, so intersection count
/// strictly raises the score at equal rank.
fn score(ranks: &VariantRanks, config: &Config) -> f64 {
    let Some(best) = ranks.best() else {
        return 0.0;
    };
    let weight = config.intersection_weight.powi(ranks.count() as i32 - 1);
    weight / best as f64
}

/// Order: score desc, best rank asc, identifier asc.
fn sort_deterministic(results: &mut [UnifiedResult]) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                let ra = a.ranks.best().unwrap_or(u32::MAX);
                let rb = b.ranks.best().unwrap_or(u32::MAX);
                ra.cmp(&rb)
            })
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
}

/// Shortlist selection: all multi-variant items first (capped), falling
/// back to the highest-scored items overall only when no intersections
/// exist. Assumes `results` is already in deterministic order.
fn shortlist(results: &mut [UnifiedResult], config: &Config) {
    let has_intersections = results.iter().any(|r| r.intersection.is_multi());

    if has_intersections {
        let mut taken = 0;
        for result in results.iter_mut() {
            if result.intersection.is_multi() && taken < config.shortlist_max {
                result.shortlisted = true;
                taken += 1;
            }
        }
    } else {
        for result in results.iter_mut().take(config.fallback_shortlist_max) {
            result.shortlisted = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priorart_core::ContentType;

    fn item(identifier: &str, rank: u32) -> NormalizedItem {
        NormalizedItem {
            identifier: identifier.to_string(),
            content_type: ContentType::Patent,
            title: format!("{identifier} title"),
            snippet: None,
            link: None,
            authors: vec![],
            doi: None,
            rank,
        }
    }

    fn run_id() -> RunId {
        priorart_core::new_entity_id()
    }

    #[test]
    fn spec_scenario_broad_and_narrow_intersection() {
        // One identifier appears in broad (rank 3) and narrow (rank 1)
        // but not baseline.
        let per_variant = vec![
            (VariantLabel::Broad, vec![item("A", 1), item("B", 2), item("X", 3)]),
            (VariantLabel::Baseline, vec![item("C", 1)]),
            (VariantLabel::Narrow, vec![item("X", 1), item("D", 2)]),
        ];
        let results = aggregate(run_id(), &per_variant, &Config::default());

        let x = results.iter().find(|r| r.identifier == "X").expect("X present");
        assert_eq!(x.intersection, Intersection::I2);
        assert_eq!(x.found_in, vec![VariantLabel::Broad, VariantLabel::Narrow]);
        assert_eq!(x.ranks.get(VariantLabel::Baseline), None);
        assert_eq!(x.ranks.get(VariantLabel::Broad), Some(3));
        assert_eq!(x.ranks.get(VariantLabel::Narrow), Some(1));
    }

    #[test]
    fn intersection_outscores_single_variant_at_equal_rank() {
        let per_variant = vec![
            (VariantLabel::Broad, vec![item("BOTH", 5), item("SOLO", 5)]),
            (VariantLabel::Baseline, vec![item("BOTH", 5)]),
            (VariantLabel::Narrow, vec![]),
        ];
        let results = aggregate(run_id(), &per_variant, &Config::default());

        let both = results.iter().find(|r| r.identifier == "BOTH").expect("BOTH");
        let solo = results.iter().find(|r| r.identifier == "SOLO").expect("SOLO");
        assert!(both.score > solo.score);
    }

    #[test]
    fn identifier_unique_within_run() {
        let per_variant = vec![
            (VariantLabel::Broad, vec![item("A", 1)]),
            (VariantLabel::Baseline, vec![item("A", 4)]),
            (VariantLabel::Narrow, vec![item("A", 2)]),
        ];
        let results = aggregate(run_id(), &per_variant, &Config::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].intersection, Intersection::I3);
    }

    #[test]
    fn shortlist_prefers_multi_variant_items() {
        let per_variant = vec![
            (VariantLabel::Broad, vec![item("MULTI", 10), item("TOP", 1)]),
            (VariantLabel::Baseline, vec![item("MULTI", 9)]),
            (VariantLabel::Narrow, vec![]),
        ];
        let results = aggregate(run_id(), &per_variant, &Config::default());

        let multi = results.iter().find(|r| r.identifier == "MULTI").expect("MULTI");
        let top = results.iter().find(|r| r.identifier == "TOP").expect("TOP");
        assert!(multi.shortlisted);
        assert!(!top.shortlisted, "single-variant items are excluded when intersections exist");
    }

    #[test]
    fn fallback_shortlist_when_no_intersections() {
        let items: Vec<NormalizedItem> =
            (1..=20).map(|i| item(&format!("P{i:02}"), i)).collect();
        let per_variant = vec![
            (VariantLabel::Broad, items),
            (VariantLabel::Baseline, vec![]),
            (VariantLabel::Narrow, vec![]),
        ];
        let config = Config::default();
        let results = aggregate(run_id(), &per_variant, &config);

        let shortlisted: Vec<&str> = results
            .iter()
            .filter(|r| r.shortlisted)
            .map(|r| r.identifier.as_str())
            .collect();
        assert_eq!(shortlisted.len(), config.fallback_shortlist_max);
        // Highest scored = lowest rank first.
        assert_eq!(shortlisted[0], "P01");
    }

    #[test]
    fn ties_break_by_rank_then_identifier() {
        let per_variant = vec![
            (VariantLabel::Broad, vec![item("B", 1), item("A", 2)]),
            (VariantLabel::Baseline, vec![item("A", 1)]),
            (VariantLabel::Narrow, vec![]),
        ];
        let mut config = Config::default();
        config.intersection_weight = 2.0;
        // A: in 2 variants, best rank 1 -> 2.0; B: 1 variant, rank 1 -> 1.0
        let results = aggregate(run_id(), &per_variant, &config);
        assert_eq!(results[0].identifier, "A");
        assert_eq!(results[1].identifier, "B");
    }
}
