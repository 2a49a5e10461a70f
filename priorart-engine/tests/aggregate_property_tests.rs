//! Property tests over rank aggregation: intersection bookkeeping,
//! ordering determinism and shortlist bounds hold for arbitrary
//! per-variant result sets.

use priorart_core::VariantLabel;
use priorart_engine::aggregate::aggregate;
use priorart_engine::normalize::NormalizedItem;
use priorart_engine::Config;
use proptest::prelude::*;

fn item(index: usize, rank: u32) -> NormalizedItem {
    NormalizedItem {
        identifier: format!("P{index:02}"),
        content_type: priorart_core::ContentType::Patent,
        title: format!("Patent {index}"),
        snippet: None,
        link: None,
        authors: vec![],
        doi: None,
        rank,
    }
}

/// Three variants, each an arbitrary sequence of identifier indexes.
/// Duplicates within a variant are dropped keeping the first rank,
/// mirroring what normalization guarantees.
fn variants_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0usize..30, 0..40), 3)
}

fn build_per_variant(raw: &[Vec<usize>]) -> Vec<(VariantLabel, Vec<NormalizedItem>)> {
    VariantLabel::ALL
        .into_iter()
        .zip(raw)
        .map(|(label, indexes)| {
            let mut seen = std::collections::HashSet::new();
            let items = indexes
                .iter()
                .filter(|i| seen.insert(**i))
                .enumerate()
                .map(|(pos, i)| item(*i, pos as u32 + 1))
                .collect();
            (label, items)
        })
        .collect()
}

proptest! {
    #[test]
    fn intersection_matches_variant_presence(raw in variants_strategy()) {
        let per_variant = build_per_variant(&raw);
        let results = aggregate(priorart_core::new_entity_id(), &per_variant, &Config::default());

        for row in &results {
            let appearances = per_variant
                .iter()
                .filter(|(_, items)| items.iter().any(|i| i.identifier == row.identifier))
                .count();
            prop_assert_eq!(row.intersection.count(), appearances);
            prop_assert_eq!(row.found_in.len(), appearances);
            prop_assert!(appearances >= 1 && appearances <= 3);
            prop_assert!(row.score > 0.0);
        }
    }

    #[test]
    fn ordering_is_deterministic_and_monotone(raw in variants_strategy()) {
        let run_id = priorart_core::new_entity_id();
        let per_variant = build_per_variant(&raw);
        let config = Config::default();

        let first = aggregate(run_id, &per_variant, &config);
        let second = aggregate(run_id, &per_variant, &config);
        prop_assert_eq!(&first, &second);

        for pair in first.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let rank_a = a.ranks.best().unwrap_or(u32::MAX);
            let rank_b = b.ranks.best().unwrap_or(u32::MAX);
            prop_assert!(
                a.score > b.score
                    || (a.score == b.score && rank_a < rank_b)
                    || (a.score == b.score && rank_a == rank_b && a.identifier < b.identifier)
            );
        }
    }

    #[test]
    fn shortlist_respects_caps_and_preference(raw in variants_strategy()) {
        let per_variant = build_per_variant(&raw);
        let config = Config::default();
        let results = aggregate(priorart_core::new_entity_id(), &per_variant, &config);

        let multi = results.iter().filter(|r| r.intersection.is_multi()).count();
        let shortlisted: Vec<_> = results.iter().filter(|r| r.shortlisted).collect();

        if multi > 0 {
            prop_assert_eq!(shortlisted.len(), multi.min(config.shortlist_max));
            prop_assert!(shortlisted.iter().all(|r| r.intersection.is_multi()));
        } else {
            prop_assert_eq!(shortlisted.len(), results.len().min(config.fallback_shortlist_max));
        }
    }
}
