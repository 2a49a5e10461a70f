//! Novelty assessment orchestration
//!
//! Two-stage LLM-backed comparison of the invention summary against
//! the shortlisted candidate set. Stage 1 sees every candidate; stage 2
//! runs only on a DOUBT outcome and only over the candidates stage 1
//! marked ambiguous.

use chrono::Utc;
use priorart_core::{
    AssessmentCandidate, AssessmentStatus, Determination, EngineResult, NoveltyAssessmentRun,
    PersistenceError, SourceSummary, StageOutcome, UnifiedResult,
};
use priorart_providers::LlmGateway;
use priorart_storage::{AssessmentUpdate, StorageTrait};
use std::sync::Arc;
use tracing::info;

/// Build the candidate set from the unified result table. Shortlisting
/// has already applied the intersecting-first preference and the size
/// caps; row order is the deterministic aggregate order.
pub fn select_candidates(results: &[UnifiedResult]) -> Vec<AssessmentCandidate> {
    results
        .iter()
        .filter(|r| r.shortlisted)
        .map(|r| AssessmentCandidate {
            identifier: r.identifier.clone(),
            title: r.title.clone(),
            abstract_text: r.snippet.clone(),
            relevance: r.score,
            found_in: r.found_in.clone(),
            intersection: r.intersection,
        })
        .collect()
}

/// Run the two-stage protocol over an InProgress assessment and persist
/// each stage as it lands. Returns the assessment in its final state.
pub async fn run_assessment(
    gateway: Arc<dyn LlmGateway>,
    storage: &dyn StorageTrait,
    summary: &SourceSummary,
    assessment: &NoveltyAssessmentRun,
    candidates: &[AssessmentCandidate],
) -> EngineResult<NoveltyAssessmentRun> {
    let stage1 = gateway.assess(summary, candidates).await?;
    info!(
        assessment_id = %assessment.assessment_id,
        determination = ?stage1.determination,
        "stage 1 determination received"
    );

    let mut update = AssessmentUpdate {
        stage1: Some(stage1.clone()),
        novel_aspects: Some(stage1.novel_aspects.clone()),
        non_novel_aspects: Some(stage1.non_novel_aspects.clone()),
        confidence: Some(stage1.confidence),
        final_remarks: stage1.remarks.clone(),
        ..AssessmentUpdate::default()
    };

    match stage1.determination {
        Determination::Novel => {
            update.status = Some(AssessmentStatus::Novel);
            update.final_determination = Some(Determination::Novel);
            update.finished_at = Some(Utc::now());
        }
        Determination::NotNovel => {
            update.status = Some(AssessmentStatus::NotNovel);
            update.final_determination = Some(Determination::NotNovel);
            update.finished_at = Some(Utc::now());
        }
        Determination::Doubt => {
            // Persist the doubt before attempting resolution so a
            // stage-2 failure leaves the stage-1 outcome visible.
            update.status = Some(AssessmentStatus::Doubt);
            storage.assessment_update(assessment.assessment_id, update)?;

            let ambiguous = ambiguous_subset(&stage1, candidates);
            let stage2 = gateway.resolve(summary, &ambiguous).await?;
            info!(
                assessment_id = %assessment.assessment_id,
                determination = ?stage2.determination,
                scoped_to = ambiguous.len(),
                "stage 2 determination received"
            );

            update = resolve_update(&stage1, &stage2);
        }
    }

    storage.assessment_update(assessment.assessment_id, update)?;
    storage.assessment_get(assessment.assessment_id)?.ok_or_else(|| {
        PersistenceError::NotFound {
            entity: "NoveltyAssessmentRun",
            id: assessment.assessment_id.to_string(),
        }
        .into()
    })
}

/// Candidates stage 1 marked ambiguous. Falls back to the full set when
/// stage 1 declared doubt without singling anyone out.
fn ambiguous_subset(
    stage1: &StageOutcome,
    candidates: &[AssessmentCandidate],
) -> Vec<AssessmentCandidate> {
    let flagged: Vec<&str> = stage1
        .candidate_reasoning
        .iter()
        .filter(|r| r.ambiguous)
        .map(|r| r.identifier.as_str())
        .collect();

    if flagged.is_empty() {
        return candidates.to_vec();
    }

    candidates.iter().filter(|c| flagged.contains(&c.identifier.as_str())).cloned().collect()
}

fn resolve_update(stage1: &StageOutcome, stage2: &StageOutcome) -> AssessmentUpdate {
    let mut update = AssessmentUpdate {
        stage2: Some(stage2.clone()),
        novel_aspects: Some(merge_aspects(&stage1.novel_aspects, &stage2.novel_aspects)),
        non_novel_aspects: Some(merge_aspects(
            &stage1.non_novel_aspects,
            &stage2.non_novel_aspects,
        )),
        confidence: Some(stage2.confidence),
        final_remarks: stage2.remarks.clone().or_else(|| stage1.remarks.clone()),
        finished_at: Some(Utc::now()),
        ..AssessmentUpdate::default()
    };

    match stage2.determination {
        Determination::Novel | Determination::NotNovel => {
            update.status = Some(AssessmentStatus::DoubtResolved);
            update.final_determination = Some(stage2.determination);
        }
        Determination::Doubt => {
            // Unresolved; the doubt stands and the report stays gated.
            update.status = Some(AssessmentStatus::Doubt);
        }
    }

    update
}

fn merge_aspects(first: &[String], second: &[String]) -> Vec<String> {
    let mut merged = first.to_vec();
    for aspect in second {
        if !merged.contains(aspect) {
            merged.push(aspect.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use priorart_core::{ConfidenceLevel, Intersection, VariantLabel, VariantRanks};

    fn result(identifier: &str, shortlisted: bool, score: f64) -> UnifiedResult {
        let mut ranks = VariantRanks::new();
        ranks.set(VariantLabel::Broad, 1);
        UnifiedResult {
            run_id: priorart_core::new_entity_id(),
            identifier: identifier.to_string(),
            content_type: priorart_core::ContentType::Patent,
            title: identifier.to_string(),
            snippet: None,
            link: None,
            ranks,
            found_in: vec![VariantLabel::Broad],
            intersection: Intersection::I1,
            score,
            shortlisted,
            fetch_outcome: None,
        }
    }

    #[test]
    fn only_shortlisted_rows_become_candidates() {
        let results =
            vec![result("A", true, 3.0), result("B", false, 2.0), result("C", true, 1.0)];
        let candidates = select_candidates(&results);
        let ids: Vec<&str> = candidates.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn ambiguous_subset_falls_back_to_full_set() {
        let stage1 = StageOutcome {
            determination: Determination::Doubt,
            confidence: ConfidenceLevel::Low,
            candidate_reasoning: vec![],
            novel_aspects: vec![],
            non_novel_aspects: vec![],
            remarks: None,
        };
        let candidates = select_candidates(&[result("A", true, 1.0), result("B", true, 0.5)]);
        assert_eq!(ambiguous_subset(&stage1, &candidates).len(), 2);
    }

    #[test]
    fn merged_aspects_preserve_order_without_duplicates() {
        let merged = merge_aspects(
            &["loop".to_string(), "valve".to_string()],
            &["valve".to_string(), "sensor".to_string()],
        );
        assert_eq!(merged, vec!["loop".to_string(), "valve".to_string(), "sensor".to_string()]);
    }
}
