//! Core entity structures

use crate::{
    AssessmentId, AssessmentStatus, BundleId, BundleStatus, ConfidenceLevel, ContentType,
    Determination, FetchOutcome, Intersection, RunId, RunStatus, Timestamp, UserId, VariantLabel,
    VariantOutcome,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// BUNDLE
// ============================================================================

/// The invention brief a bundle was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub title: String,
    pub problem: String,
    pub solution: String,
}

/// One query configuration within a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryVariant {
    pub label: VariantLabel,
    pub query: String,
    pub num_results: u32,
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Append-only audit entry recorded on bundle edits and approvals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleAuditEntry {
    pub at: Timestamp,
    pub actor: UserId,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A structured, user/AI-authored search specification with exactly
/// three query variants. Immutable once consumed by a run, except for
/// audit history entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub bundle_id: BundleId,
    pub user_id: UserId,
    pub source_summary: SourceSummary,
    pub core_concepts: Vec<String>,
    pub synonym_groups: Vec<Vec<String>>,
    pub query_variants: Vec<QueryVariant>,
    /// Tokens flagged as sensitive upstream; must be empty to approve.
    pub sensitive_tokens: Vec<String>,
    pub status: BundleStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub audit_history: Vec<BundleAuditEntry>,
}

impl Bundle {
    /// Look up the variant carrying the given label.
    pub fn variant(&self, label: VariantLabel) -> Option<&QueryVariant> {
        self.query_variants.iter().find(|v| v.label == label)
    }
}

// ============================================================================
// RUN
// ============================================================================

/// One execution of an approved bundle. Terminal once finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub bundle_id: BundleId,
    pub user_id: UserId,
    pub status: RunStatus,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    pub credits_consumed: u32,
    pub api_calls_made: u32,
    pub include_scholar: bool,
}

impl Run {
    pub fn new(bundle_id: BundleId, user_id: UserId, include_scholar: bool) -> Self {
        Self {
            run_id: crate::new_entity_id(),
            bundle_id,
            user_id,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            credits_consumed: 0,
            api_calls_made: 0,
            include_scholar,
        }
    }
}

/// Record of one variant execution within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryVariantExecution {
    pub run_id: RunId,
    pub label: VariantLabel,
    pub query: String,
    pub result_count: u32,
    pub api_calls: u32,
    pub outcome: VariantOutcome,
    pub executed_at: Timestamp,
}

// ============================================================================
// UNIFIED RESULTS
// ============================================================================

/// Per-variant ranks for one unified result.
///
/// Stored as a fixed-size array indexed by [`VariantLabel`] so the
/// aggregation logic stays generic over the variant set instead of
/// special-casing three optional fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantRanks {
    ranks: [Option<u32>; 3],
}

impl VariantRanks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based rank of the item within the given variant, if present.
    pub fn get(&self, label: VariantLabel) -> Option<u32> {
        self.ranks[label as usize]
    }

    pub fn set(&mut self, label: VariantLabel, rank: u32) {
        self.ranks[label as usize] = Some(rank);
    }

    /// Labels of the variants this item appeared in, canonical order.
    pub fn present(&self) -> Vec<VariantLabel> {
        VariantLabel::ALL.into_iter().filter(|l| self.get(*l).is_some()).collect()
    }

    /// Number of variants the item appeared in.
    pub fn count(&self) -> usize {
        self.ranks.iter().filter(|r| r.is_some()).count()
    }

    /// Best (lowest) rank across variants.
    pub fn best(&self) -> Option<u32> {
        self.ranks.iter().flatten().copied().min()
    }
}

/// One row of the unified, deduplicated result table for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedResult {
    pub run_id: RunId,
    /// Canonical identifier; unique within the run.
    pub identifier: String,
    pub content_type: ContentType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub ranks: VariantRanks,
    pub found_in: Vec<VariantLabel>,
    pub intersection: Intersection,
    pub score: f64,
    pub shortlisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_outcome: Option<FetchOutcome>,
}

// ============================================================================
// RECORD CACHE
// ============================================================================

/// Full-text patent detail persisted by the detail fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatentDetail {
    pub claims: Vec<String>,
    pub citations: Vec<String>,
    pub classifications: Vec<String>,
}

/// Cached patent metadata, shared across runs and keyed by canonical
/// identifier. `last_seen_at` is refreshed whenever a run touches the
/// record again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    pub identifier: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<PatentDetail>,
    /// Raw provider payload from the detail fetch, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_detail: Option<serde_json::Value>,
    pub first_seen_at: Timestamp,
    pub last_seen_at: Timestamp,
}

/// Cached scholarly metadata. Detail is complete from the initial
/// search pass, so there is no secondary fetch payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarRecord {
    pub identifier: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub first_seen_at: Timestamp,
    pub last_seen_at: Timestamp,
}

// ============================================================================
// NOVELTY ASSESSMENT
// ============================================================================

/// Candidate handed to the LLM gateway for assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentCandidate {
    pub identifier: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub relevance: f64,
    pub found_in: Vec<VariantLabel>,
    pub intersection: Intersection,
}

/// Per-candidate reasoning returned by an assessment stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReasoning {
    pub identifier: String,
    pub relevance: f64,
    pub reasoning: String,
    /// Stage 1 marks candidates it could not decide on; stage 2 is
    /// scoped to exactly this subset.
    #[serde(default)]
    pub ambiguous: bool,
}

/// Structured outcome of one assessment stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub determination: Determination,
    pub confidence: ConfidenceLevel,
    pub candidate_reasoning: Vec<CandidateReasoning>,
    pub novel_aspects: Vec<String>,
    pub non_novel_aspects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Two-stage novelty assessment attached to a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoveltyAssessmentRun {
    pub assessment_id: AssessmentId,
    pub run_id: RunId,
    pub status: AssessmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage1: Option<StageOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage2: Option<StageOutcome>,
    pub novel_aspects: Vec<String>,
    pub non_novel_aspects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_determination: Option<Determination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_remarks: Option<String>,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

impl NoveltyAssessmentRun {
    pub fn new(run_id: RunId) -> Self {
        Self {
            assessment_id: crate::new_entity_id(),
            run_id,
            status: AssessmentStatus::InProgress,
            stage1: None,
            stage2: None,
            novel_aspects: Vec::new(),
            non_novel_aspects: Vec::new(),
            confidence: None,
            final_determination: None,
            final_remarks: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

// ============================================================================
// CREDIT
// ============================================================================

/// Snapshot of a user's usage credit as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSnapshot {
    pub total: u32,
    pub used: u32,
}

impl CreditSnapshot {
    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_ranks_track_presence_and_best() {
        let mut ranks = VariantRanks::new();
        ranks.set(VariantLabel::Broad, 3);
        ranks.set(VariantLabel::Narrow, 1);

        assert_eq!(ranks.get(VariantLabel::Broad), Some(3));
        assert_eq!(ranks.get(VariantLabel::Baseline), None);
        assert_eq!(ranks.count(), 2);
        assert_eq!(ranks.best(), Some(1));
        assert_eq!(ranks.present(), vec![VariantLabel::Broad, VariantLabel::Narrow]);
    }

    #[test]
    fn credit_snapshot_never_underflows() {
        let snapshot = CreditSnapshot { total: 3, used: 5 };
        assert_eq!(snapshot.remaining(), 0);
    }
}
