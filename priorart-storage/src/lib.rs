//! PriorArt Storage - Persistence Trait and In-Memory Implementation
//!
//! Defines the storage abstraction the engine writes through. The
//! in-memory implementation backs tests and single-process deployments;
//! a database-backed implementation plugs in behind the same trait.

pub mod ledger;

pub use ledger::{CreditLedger, InMemoryCreditLedger};

use chrono::Utc;
use priorart_core::{
    AssessmentId, Bundle, BundleAuditEntry, BundleId, BundleStatus, FetchOutcome,
    NoveltyAssessmentRun, PatentDetail, PatentRecord, PersistenceError, QueryVariantExecution,
    Run, RunId, RunStatus, ScholarRecord, Timestamp, UnifiedResult, UserId,
};
use std::collections::HashMap;
use std::sync::RwLock;

pub type StorageResult<T> = Result<T, PersistenceError>;

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for bundles.
#[derive(Debug, Clone, Default)]
pub struct BundleUpdate {
    pub status: Option<BundleStatus>,
    /// Appended to the audit history, never replacing it.
    pub audit_entry: Option<BundleAuditEntry>,
}

/// Update payload for runs.
#[derive(Debug, Clone, Default)]
pub struct RunUpdate {
    pub status: Option<RunStatus>,
    pub finished_at: Option<Timestamp>,
    pub credits_consumed: Option<u32>,
    pub api_calls_made: Option<u32>,
}

/// Update payload for novelty assessments.
#[derive(Debug, Clone, Default)]
pub struct AssessmentUpdate {
    pub status: Option<priorart_core::AssessmentStatus>,
    pub stage1: Option<priorart_core::StageOutcome>,
    pub stage2: Option<priorart_core::StageOutcome>,
    pub novel_aspects: Option<Vec<String>>,
    pub non_novel_aspects: Option<Vec<String>>,
    pub confidence: Option<priorart_core::ConfidenceLevel>,
    pub final_determination: Option<priorart_core::Determination>,
    pub final_remarks: Option<String>,
    pub finished_at: Option<Timestamp>,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Storage for every engine-owned entity. Implementations must be
/// thread-safe; the engine holds them behind an `Arc`.
pub trait StorageTrait: Send + Sync {
    // === Bundles ===
    fn bundle_insert(&self, bundle: &Bundle) -> StorageResult<()>;
    fn bundle_get(&self, id: BundleId) -> StorageResult<Option<Bundle>>;
    fn bundle_update(&self, id: BundleId, update: BundleUpdate) -> StorageResult<()>;

    // === Runs ===
    fn run_insert(&self, run: &Run) -> StorageResult<()>;
    fn run_get(&self, id: RunId) -> StorageResult<Option<Run>>;
    fn run_update(&self, id: RunId, update: RunUpdate) -> StorageResult<()>;
    fn runs_for_user(&self, user_id: UserId) -> StorageResult<Vec<Run>>;

    // === Variant executions ===
    fn variant_execution_insert(&self, execution: &QueryVariantExecution) -> StorageResult<()>;
    fn variant_executions_for_run(&self, run_id: RunId)
        -> StorageResult<Vec<QueryVariantExecution>>;

    // === Unified results ===
    /// Replace the unified result table for a run.
    fn unified_results_put(&self, run_id: RunId, results: Vec<UnifiedResult>)
        -> StorageResult<()>;
    fn unified_results_for_run(&self, run_id: RunId) -> StorageResult<Vec<UnifiedResult>>;
    fn unified_result_set_fetch_outcome(
        &self,
        run_id: RunId,
        identifier: &str,
        outcome: FetchOutcome,
    ) -> StorageResult<()>;

    // === Record cache ===
    /// Insert or refresh a cached patent record. `last_seen_at` is
    /// bumped when the identifier already exists.
    fn patent_record_upsert(&self, record: PatentRecord) -> StorageResult<()>;
    fn patent_record_get(&self, identifier: &str) -> StorageResult<Option<PatentRecord>>;
    fn patent_record_set_detail(
        &self,
        identifier: &str,
        detail: PatentDetail,
        raw: serde_json::Value,
    ) -> StorageResult<()>;

    fn scholar_record_upsert(&self, record: ScholarRecord) -> StorageResult<()>;
    fn scholar_record_get(&self, identifier: &str) -> StorageResult<Option<ScholarRecord>>;

    // === Novelty assessments ===
    /// Attach an assessment to a run. At most one per run.
    fn assessment_insert(&self, assessment: &NoveltyAssessmentRun) -> StorageResult<()>;
    fn assessment_get(&self, id: AssessmentId) -> StorageResult<Option<NoveltyAssessmentRun>>;
    fn assessment_for_run(&self, run_id: RunId) -> StorageResult<Option<NoveltyAssessmentRun>>;
    fn assessment_update(&self, id: AssessmentId, update: AssessmentUpdate) -> StorageResult<()>;
}

// ============================================================================
// IN-MEMORY IMPLEMENTATION
// ============================================================================

/// HashMap-backed storage guarded by `RwLock`s, one per table.
#[derive(Default)]
pub struct InMemoryStorage {
    bundles: RwLock<HashMap<BundleId, Bundle>>,
    runs: RwLock<HashMap<RunId, Run>>,
    variant_executions: RwLock<HashMap<RunId, Vec<QueryVariantExecution>>>,
    unified_results: RwLock<HashMap<RunId, Vec<UnifiedResult>>>,
    patent_records: RwLock<HashMap<String, PatentRecord>>,
    scholar_records: RwLock<HashMap<String, ScholarRecord>>,
    assessments: RwLock<HashMap<AssessmentId, NoveltyAssessmentRun>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> StorageResult<std::sync::RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| PersistenceError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> StorageResult<std::sync::RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| PersistenceError::LockPoisoned)
}

impl StorageTrait for InMemoryStorage {
    fn bundle_insert(&self, bundle: &Bundle) -> StorageResult<()> {
        let mut bundles = write(&self.bundles)?;
        if bundles.contains_key(&bundle.bundle_id) {
            return Err(PersistenceError::AlreadyExists {
                entity: "Bundle",
                id: bundle.bundle_id.to_string(),
            });
        }
        bundles.insert(bundle.bundle_id, bundle.clone());
        Ok(())
    }

    fn bundle_get(&self, id: BundleId) -> StorageResult<Option<Bundle>> {
        Ok(read(&self.bundles)?.get(&id).cloned())
    }

    fn bundle_update(&self, id: BundleId, update: BundleUpdate) -> StorageResult<()> {
        let mut bundles = write(&self.bundles)?;
        let bundle = bundles
            .get_mut(&id)
            .ok_or(PersistenceError::NotFound { entity: "Bundle", id: id.to_string() })?;
        if let Some(status) = update.status {
            bundle.status = status;
        }
        if let Some(entry) = update.audit_entry {
            bundle.audit_history.push(entry);
        }
        bundle.updated_at = Utc::now();
        Ok(())
    }

    fn run_insert(&self, run: &Run) -> StorageResult<()> {
        let mut runs = write(&self.runs)?;
        if runs.contains_key(&run.run_id) {
            return Err(PersistenceError::AlreadyExists {
                entity: "Run",
                id: run.run_id.to_string(),
            });
        }
        runs.insert(run.run_id, run.clone());
        Ok(())
    }

    fn run_get(&self, id: RunId) -> StorageResult<Option<Run>> {
        Ok(read(&self.runs)?.get(&id).cloned())
    }

    fn run_update(&self, id: RunId, update: RunUpdate) -> StorageResult<()> {
        let mut runs = write(&self.runs)?;
        let run = runs
            .get_mut(&id)
            .ok_or(PersistenceError::NotFound { entity: "Run", id: id.to_string() })?;
        if let Some(status) = update.status {
            run.status = status;
        }
        if let Some(finished_at) = update.finished_at {
            run.finished_at = Some(finished_at);
        }
        if let Some(credits) = update.credits_consumed {
            run.credits_consumed = credits;
        }
        if let Some(calls) = update.api_calls_made {
            run.api_calls_made = calls;
        }
        Ok(())
    }

    fn runs_for_user(&self, user_id: UserId) -> StorageResult<Vec<Run>> {
        let mut runs: Vec<Run> =
            read(&self.runs)?.values().filter(|r| r.user_id == user_id).cloned().collect();
        runs.sort_by_key(|r| r.started_at);
        Ok(runs)
    }

    fn variant_execution_insert(&self, execution: &QueryVariantExecution) -> StorageResult<()> {
        write(&self.variant_executions)?
            .entry(execution.run_id)
            .or_default()
            .push(execution.clone());
        Ok(())
    }

    fn variant_executions_for_run(
        &self,
        run_id: RunId,
    ) -> StorageResult<Vec<QueryVariantExecution>> {
        Ok(read(&self.variant_executions)?.get(&run_id).cloned().unwrap_or_default())
    }

    fn unified_results_put(
        &self,
        run_id: RunId,
        results: Vec<UnifiedResult>,
    ) -> StorageResult<()> {
        write(&self.unified_results)?.insert(run_id, results);
        Ok(())
    }

    fn unified_results_for_run(&self, run_id: RunId) -> StorageResult<Vec<UnifiedResult>> {
        Ok(read(&self.unified_results)?.get(&run_id).cloned().unwrap_or_default())
    }

    fn unified_result_set_fetch_outcome(
        &self,
        run_id: RunId,
        identifier: &str,
        outcome: FetchOutcome,
    ) -> StorageResult<()> {
        let mut tables = write(&self.unified_results)?;
        let results = tables
            .get_mut(&run_id)
            .ok_or(PersistenceError::NotFound { entity: "UnifiedResult", id: run_id.to_string() })?;
        let row = results.iter_mut().find(|r| r.identifier == identifier).ok_or(
            PersistenceError::NotFound { entity: "UnifiedResult", id: identifier.to_string() },
        )?;
        row.fetch_outcome = Some(outcome);
        Ok(())
    }

    fn patent_record_upsert(&self, record: PatentRecord) -> StorageResult<()> {
        let mut records = write(&self.patent_records)?;
        match records.get_mut(&record.identifier) {
            Some(existing) => {
                existing.last_seen_at = Utc::now();
                if existing.abstract_text.is_none() {
                    existing.abstract_text = record.abstract_text;
                }
            }
            None => {
                records.insert(record.identifier.clone(), record);
            }
        }
        Ok(())
    }

    fn patent_record_get(&self, identifier: &str) -> StorageResult<Option<PatentRecord>> {
        Ok(read(&self.patent_records)?.get(identifier).cloned())
    }

    fn patent_record_set_detail(
        &self,
        identifier: &str,
        detail: PatentDetail,
        raw: serde_json::Value,
    ) -> StorageResult<()> {
        let mut records = write(&self.patent_records)?;
        let record = records.get_mut(identifier).ok_or(PersistenceError::NotFound {
            entity: "PatentRecord",
            id: identifier.to_string(),
        })?;
        record.detail = Some(detail);
        record.raw_detail = Some(raw);
        record.last_seen_at = Utc::now();
        Ok(())
    }

    fn scholar_record_upsert(&self, record: ScholarRecord) -> StorageResult<()> {
        let mut records = write(&self.scholar_records)?;
        match records.get_mut(&record.identifier) {
            Some(existing) => existing.last_seen_at = Utc::now(),
            None => {
                records.insert(record.identifier.clone(), record);
            }
        }
        Ok(())
    }

    fn scholar_record_get(&self, identifier: &str) -> StorageResult<Option<ScholarRecord>> {
        Ok(read(&self.scholar_records)?.get(identifier).cloned())
    }

    fn assessment_insert(&self, assessment: &NoveltyAssessmentRun) -> StorageResult<()> {
        let mut assessments = write(&self.assessments)?;
        if assessments.values().any(|a| a.run_id == assessment.run_id) {
            return Err(PersistenceError::AlreadyExists {
                entity: "NoveltyAssessmentRun",
                id: assessment.run_id.to_string(),
            });
        }
        assessments.insert(assessment.assessment_id, assessment.clone());
        Ok(())
    }

    fn assessment_get(&self, id: AssessmentId) -> StorageResult<Option<NoveltyAssessmentRun>> {
        Ok(read(&self.assessments)?.get(&id).cloned())
    }

    fn assessment_for_run(&self, run_id: RunId) -> StorageResult<Option<NoveltyAssessmentRun>> {
        Ok(read(&self.assessments)?.values().find(|a| a.run_id == run_id).cloned())
    }

    fn assessment_update(&self, id: AssessmentId, update: AssessmentUpdate) -> StorageResult<()> {
        let mut assessments = write(&self.assessments)?;
        let assessment = assessments.get_mut(&id).ok_or(PersistenceError::NotFound {
            entity: "NoveltyAssessmentRun",
            id: id.to_string(),
        })?;
        if let Some(status) = update.status {
            assessment.status = status;
        }
        if let Some(stage1) = update.stage1 {
            assessment.stage1 = Some(stage1);
        }
        if let Some(stage2) = update.stage2 {
            assessment.stage2 = Some(stage2);
        }
        if let Some(aspects) = update.novel_aspects {
            assessment.novel_aspects = aspects;
        }
        if let Some(aspects) = update.non_novel_aspects {
            assessment.non_novel_aspects = aspects;
        }
        if let Some(confidence) = update.confidence {
            assessment.confidence = Some(confidence);
        }
        if let Some(determination) = update.final_determination {
            assessment.final_determination = Some(determination);
        }
        if let Some(remarks) = update.final_remarks {
            assessment.final_remarks = Some(remarks);
        }
        if let Some(finished_at) = update.finished_at {
            assessment.finished_at = Some(finished_at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priorart_core::{SourceSummary, VariantLabel};

    fn bundle() -> Bundle {
        let now = Utc::now();
        Bundle {
            bundle_id: priorart_core::new_entity_id(),
            user_id: priorart_core::new_entity_id(),
            source_summary: SourceSummary {
                title: "Heat pump".to_string(),
                problem: "Low efficiency".to_string(),
                solution: "Phase-change loop".to_string(),
            },
            core_concepts: vec!["heat pump".to_string()],
            synonym_groups: vec![],
            query_variants: VariantLabel::ALL
                .into_iter()
                .map(|label| priorart_core::QueryVariant {
                    label,
                    query: "heat pump".to_string(),
                    num_results: 10,
                    page: 1,
                    notes: None,
                })
                .collect(),
            sensitive_tokens: vec![],
            status: BundleStatus::Approved,
            created_at: now,
            updated_at: now,
            audit_history: vec![],
        }
    }

    #[test]
    fn duplicate_bundle_insert_is_rejected() {
        let storage = InMemoryStorage::new();
        let b = bundle();
        storage.bundle_insert(&b).expect("first insert");
        assert!(matches!(
            storage.bundle_insert(&b),
            Err(PersistenceError::AlreadyExists { entity: "Bundle", .. })
        ));
    }

    #[test]
    fn at_most_one_assessment_per_run() {
        let storage = InMemoryStorage::new();
        let run_id = priorart_core::new_entity_id();
        storage.assessment_insert(&NoveltyAssessmentRun::new(run_id)).expect("first");
        assert!(storage.assessment_insert(&NoveltyAssessmentRun::new(run_id)).is_err());
    }

    #[test]
    fn patent_upsert_refreshes_last_seen() {
        let storage = InMemoryStorage::new();
        let now = Utc::now();
        let record = PatentRecord {
            identifier: "US1234567B2".to_string(),
            title: "Heat pump".to_string(),
            abstract_text: None,
            link: None,
            detail: None,
            raw_detail: None,
            first_seen_at: now,
            last_seen_at: now,
        };
        storage.patent_record_upsert(record.clone()).expect("insert");
        storage.patent_record_upsert(record).expect("refresh");

        let stored = storage.patent_record_get("US1234567B2").expect("read").expect("present");
        assert!(stored.last_seen_at >= now);
        assert_eq!(stored.first_seen_at, now);
    }
}
