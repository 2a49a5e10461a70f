//! PriorArt Engine - Pipeline Orchestration
//!
//! The composition root of the workspace. `PriorArtEngine` owns the
//! storage handle, the credit ledger and the provider registries, and
//! exposes the operations the API layer calls: bundle lifecycle, run
//! execution, novelty assessment and report gating. Everything is
//! injected; nothing in here reaches for a global.

pub mod aggregate;
pub mod assess;
pub mod config;
pub mod detail;
pub mod execute;
pub mod normalize;
pub mod report;
mod run;
pub mod validate;

pub use config::Config;
pub use report::PathReportRenderer;
pub use validate::{BundleValidation, GuardrailCode, GuardrailWarning};

use chrono::Utc;
use priorart_core::{
    new_entity_id, Bundle, BundleAuditEntry, BundleId, BundleStatus, EngineError, EngineResult,
    NoveltyAssessmentRun, PersistenceError, QueryVariant, Run, RunId, RunStatus, SourceSummary,
    StateError, Timestamp, UnifiedResult, UserId, ValidationFailure,
};
use priorart_providers::{LlmGateway, ProviderRegistry, ReportRenderer, SearchProvider};
use priorart_storage::{BundleUpdate, CreditLedger, StorageTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// API PAYLOADS
// ============================================================================

/// Input for bundle creation. The server assigns identity, status and
/// audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBundle {
    pub source_summary: SourceSummary,
    pub core_concepts: Vec<String>,
    #[serde(default)]
    pub synonym_groups: Vec<Vec<String>>,
    pub query_variants: Vec<QueryVariant>,
    #[serde(default)]
    pub sensitive_tokens: Vec<String>,
}

/// Assessment as exposed to clients, with the lazily computed report
/// URL attached once the determination is terminal.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    #[serde(flatten)]
    pub assessment: NoveltyAssessmentRun,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

/// Poll payload for one run: status, counters, the unified result
/// table, and the assessment if one is attached.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusPayload {
    pub run_id: RunId,
    pub bundle_id: BundleId,
    pub status: RunStatus,
    pub started_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    pub credits_consumed: u32,
    pub api_calls_made: u32,
    pub results: Vec<UnifiedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novelty_assessment: Option<AssessmentView>,
}

// ============================================================================
// ENGINE
// ============================================================================

/// Pipeline orchestrator. Cheap to share behind an `Arc`; all state
/// lives in the injected collaborators.
pub struct PriorArtEngine {
    config: Config,
    storage: Arc<dyn StorageTrait>,
    ledger: Arc<dyn CreditLedger>,
    search: ProviderRegistry<dyn SearchProvider>,
    llm: ProviderRegistry<dyn LlmGateway>,
    renderer: Arc<dyn ReportRenderer>,
}

impl PriorArtEngine {
    pub fn new(
        config: Config,
        storage: Arc<dyn StorageTrait>,
        ledger: Arc<dyn CreditLedger>,
        search: ProviderRegistry<dyn SearchProvider>,
        llm: ProviderRegistry<dyn LlmGateway>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self { config, storage, ledger, search, llm, renderer }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // === Bundles ===

    /// Create a bundle in DRAFT. No validation happens here; a draft
    /// may be arbitrarily incomplete until approval is requested.
    pub fn create_bundle(&self, user_id: UserId, new: NewBundle) -> EngineResult<Bundle> {
        let now = Utc::now();
        let bundle = Bundle {
            bundle_id: new_entity_id(),
            user_id,
            source_summary: new.source_summary,
            core_concepts: new.core_concepts,
            synonym_groups: new.synonym_groups,
            query_variants: new.query_variants,
            sensitive_tokens: new.sensitive_tokens,
            status: BundleStatus::Draft,
            created_at: now,
            updated_at: now,
            audit_history: vec![audit(user_id, "created", None)],
        };

        self.storage.bundle_insert(&bundle)?;
        info!(bundle_id = %bundle.bundle_id, "bundle created");
        Ok(bundle)
    }

    pub fn get_bundle(&self, user_id: UserId, bundle_id: BundleId) -> EngineResult<Bundle> {
        self.owned_bundle(user_id, bundle_id)
    }

    /// Move a draft to READY_FOR_REVIEW.
    pub fn submit_bundle(&self, user_id: UserId, bundle_id: BundleId) -> EngineResult<Bundle> {
        self.owned_bundle(user_id, bundle_id)?;
        self.storage.bundle_update(
            bundle_id,
            BundleUpdate {
                status: Some(BundleStatus::ReadyForReview),
                audit_entry: Some(audit(user_id, "submitted", None)),
            },
        )?;
        self.owned_bundle(user_id, bundle_id)
    }

    /// Approve a bundle for execution. Hard validation is atomic: any
    /// failing check rejects with the full itemized error list and no
    /// status change. Guardrail findings are returned as warnings and
    /// never block approval.
    pub fn approve_bundle(
        &self,
        user_id: UserId,
        bundle_id: BundleId,
    ) -> EngineResult<(Bundle, Vec<GuardrailWarning>)> {
        let bundle = self.owned_bundle(user_id, bundle_id)?;

        let validation = validate::validate_bundle(&bundle, &self.config);
        if !validation.valid {
            warn!(bundle_id = %bundle_id, errors = validation.errors.len(), "approval rejected");
            return Err(ValidationFailure { errors: validation.errors }.into());
        }

        let warnings = validate::guardrail_warnings(&bundle);
        let detail =
            (!warnings.is_empty()).then(|| format!("{} guardrail warning(s)", warnings.len()));

        self.storage.bundle_update(
            bundle_id,
            BundleUpdate {
                status: Some(BundleStatus::Approved),
                audit_entry: Some(audit(user_id, "approved", detail)),
            },
        )?;
        info!(bundle_id = %bundle_id, warnings = warnings.len(), "bundle approved");

        Ok((self.owned_bundle(user_id, bundle_id)?, warnings))
    }

    // === Runs ===

    /// Admit and start a run against an approved bundle. The credit
    /// gate consumes exactly one credit atomically before any provider
    /// call; a refusal is recorded as a CREDIT_EXHAUSTED run and
    /// surfaced to the caller. On admission the pipeline is spawned
    /// detached and the RUNNING run returned immediately for polling.
    pub fn start_run(
        &self,
        user_id: UserId,
        bundle_id: BundleId,
        include_scholar: bool,
    ) -> EngineResult<Run> {
        let bundle = self.owned_bundle(user_id, bundle_id)?;
        if bundle.status != BundleStatus::Approved {
            return Err(StateError::BundleNotApproved { bundle_id, status: bundle.status }.into());
        }

        // Route before consuming credit so a dead provider pool does
        // not burn the user's allowance.
        let provider = self.search.route()?;

        match self.ledger.try_consume(user_id) {
            Ok(snapshot) => {
                let mut run = Run::new(bundle_id, user_id, include_scholar);
                run.credits_consumed = 1;
                self.storage.run_insert(&run)?;
                info!(
                    run_id = %run.run_id,
                    bundle_id = %bundle_id,
                    remaining_credit = snapshot.remaining(),
                    "run admitted"
                );

                tokio::spawn(run::execute_run(
                    self.config.clone(),
                    Arc::clone(&self.storage),
                    provider,
                    run.clone(),
                    bundle,
                ));

                Ok(run)
            }
            Err(refusal) => {
                let mut run = Run::new(bundle_id, user_id, include_scholar);
                run.status = RunStatus::CreditExhausted;
                run.finished_at = Some(Utc::now());
                self.storage.run_insert(&run)?;
                warn!(run_id = %run.run_id, bundle_id = %bundle_id, "run refused: {refusal}");
                Err(refusal.into())
            }
        }
    }

    /// Current state of a run with its unified result table and, when
    /// attached, the assessment.
    pub fn run_status(&self, user_id: UserId, run_id: RunId) -> EngineResult<RunStatusPayload> {
        let run = self.owned_run(user_id, run_id)?;
        let results = self.storage.unified_results_for_run(run_id)?;
        let novelty_assessment =
            self.storage.assessment_for_run(run_id)?.map(|assessment| AssessmentView {
                report_url: report::report_url_for(&assessment),
                assessment,
            });

        Ok(RunStatusPayload {
            run_id: run.run_id,
            bundle_id: run.bundle_id,
            status: run.status,
            started_at: run.started_at,
            finished_at: run.finished_at,
            credits_consumed: run.credits_consumed,
            api_calls_made: run.api_calls_made,
            results,
            novelty_assessment,
        })
    }

    /// Every run the user has started, oldest first.
    pub fn list_runs(&self, user_id: UserId) -> EngineResult<Vec<Run>> {
        Ok(self.storage.runs_for_user(user_id)?)
    }

    // === Assessments ===

    /// Run the two-stage novelty assessment over a completed run's
    /// shortlist. An interrupted IN_PROGRESS assessment is resumed; a
    /// run with a decided assessment refuses a second one.
    pub async fn start_assessment(
        &self,
        user_id: UserId,
        run_id: RunId,
    ) -> EngineResult<NoveltyAssessmentRun> {
        let run = self.owned_run(user_id, run_id)?;
        if !run.status.assessment_allowed() {
            return Err(StateError::RunNotCompleted { run_id, status: run.status }.into());
        }

        // An assessment that never reached a terminal determination
        // (interrupted, or doubt left unresolved by a stage-2 failure)
        // is retried; a decided one refuses a second attempt.
        let assessment = match self.storage.assessment_for_run(run_id)? {
            Some(existing) if !existing.status.report_allowed() => {
                info!(assessment_id = %existing.assessment_id, "resuming undecided assessment");
                existing
            }
            Some(_) => return Err(StateError::AssessmentAlreadyAttached { run_id }.into()),
            None => {
                let fresh = NoveltyAssessmentRun::new(run_id);
                self.storage.assessment_insert(&fresh)?;
                fresh
            }
        };

        let bundle = self.storage.bundle_get(run.bundle_id)?.ok_or(PersistenceError::NotFound {
            entity: "Bundle",
            id: run.bundle_id.to_string(),
        })?;

        let results = self.storage.unified_results_for_run(run_id)?;
        let candidates = assess::select_candidates(&results);
        info!(run_id = %run_id, candidates = candidates.len(), "starting novelty assessment");

        let gateway = self.llm.route()?;
        assess::run_assessment(
            gateway,
            self.storage.as_ref(),
            &bundle.source_summary,
            &assessment,
            &candidates,
        )
        .await
    }

    // === Reports ===

    /// Render the PDF report for a run's assessment. Gated on a
    /// terminal determination; returns the rendered document's URL.
    pub async fn generate_report(&self, user_id: UserId, run_id: RunId) -> EngineResult<String> {
        self.owned_run(user_id, run_id)?;

        let assessment =
            self.storage.assessment_for_run(run_id)?.ok_or(PersistenceError::NotFound {
                entity: "NoveltyAssessmentRun",
                id: run_id.to_string(),
            })?;
        report::ensure_report_allowed(&assessment)?;

        let url = self.renderer.render(assessment.assessment_id).await?;
        info!(run_id = %run_id, assessment_id = %assessment.assessment_id, "report rendered");
        Ok(url)
    }

    // === Internal ===

    /// Ownership check. A bundle owned by someone else reads as absent
    /// so the API surfaces 404, not 403.
    fn owned_bundle(&self, user_id: UserId, bundle_id: BundleId) -> EngineResult<Bundle> {
        match self.storage.bundle_get(bundle_id)? {
            Some(bundle) if bundle.user_id == user_id => Ok(bundle),
            _ => Err(EngineError::Persistence(PersistenceError::NotFound {
                entity: "Bundle",
                id: bundle_id.to_string(),
            })),
        }
    }

    fn owned_run(&self, user_id: UserId, run_id: RunId) -> EngineResult<Run> {
        match self.storage.run_get(run_id)? {
            Some(run) if run.user_id == user_id => Ok(run),
            _ => Err(EngineError::Persistence(PersistenceError::NotFound {
                entity: "Run",
                id: run_id.to_string(),
            })),
        }
    }
}

fn audit(actor: UserId, action: &str, detail: Option<String>) -> BundleAuditEntry {
    BundleAuditEntry { at: Utc::now(), actor, action: action.to_string(), detail }
}
