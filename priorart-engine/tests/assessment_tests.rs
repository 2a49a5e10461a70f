//! Two-stage novelty assessment tests: gating on run state, doubt
//! resolution scoping, retry semantics and report availability.

mod common;

use common::{harness, wait_terminal, Harness};
use priorart_core::{
    AssessmentStatus, Bundle, CandidateReasoning, ConfidenceLevel, Determination, EngineError,
    ProviderError, RunId, StateError, VariantLabel,
};
use priorart_storage::StorageTrait;
use priorart_test_utils::{
    approved_bundle, patent_item, stage_outcome, MockLlmGateway, MockSearchProvider,
};

/// Search script yielding two I2-intersecting patents:
/// US1111111B2 (broad+baseline) and US2222222B2 (broad+narrow).
fn search_for(bundle: &Bundle) -> MockSearchProvider {
    let q = |label: VariantLabel| bundle.variant(label).expect("variant").query.clone();
    MockSearchProvider::new()
        .with_page(
            &q(VariantLabel::Broad),
            vec![patent_item("Pump A", "US-1111111-B2"), patent_item("Pump B", "US-2222222-B2")],
        )
        .with_page(&q(VariantLabel::Baseline), vec![patent_item("Pump A", "US-1111111-B2")])
        .with_page(&q(VariantLabel::Narrow), vec![patent_item("Pump B", "US-2222222-B2")])
}

async fn completed_run(llm: MockLlmGateway) -> (Harness, RunId) {
    let user = priorart_core::new_entity_id();
    let bundle = approved_bundle(user);

    let mut h = harness(search_for(&bundle), llm);
    h.user = user;
    h.ledger.grant(user, 10);
    h.storage.bundle_insert(&bundle).expect("seed bundle");

    let run = h.engine.start_run(user, bundle.bundle_id, false).expect("admitted");
    wait_terminal(&h, run.run_id).await;
    (h, run.run_id)
}

fn doubt_with_reasoning() -> priorart_core::StageOutcome {
    let mut outcome = stage_outcome(Determination::Doubt, ConfidenceLevel::Low);
    outcome.candidate_reasoning = vec![
        CandidateReasoning {
            identifier: "US1111111B2".to_string(),
            relevance: 0.9,
            reasoning: "clearly distinct claim structure".to_string(),
            ambiguous: false,
        },
        CandidateReasoning {
            identifier: "US2222222B2".to_string(),
            relevance: 0.8,
            reasoning: "overlapping modulation scheme, claims unclear".to_string(),
            ambiguous: true,
        },
    ];
    outcome
}

#[tokio::test]
async fn stage1_novel_decides_and_unlocks_the_report() {
    let llm =
        MockLlmGateway::new().with_assessment(stage_outcome(Determination::Novel, ConfidenceLevel::High));
    let (h, run_id) = completed_run(llm).await;

    let assessment = h.engine.start_assessment(h.user, run_id).await.expect("assessed");
    assert_eq!(assessment.status, AssessmentStatus::Novel);
    assert_eq!(assessment.final_determination, Some(Determination::Novel));
    assert!(assessment.stage2.is_none(), "stage 2 only runs on doubt");
    assert!(assessment.finished_at.is_some());

    // Stage 1 saw the full shortlist, deterministic order.
    assert_eq!(
        h.llm.assess_calls(),
        vec![vec!["US1111111B2".to_string(), "US2222222B2".to_string()]]
    );

    let payload = h.engine.run_status(h.user, run_id).expect("status");
    let view = payload.novelty_assessment.expect("attached");
    assert!(view.report_url.is_some());

    let url = h.engine.generate_report(h.user, run_id).await.expect("rendered");
    assert_eq!(url, format!("/reports/{}.pdf", assessment.assessment_id));
    assert_eq!(h.renderer.rendered(), vec![assessment.assessment_id]);
}

#[tokio::test]
async fn doubt_resolution_is_scoped_to_the_ambiguous_subset() {
    let llm = MockLlmGateway::new()
        .with_assessment(doubt_with_reasoning())
        .with_resolution(stage_outcome(Determination::NotNovel, ConfidenceLevel::Medium));
    let (h, run_id) = completed_run(llm).await;

    let assessment = h.engine.start_assessment(h.user, run_id).await.expect("assessed");
    assert_eq!(assessment.status, AssessmentStatus::DoubtResolved);
    assert_eq!(assessment.final_determination, Some(Determination::NotNovel));
    assert!(assessment.stage1.is_some());
    assert!(assessment.stage2.is_some());

    // Only the candidate stage 1 flagged reaches stage 2.
    assert_eq!(h.llm.resolve_calls(), vec![vec!["US2222222B2".to_string()]]);
}

#[tokio::test]
async fn unflagged_doubt_falls_back_to_the_full_shortlist() {
    let llm = MockLlmGateway::new()
        .with_assessment(stage_outcome(Determination::Doubt, ConfidenceLevel::Low))
        .with_resolution(stage_outcome(Determination::Doubt, ConfidenceLevel::Low));
    let (h, run_id) = completed_run(llm).await;

    let assessment = h.engine.start_assessment(h.user, run_id).await.expect("assessed");
    assert_eq!(assessment.status, AssessmentStatus::Doubt, "unresolved doubt stands");
    assert_eq!(assessment.final_determination, None);
    assert_eq!(h.llm.resolve_calls()[0].len(), 2);

    // Report stays gated on unresolved doubt.
    let err = h.engine.generate_report(h.user, run_id).await.expect_err("gated");
    assert!(matches!(
        err,
        EngineError::State(StateError::ReportNotAvailable {
            status: AssessmentStatus::Doubt,
            ..
        })
    ));
    assert!(h.renderer.rendered().is_empty());
}

#[tokio::test]
async fn assessment_requires_a_completed_run() {
    let user = priorart_core::new_entity_id();
    let bundle = approved_bundle(user);
    let bad_key = || ProviderError::InvalidApiKey { provider: "mock-search".to_string() };
    let q = |label: VariantLabel| bundle.variant(label).expect("variant").query.clone();

    let search = MockSearchProvider::new()
        .with_failure(&q(VariantLabel::Broad), bad_key())
        .with_failure(&q(VariantLabel::Baseline), bad_key())
        .with_failure(&q(VariantLabel::Narrow), bad_key());

    let mut h = harness(search, MockLlmGateway::new());
    h.user = user;
    h.ledger.grant(user, 10);
    h.storage.bundle_insert(&bundle).expect("seed bundle");

    let run = h.engine.start_run(user, bundle.bundle_id, false).expect("admitted");
    wait_terminal(&h, run.run_id).await;

    let err = h.engine.start_assessment(user, run.run_id).await.expect_err("refused");
    assert!(matches!(err, EngineError::State(StateError::RunNotCompleted { .. })));
}

#[tokio::test]
async fn decided_assessment_refuses_a_second_attempt() {
    let llm =
        MockLlmGateway::new().with_assessment(stage_outcome(Determination::Novel, ConfidenceLevel::High));
    let (h, run_id) = completed_run(llm).await;

    h.engine.start_assessment(h.user, run_id).await.expect("first");
    let err = h.engine.start_assessment(h.user, run_id).await.expect_err("second refused");
    assert!(matches!(err, EngineError::State(StateError::AssessmentAlreadyAttached { .. })));
}

#[tokio::test]
async fn stage1_failure_is_retried_on_the_same_assessment() {
    let llm = MockLlmGateway::new()
        .with_assessment_failure(ProviderError::Timeout { provider: "mock-llm".to_string() })
        .with_assessment(stage_outcome(Determination::Novel, ConfidenceLevel::High));
    let (h, run_id) = completed_run(llm).await;

    let err = h.engine.start_assessment(h.user, run_id).await.expect_err("gateway down");
    assert!(matches!(err, EngineError::Provider(_)));

    let stalled = h.storage.assessment_for_run(run_id).expect("read").expect("attached");
    assert_eq!(stalled.status, AssessmentStatus::InProgress);

    let assessment = h.engine.start_assessment(h.user, run_id).await.expect("retried");
    assert_eq!(assessment.assessment_id, stalled.assessment_id, "same assessment resumed");
    assert_eq!(assessment.status, AssessmentStatus::Novel);
}

#[tokio::test]
async fn stage2_failure_leaves_the_doubt_visible_and_retryable() {
    let llm = MockLlmGateway::new()
        .with_assessment(doubt_with_reasoning())
        .with_resolution_failure(ProviderError::Timeout { provider: "mock-llm".to_string() })
        .with_assessment(doubt_with_reasoning())
        .with_resolution(stage_outcome(Determination::Novel, ConfidenceLevel::Medium));
    let (h, run_id) = completed_run(llm).await;

    let err = h.engine.start_assessment(h.user, run_id).await.expect_err("stage 2 down");
    assert!(matches!(err, EngineError::Provider(_)));

    let stalled = h.storage.assessment_for_run(run_id).expect("read").expect("attached");
    assert_eq!(stalled.status, AssessmentStatus::Doubt, "stage-1 outcome survives the failure");

    let assessment = h.engine.start_assessment(h.user, run_id).await.expect("retried");
    assert_eq!(assessment.status, AssessmentStatus::DoubtResolved);
    assert_eq!(assessment.final_determination, Some(Determination::Novel));
}
