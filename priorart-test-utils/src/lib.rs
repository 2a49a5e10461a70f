//! PriorArt Test Utilities
//!
//! Centralized test infrastructure for the workspace:
//! - Mock search provider and LLM gateway with scripted responses
//! - Fixture builders for bundles and provider payloads
//!
//! Mocks panic on unscripted calls; that is intentional for tests.

use async_trait::async_trait;
use chrono::Utc;
use priorart_core::{
    AssessmentCandidate, AssessmentId, Bundle, BundleStatus, ConfidenceLevel, Determination,
    ProviderError, QueryVariant, SourceSummary, StageOutcome, UserId, VariantLabel,
};
use priorart_providers::{
    Capability, CostEstimate, LlmGateway, ProviderLimits, RawSearchItem, ReportRenderer,
    SearchPage, SearchProvider, SearchRequest,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

// Re-export the in-memory backends; most tests wire mocks and storage
// together.
pub use priorart_storage::{InMemoryCreditLedger, InMemoryStorage};

// ============================================================================
// MOCK SEARCH PROVIDER
// ============================================================================

/// Scripted search provider. Responses are queued per query string and
/// consumed in order; the last response is repeated once the queue
/// drains.
#[derive(Default)]
pub struct MockSearchProvider {
    responses: Mutex<HashMap<String, VecDeque<Result<SearchPage, ProviderError>>>>,
    details: Mutex<HashMap<String, serde_json::Value>>,
    search_calls: AtomicU32,
    detail_calls: AtomicU32,
    detail_attempts: Mutex<Vec<String>>,
    healthy: AtomicBool,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self { healthy: AtomicBool::new(true), ..Self::default() }
    }

    /// Queue a successful page for a query.
    pub fn with_page(self, query: &str, items: Vec<RawSearchItem>) -> Self {
        self.push_response(query, Ok(SearchPage { items }));
        self
    }

    /// Queue a failure for a query.
    pub fn with_failure(self, query: &str, error: ProviderError) -> Self {
        self.push_response(query, Err(error));
        self
    }

    /// Register a detail payload served for an exact identifier string.
    pub fn with_detail(self, identifier: &str, payload: serde_json::Value) -> Self {
        self.details.lock().expect("mock lock").insert(identifier.to_string(), payload);
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn search_calls(&self) -> u32 {
        self.search_calls.load(Ordering::Relaxed)
    }

    pub fn detail_calls(&self) -> u32 {
        self.detail_calls.load(Ordering::Relaxed)
    }

    /// Identifier strings attempted against `get_details`, in order.
    pub fn detail_attempts(&self) -> Vec<String> {
        self.detail_attempts.lock().expect("mock lock").clone()
    }

    fn push_response(&self, query: &str, response: Result<SearchPage, ProviderError>) {
        self.responses
            .lock()
            .expect("mock lock")
            .entry(query.to_string())
            .or_default()
            .push_back(response);
    }
}

impl Capability for MockSearchProvider {
    fn provider_id(&self) -> &str {
        "mock-search"
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::Relaxed);
        let mut responses = self.responses.lock().expect("mock lock");
        let queue = responses
            .get_mut(&request.query)
            .unwrap_or_else(|| panic!("no scripted response for query: {}", request.query));

        if queue.len() > 1 {
            queue.pop_front().expect("non-empty queue")
        } else {
            queue.front().cloned().unwrap_or_else(|| {
                panic!("scripted responses exhausted for query: {}", request.query)
            })
        }
    }

    async fn get_details(
        &self,
        identifier: &str,
        _fields: &[&str],
    ) -> Result<serde_json::Value, ProviderError> {
        self.detail_calls.fetch_add(1, Ordering::Relaxed);
        self.detail_attempts.lock().expect("mock lock").push(identifier.to_string());

        self.details.lock().expect("mock lock").get(identifier).cloned().ok_or_else(|| {
            ProviderError::RequestFailed {
                provider: "mock-search".to_string(),
                status: 404,
                message: format!("no detail for {identifier}"),
            }
        })
    }

    fn limits(&self) -> ProviderLimits {
        ProviderLimits { max_results_per_query: 100, min_request_interval_ms: 0, max_concurrent: 3 }
    }

    fn cost_estimate(&self, _request: &SearchRequest) -> CostEstimate {
        CostEstimate { api_calls: 1, estimated_cost_usd: 0.0 }
    }
}

// ============================================================================
// MOCK LLM GATEWAY
// ============================================================================

/// Scripted LLM gateway recording the candidate sets it was handed.
#[derive(Default)]
pub struct MockLlmGateway {
    assess_responses: Mutex<VecDeque<Result<StageOutcome, ProviderError>>>,
    resolve_responses: Mutex<VecDeque<Result<StageOutcome, ProviderError>>>,
    assess_calls: Mutex<Vec<Vec<String>>>,
    resolve_calls: Mutex<Vec<Vec<String>>>,
    healthy: AtomicBool,
}

impl MockLlmGateway {
    pub fn new() -> Self {
        Self { healthy: AtomicBool::new(true), ..Self::default() }
    }

    pub fn with_assessment(self, outcome: StageOutcome) -> Self {
        self.assess_responses.lock().expect("mock lock").push_back(Ok(outcome));
        self
    }

    pub fn with_assessment_failure(self, error: ProviderError) -> Self {
        self.assess_responses.lock().expect("mock lock").push_back(Err(error));
        self
    }

    pub fn with_resolution(self, outcome: StageOutcome) -> Self {
        self.resolve_responses.lock().expect("mock lock").push_back(Ok(outcome));
        self
    }

    pub fn with_resolution_failure(self, error: ProviderError) -> Self {
        self.resolve_responses.lock().expect("mock lock").push_back(Err(error));
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    /// Candidate identifier sets passed to `assess`, in call order.
    pub fn assess_calls(&self) -> Vec<Vec<String>> {
        self.assess_calls.lock().expect("mock lock").clone()
    }

    /// Candidate identifier sets passed to `resolve`, in call order.
    pub fn resolve_calls(&self) -> Vec<Vec<String>> {
        self.resolve_calls.lock().expect("mock lock").clone()
    }
}

impl Capability for MockLlmGateway {
    fn provider_id(&self) -> &str {
        "mock-llm"
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LlmGateway for MockLlmGateway {
    async fn assess(
        &self,
        _summary: &SourceSummary,
        candidates: &[AssessmentCandidate],
    ) -> Result<StageOutcome, ProviderError> {
        self.assess_calls
            .lock()
            .expect("mock lock")
            .push(candidates.iter().map(|c| c.identifier.clone()).collect());
        self.assess_responses
            .lock()
            .expect("mock lock")
            .pop_front()
            .expect("no scripted stage-1 outcome")
    }

    async fn resolve(
        &self,
        _summary: &SourceSummary,
        ambiguous: &[AssessmentCandidate],
    ) -> Result<StageOutcome, ProviderError> {
        self.resolve_calls
            .lock()
            .expect("mock lock")
            .push(ambiguous.iter().map(|c| c.identifier.clone()).collect());
        self.resolve_responses
            .lock()
            .expect("mock lock")
            .pop_front()
            .expect("no scripted stage-2 outcome")
    }
}

// ============================================================================
// MOCK REPORT RENDERER
// ============================================================================

#[derive(Default)]
pub struct MockReportRenderer {
    rendered: Mutex<Vec<AssessmentId>>,
}

impl MockReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> Vec<AssessmentId> {
        self.rendered.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl ReportRenderer for MockReportRenderer {
    async fn render(&self, assessment_id: AssessmentId) -> Result<String, ProviderError> {
        self.rendered.lock().expect("mock lock").push(assessment_id);
        Ok(format!("/reports/{assessment_id}.pdf"))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// An approved three-variant bundle ready for execution.
pub fn approved_bundle(user_id: UserId) -> Bundle {
    let now = Utc::now();
    Bundle {
        bundle_id: priorart_core::new_entity_id(),
        user_id,
        source_summary: SourceSummary {
            title: "Adaptive heat pump controller".to_string(),
            problem: "Fixed-speed compressors waste energy at partial load".to_string(),
            solution: "Predictive modulation of compressor speed from load forecasts".to_string(),
        },
        core_concepts: vec!["heat pump".to_string(), "compressor modulation".to_string()],
        synonym_groups: vec![vec!["heat pump".to_string(), "thermal pump".to_string()]],
        query_variants: vec![
            variant(VariantLabel::Broad, "(\"heat pump\" OR \"thermal pump\") controller"),
            variant(VariantLabel::Baseline, "\"heat pump\" compressor modulation controller"),
            variant(VariantLabel::Narrow, "\"heat pump\" predictive compressor speed modulation"),
        ],
        sensitive_tokens: vec![],
        status: BundleStatus::Approved,
        created_at: now,
        updated_at: now,
        audit_history: vec![],
    }
}

pub fn variant(label: VariantLabel, query: &str) -> QueryVariant {
    QueryVariant { label, query: query.to_string(), num_results: 10, page: 1, notes: None }
}

/// A raw patent hit as the provider would return it.
pub fn patent_item(title: &str, publication_number: &str) -> RawSearchItem {
    RawSearchItem {
        title: title.to_string(),
        snippet: Some(format!("{title} snippet")),
        link: Some(format!("https://patents.example/{publication_number}")),
        publication_number: Some(publication_number.to_string()),
        patent_id: None,
        doi: None,
        authors: vec![],
        is_scholar: false,
    }
}

/// A raw scholarly hit as the provider would return it.
pub fn scholar_item(title: &str, doi: &str) -> RawSearchItem {
    RawSearchItem {
        title: title.to_string(),
        snippet: Some(format!("{title} abstract")),
        link: Some(format!("https://doi.org/{doi}")),
        publication_number: None,
        patent_id: None,
        doi: Some(doi.to_string()),
        authors: vec!["A. Author".to_string()],
        is_scholar: true,
    }
}

/// A minimal stage outcome with the given determination.
pub fn stage_outcome(determination: Determination, confidence: ConfidenceLevel) -> StageOutcome {
    StageOutcome {
        determination,
        confidence,
        candidate_reasoning: vec![],
        novel_aspects: vec![],
        non_novel_aspects: vec![],
        remarks: None,
    }
}

/// A detail payload matching the shape the detail fetcher validates.
pub fn patent_detail_payload(title: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "claims": ["1. A heat pump comprising a compressor.", "2. The pump of claim 1."],
        "citations": [{ "publication_number": "US-9999999-B2" }],
        "classifications": [{ "code": "F25B30/02" }]
    })
}
