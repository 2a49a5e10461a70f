//! PriorArt Providers - external capability layer
//!
//! Provider-agnostic traits for the patent/scholarly search provider
//! and the LLM gateway, concrete `reqwest` clients, and a
//! priority-ordered registry with deterministic failover.

pub mod client;
pub mod llm;
pub mod registry;
pub mod search;

pub use client::RateLimitedClient;
pub use llm::HttpLlmGateway;
pub use registry::ProviderRegistry;
pub use search::HttpSearchProvider;

use async_trait::async_trait;
use priorart_core::{AssessmentCandidate, AssessmentId, ProviderError, SourceSummary, StageOutcome};
use serde::{Deserialize, Serialize};

// ============================================================================
// CAPABILITY SURFACE
// ============================================================================

/// Request limits advertised by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLimits {
    /// Hard cap on results per query.
    pub max_results_per_query: u32,
    /// Minimum spacing the caller must leave between requests.
    pub min_request_interval_ms: u64,
    /// Maximum in-flight requests the provider tolerates per caller.
    pub max_concurrent: u32,
}

/// Rough cost of serving a request, used for routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub api_calls: u32,
    pub estimated_cost_usd: f64,
}

/// Common surface shared by every provider capability so the registry
/// can route over them uniformly.
pub trait Capability: Send + Sync {
    /// Stable identifier, used for logging and deterministic tie-breaks.
    fn provider_id(&self) -> &str;

    /// Whether the provider is currently usable. Routing skips
    /// unhealthy providers.
    fn is_healthy(&self) -> bool;
}

// ============================================================================
// SEARCH PROVIDER
// ============================================================================

/// One search call against the external provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub num_results: u32,
    pub page: u32,
    /// Include scholarly results alongside patents.
    pub scholar: bool,
}

/// Raw provider record, before normalization. Field presence depends
/// on whether the provider classified the hit as a patent or a paper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSearchItem {
    pub title: String,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub publication_number: Option<String>,
    #[serde(default)]
    pub patent_id: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub is_scholar: bool,
}

/// Ranked result page returned by one provider call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Items in provider rank order (position 0 is rank 1).
    pub items: Vec<RawSearchItem>,
}

/// External patent/scholarly search provider.
#[async_trait]
pub trait SearchProvider: Capability {
    /// Execute one ranked search.
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, ProviderError>;

    /// Fetch full-text detail for one identifier. Returns the raw
    /// payload; shape validation is the caller's concern.
    async fn get_details(
        &self,
        identifier: &str,
        fields: &[&str],
    ) -> Result<serde_json::Value, ProviderError>;

    fn limits(&self) -> ProviderLimits;

    fn cost_estimate(&self, request: &SearchRequest) -> CostEstimate;
}

// ============================================================================
// LLM GATEWAY
// ============================================================================

/// LLM gateway for the two-stage novelty determination protocol.
#[async_trait]
pub trait LlmGateway: Capability {
    /// Stage 1: single call over the full candidate set.
    async fn assess(
        &self,
        summary: &SourceSummary,
        candidates: &[AssessmentCandidate],
    ) -> Result<StageOutcome, ProviderError>;

    /// Stage 2: follow-up call scoped to the ambiguous candidates.
    async fn resolve(
        &self,
        summary: &SourceSummary,
        ambiguous: &[AssessmentCandidate],
    ) -> Result<StageOutcome, ProviderError>;
}

// ============================================================================
// REPORT RENDERER
// ============================================================================

/// PDF report renderer. Invoked only after the report gate has passed;
/// returns the path or URL of the rendered document.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, assessment_id: AssessmentId) -> Result<String, ProviderError>;
}
