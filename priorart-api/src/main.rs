//! PriorArt API server binary.
//!
//! Composition root: reads configuration from the environment, builds
//! the providers, storage and ledger, wires them into the engine and
//! serves the router. Nothing below this file reads global state.

use priorart_api::{router, AppState};
use priorart_engine::{Config, PathReportRenderer, PriorArtEngine};
use priorart_providers::{
    HttpLlmGateway, HttpSearchProvider, LlmGateway, ProviderLimits, ProviderRegistry,
    ReportRenderer, SearchProvider,
};
use priorart_storage::{CreditLedger, InMemoryCreditLedger, InMemoryStorage, StorageTrait};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    let search_provider = HttpSearchProvider::new(
        env_or("PRIORART_SEARCH_URL", "https://serpapi.example/v1"),
        require_env("PRIORART_SEARCH_API_KEY")?,
        ProviderLimits {
            max_results_per_query: 100,
            min_request_interval_ms: 1_000,
            max_concurrent: 3,
        },
    )?;

    let llm_gateway = HttpLlmGateway::new(
        env_or("PRIORART_LLM_URL", "https://api.anthropic.com/v1"),
        require_env("PRIORART_LLM_API_KEY")?,
        env_or("PRIORART_LLM_MODEL", "claude-sonnet-4-20250514"),
    )?;

    let mut search: ProviderRegistry<dyn SearchProvider> = ProviderRegistry::new("search");
    search.register(0, Arc::new(search_provider));

    let mut llm: ProviderRegistry<dyn LlmGateway> = ProviderRegistry::new("llm");
    llm.register(0, Arc::new(llm_gateway));

    let renderer = PathReportRenderer::new(env_or("PRIORART_REPORT_DIR", "/var/lib/priorart/reports"));

    let engine = PriorArtEngine::new(
        config,
        Arc::new(InMemoryStorage::new()) as Arc<dyn StorageTrait>,
        Arc::new(InMemoryCreditLedger::new()) as Arc<dyn CreditLedger>,
        search,
        llm,
        Arc::new(renderer) as Arc<dyn ReportRenderer>,
    );

    let app = router(AppState::new(Arc::new(engine)));

    let addr = env_or("PRIORART_BIND", "0.0.0.0:8080");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "priorart-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn require_env(key: &str) -> Result<String, Box<dyn std::error::Error>> {
    std::env::var(key).map_err(|_| format!("{key} must be set").into())
}
