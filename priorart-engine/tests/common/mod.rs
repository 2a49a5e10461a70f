//! Shared harness: engine wired to in-memory storage, an in-memory
//! ledger and scripted mock providers.

#![allow(dead_code)]

use priorart_core::{RunId, UserId};
use priorart_engine::{Config, PriorArtEngine, RunStatusPayload};
use priorart_providers::{LlmGateway, ProviderRegistry, ReportRenderer, SearchProvider};
use priorart_storage::{CreditLedger, StorageTrait};
use priorart_test_utils::{
    InMemoryCreditLedger, InMemoryStorage, MockLlmGateway, MockReportRenderer, MockSearchProvider,
};
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub engine: PriorArtEngine,
    pub storage: Arc<InMemoryStorage>,
    pub ledger: Arc<InMemoryCreditLedger>,
    pub search: Arc<MockSearchProvider>,
    pub llm: Arc<MockLlmGateway>,
    pub renderer: Arc<MockReportRenderer>,
    pub user: UserId,
}

/// Defaults with all sleeps zeroed and the detail fetcher off; tests
/// that exercise detail fetching opt back in.
pub fn test_config() -> Config {
    Config {
        retry_backoff_ms: 0,
        detail_fetch_delay_ms: 0,
        fetch_details: false,
        run_timeout_secs: 30,
        ..Config::default()
    }
}

pub fn harness(search: MockSearchProvider, llm: MockLlmGateway) -> Harness {
    harness_with(test_config(), search, llm)
}

pub fn harness_with(config: Config, search: MockSearchProvider, llm: MockLlmGateway) -> Harness {
    let storage = Arc::new(InMemoryStorage::new());
    let ledger = Arc::new(InMemoryCreditLedger::new());
    let search = Arc::new(search);
    let llm = Arc::new(llm);
    let renderer = Arc::new(MockReportRenderer::new());

    let user = priorart_core::new_entity_id();
    ledger.grant(user, 10);

    let mut search_registry: ProviderRegistry<dyn SearchProvider> =
        ProviderRegistry::new("search");
    search_registry.register(0, Arc::clone(&search) as Arc<dyn SearchProvider>);

    let mut llm_registry: ProviderRegistry<dyn LlmGateway> = ProviderRegistry::new("llm");
    llm_registry.register(0, Arc::clone(&llm) as Arc<dyn LlmGateway>);

    let engine = PriorArtEngine::new(
        config,
        Arc::clone(&storage) as Arc<dyn StorageTrait>,
        Arc::clone(&ledger) as Arc<dyn CreditLedger>,
        search_registry,
        llm_registry,
        Arc::clone(&renderer) as Arc<dyn ReportRenderer>,
    );

    Harness { engine, storage, ledger, search, llm, renderer, user }
}

/// Poll until the detached run task finishes.
pub async fn wait_terminal(harness: &Harness, run_id: RunId) -> RunStatusPayload {
    for _ in 0..1_000 {
        let payload = harness.engine.run_status(harness.user, run_id).expect("run readable");
        if payload.status.is_terminal() {
            return payload;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("run {run_id} did not reach a terminal state");
}
