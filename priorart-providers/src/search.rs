//! HTTP search provider client

use crate::{
    Capability, CostEstimate, ProviderLimits, RateLimitedClient, RawSearchItem, SearchPage,
    SearchProvider, SearchRequest,
};
use async_trait::async_trait;
use priorart_core::ProviderError;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Patent/scholarly search provider over a JSON HTTP API.
#[derive(Debug)]
pub struct HttpSearchProvider {
    client: RateLimitedClient,
    healthy: AtomicBool,
    limits: ProviderLimits,
    cost_per_call_usd: f64,
}

impl HttpSearchProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        limits: ProviderLimits,
    ) -> Result<Self, ProviderError> {
        let client = RateLimitedClient::new(
            "patent-search",
            base_url,
            api_key,
            Duration::from_millis(limits.min_request_interval_ms),
            limits.max_concurrent as usize,
            Duration::from_secs(30),
        )?;

        Ok(Self {
            client,
            healthy: AtomicBool::new(true),
            limits,
            cost_per_call_usd: 0.01,
        })
    }

    /// Mark the provider unhealthy so the registry routes around it.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }
}

impl Capability for HttpSearchProvider {
    fn provider_id(&self) -> &str {
        self.client.provider_id()
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, ProviderError> {
        let num = request.num_results.min(self.limits.max_results_per_query);
        let mut query = vec![
            ("q", request.query.clone()),
            ("num", num.to_string()),
            ("page", request.page.to_string()),
        ];
        if request.scholar {
            query.push(("include_scholar", "true".to_string()));
        }

        let json: Value = self.client.get_json("search", &query).await?;
        let items = parse_search_response(self.provider_id(), &json)?;

        Ok(SearchPage { items })
    }

    async fn get_details(
        &self,
        identifier: &str,
        fields: &[&str],
    ) -> Result<Value, ProviderError> {
        let query = vec![("id", identifier.to_string()), ("fields", fields.join(","))];
        let json: Value = self.client.get_json("patent/details", &query).await?;

        if !json.is_object() {
            return Err(ProviderError::InvalidResponse {
                provider: self.provider_id().to_string(),
                reason: "detail payload is not an object".to_string(),
            });
        }

        Ok(json)
    }

    fn limits(&self) -> ProviderLimits {
        self.limits
    }

    fn cost_estimate(&self, _request: &SearchRequest) -> CostEstimate {
        CostEstimate { api_calls: 1, estimated_cost_usd: self.cost_per_call_usd }
    }
}

/// Parse a ranked result page out of the provider payload.
///
/// The provider nests hits under `organic_results`; some deployments
/// use `results`. Items missing a title are dropped rather than
/// failing the page.
pub fn parse_search_response(
    provider: &str,
    json: &Value,
) -> Result<Vec<RawSearchItem>, ProviderError> {
    let results = json
        .get("organic_results")
        .or_else(|| json.get("results"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: "response is missing results array".to_string(),
        })?;

    let mut items = Vec::with_capacity(results.len());

    for entry in results {
        let Some(title) = entry.get("title").and_then(|v| v.as_str()) else {
            continue;
        };

        let authors = entry
            .get("authors")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|a| {
                        a.as_str()
                            .map(str::to_string)
                            .or_else(|| a.get("name")?.as_str().map(str::to_string))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let doi = entry.get("doi").and_then(|v| v.as_str()).map(str::to_string);
        let is_scholar = entry.get("result_type").and_then(|v| v.as_str()) == Some("scholar")
            || doi.is_some();

        items.push(RawSearchItem {
            title: title.to_string(),
            snippet: entry.get("snippet").and_then(|v| v.as_str()).map(str::to_string),
            link: entry.get("link").and_then(|v| v.as_str()).map(str::to_string),
            publication_number: entry
                .get("publication_number")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            patent_id: entry.get("patent_id").and_then(|v| v.as_str()).map(str::to_string),
            doi,
            authors,
            is_scholar,
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_organic_results_in_rank_order() {
        let json = serde_json::json!({
            "organic_results": [
                { "title": "Heat pump", "publication_number": "US-1234567-B2", "snippet": "..." },
                { "title": "Compressor", "patent_id": "patent/US7654321B1/en" }
            ]
        });
        let items = parse_search_response("patent-search", &json).expect("parse failed");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Heat pump");
        assert_eq!(items[0].publication_number.as_deref(), Some("US-1234567-B2"));
        assert_eq!(items[1].patent_id.as_deref(), Some("patent/US7654321B1/en"));
    }

    #[test]
    fn flags_scholar_items_by_doi() {
        let json = serde_json::json!({
            "results": [
                { "title": "A survey", "doi": "10.1000/xyz", "authors": [{ "name": "A. Author" }] }
            ]
        });
        let items = parse_search_response("patent-search", &json).expect("parse failed");
        assert!(items[0].is_scholar);
        assert_eq!(items[0].authors, vec!["A. Author".to_string()]);
    }

    #[test]
    fn missing_results_array_is_an_error() {
        let json = serde_json::json!({ "message": "rate limited" });
        assert!(parse_search_response("patent-search", &json).is_err());
    }

    #[test]
    fn untitled_items_are_dropped_not_fatal() {
        let json = serde_json::json!({
            "organic_results": [
                { "snippet": "no title here" },
                { "title": "Valid" }
            ]
        });
        let items = parse_search_response("patent-search", &json).expect("parse failed");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Valid");
    }
}
