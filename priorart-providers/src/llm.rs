//! HTTP LLM gateway for the two-stage novelty determination protocol

use crate::{Capability, LlmGateway, RateLimitedClient};
use async_trait::async_trait;
use priorart_core::{
    AssessmentCandidate, CandidateReasoning, ConfidenceLevel, Determination, ProviderError,
    SourceSummary, StageOutcome,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const STAGE1_SYSTEM_PROMPT: &str = "You are a patent novelty examiner. Compare the invention \
summary against the candidate prior-art set and decide whether the invention is novel. \
Respond with a single JSON object: {\"determination\": \"NOVEL\"|\"NOT_NOVEL\"|\"DOUBT\", \
\"confidence\": \"LOW\"|\"MEDIUM\"|\"HIGH\", \"candidates\": [{\"identifier\", \"relevance\" \
(0.0-1.0), \"reasoning\", \"ambiguous\" (bool)}], \"novel_aspects\": [...], \
\"non_novel_aspects\": [...], \"remarks\"}. Mark a candidate ambiguous when you cannot decide \
whether it anticipates the invention.";

const STAGE2_SYSTEM_PROMPT: &str = "You are a patent novelty examiner resolving an ambiguous \
first-pass determination. Only the candidates you previously marked ambiguous are provided. \
Reach a final determination if at all possible. Respond with the same JSON object shape as \
before; answer DOUBT only if the evidence genuinely cannot support NOVEL or NOT_NOVEL.";

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct MessageRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct StageOutcomeWire {
    determination: Determination,
    confidence: ConfidenceLevel,
    #[serde(default)]
    candidates: Vec<CandidateWire>,
    #[serde(default)]
    novel_aspects: Vec<String>,
    #[serde(default)]
    non_novel_aspects: Vec<String>,
    #[serde(default)]
    remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateWire {
    identifier: String,
    #[serde(default)]
    relevance: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    ambiguous: bool,
}

// ============================================================================
// GATEWAY
// ============================================================================

/// LLM gateway over a messages-style JSON API.
#[derive(Debug)]
pub struct HttpLlmGateway {
    client: RateLimitedClient,
    model: String,
    max_tokens: u32,
    healthy: AtomicBool,
}

impl HttpLlmGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = RateLimitedClient::new(
            "llm-gateway",
            base_url,
            api_key,
            Duration::from_millis(1_200),
            1,
            Duration::from_secs(120),
        )?;

        Ok(Self {
            client,
            model: model.into(),
            max_tokens: 4_096,
            healthy: AtomicBool::new(true),
        })
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    async fn call_stage(
        &self,
        system: &str,
        user_content: String,
    ) -> Result<StageOutcome, ProviderError> {
        let request = MessageRequest {
            model: self.model.clone(),
            system: Some(system.to_string()),
            messages: vec![Message { role: "user".to_string(), content: user_content }],
            max_tokens: self.max_tokens,
            temperature: Some(0.2),
        };

        let response: MessageResponse = self.client.post_json("messages", &request).await?;
        let text = response
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text,
            })
            .collect::<Vec<_>>()
            .join("\n");

        parse_stage_outcome(self.provider_id(), &text)
    }
}

impl Capability for HttpLlmGateway {
    fn provider_id(&self) -> &str {
        self.client.provider_id()
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LlmGateway for HttpLlmGateway {
    async fn assess(
        &self,
        summary: &SourceSummary,
        candidates: &[AssessmentCandidate],
    ) -> Result<StageOutcome, ProviderError> {
        self.call_stage(STAGE1_SYSTEM_PROMPT, build_user_content(summary, candidates)).await
    }

    async fn resolve(
        &self,
        summary: &SourceSummary,
        ambiguous: &[AssessmentCandidate],
    ) -> Result<StageOutcome, ProviderError> {
        self.call_stage(STAGE2_SYSTEM_PROMPT, build_user_content(summary, ambiguous)).await
    }
}

/// Render the invention summary and candidate set into the user turn.
fn build_user_content(summary: &SourceSummary, candidates: &[AssessmentCandidate]) -> String {
    let mut content = format!(
        "INVENTION\nTitle: {}\nProblem: {}\nSolution: {}\n\nCANDIDATES\n",
        summary.title, summary.problem, summary.solution
    );

    for candidate in candidates {
        let found_in: Vec<&str> = candidate.found_in.iter().map(|l| l.as_str()).collect();
        content.push_str(&format!(
            "- identifier: {}\n  title: {}\n  abstract: {}\n  relevance: {:.3}\n  found_in: {}\n  intersection: {:?}\n",
            candidate.identifier,
            candidate.title,
            candidate.abstract_text.as_deref().unwrap_or("(none)"),
            candidate.relevance,
            found_in.join(","),
            candidate.intersection,
        ));
    }

    content
}

/// Parse the model's JSON determination out of its text response.
/// Tolerates surrounding prose and Markdown code fences.
pub fn parse_stage_outcome(provider: &str, text: &str) -> Result<StageOutcome, ProviderError> {
    let json_slice = extract_json_object(text).ok_or_else(|| ProviderError::InvalidResponse {
        provider: provider.to_string(),
        reason: "response contains no JSON object".to_string(),
    })?;

    let wire: StageOutcomeWire =
        serde_json::from_str(json_slice).map_err(|e| ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: format!("determination JSON does not match expected shape: {e}"),
        })?;

    Ok(StageOutcome {
        determination: wire.determination,
        confidence: wire.confidence,
        candidate_reasoning: wire
            .candidates
            .into_iter()
            .map(|c| CandidateReasoning {
                identifier: c.identifier,
                relevance: c.relevance,
                reasoning: c.reasoning,
                ambiguous: c.ambiguous,
            })
            .collect(),
        novel_aspects: wire.novel_aspects,
        non_novel_aspects: wire.non_novel_aspects,
        remarks: wire.remarks,
    })
}

/// Slice out the first balanced top-level JSON object.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_determination() {
        let text = r#"Here is my analysis.

```json
{
  "determination": "DOUBT",
  "confidence": "MEDIUM",
  "candidates": [
    { "identifier": "US1234567B2", "relevance": 0.8, "reasoning": "close overlap", "ambiguous": true }
  ],
  "novel_aspects": ["phase-change loop"],
  "non_novel_aspects": [],
  "remarks": "claim 3 needs full text"
}
```"#;
        let outcome = parse_stage_outcome("llm-gateway", text).expect("parse failed");
        assert_eq!(outcome.determination, Determination::Doubt);
        assert_eq!(outcome.confidence, ConfidenceLevel::Medium);
        assert_eq!(outcome.candidate_reasoning.len(), 1);
        assert!(outcome.candidate_reasoning[0].ambiguous);
        assert_eq!(outcome.novel_aspects, vec!["phase-change loop".to_string()]);
    }

    #[test]
    fn rejects_response_without_json() {
        assert!(parse_stage_outcome("llm-gateway", "I cannot answer that.").is_err());
    }

    #[test]
    fn rejects_unknown_determination() {
        let text = r#"{ "determination": "MAYBE", "confidence": "LOW" }"#;
        assert!(parse_stage_outcome("llm-gateway", text).is_err());
    }

    #[test]
    fn extracts_balanced_object_with_nested_braces() {
        let text = r#"noise { "a": { "b": "}" } } trailing"#;
        let slice = extract_json_object(text).expect("no object found");
        assert_eq!(slice, r#"{ "a": { "b": "}" } }"#);
    }
}
