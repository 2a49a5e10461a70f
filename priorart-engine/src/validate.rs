//! Bundle validation
//!
//! Hard structural checks gate approval atomically: either every check
//! passes or the bundle is rejected with the full itemized error list.
//! The soft guardrail pass is separate and only ever produces warnings.

use crate::Config;
use once_cell::sync::Lazy;
use priorart_core::{Bundle, ValidationError, VariantLabel};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of the hard validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleValidation {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Non-blocking guardrail finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailWarning {
    pub code: GuardrailCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardrailCode {
    TooManyQuotedPhrases,
    TooFewOrGroups,
    AmbiguousTermWithoutContext,
}

static QUOTED_PHRASE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]+""#).expect("static regex"));
static OR_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\bOR\b[^)]*\)").expect("static regex"));

/// Terms that commonly mean something different outside this domain,
/// with the context terms that disambiguate them.
static AMBIGUOUS_TERMS: &[(&str, &[&str])] = &[
    ("cell", &["battery", "fuel", "electrochemical", "solar", "biological"]),
    ("terminal", &["electrical", "battery", "connector", "airport"]),
    ("bridge", &["circuit", "rectifier", "network", "structural"]),
    ("driver", &["circuit", "motor", "gate", "display"]),
    ("plant", &["power", "industrial", "processing", "chemical"]),
];

/// Hard validation. Pure; no side effects.
pub fn validate_bundle(bundle: &Bundle, config: &Config) -> BundleValidation {
    let mut errors = Vec::new();

    if bundle.source_summary.title.trim().is_empty() {
        errors.push(ValidationError::RequiredFieldMissing {
            field: "source_summary.title".to_string(),
        });
    }

    if bundle.core_concepts.is_empty() {
        errors.push(ValidationError::InvalidValue {
            field: "core_concepts".to_string(),
            reason: "must be a non-empty list".to_string(),
        });
    }

    check_variant_set(bundle, &mut errors);

    for variant in &bundle.query_variants {
        let len = variant.query.chars().count();
        if len > config.max_query_chars {
            errors.push(ValidationError::QueryTooLong {
                label: variant.label.to_string(),
                max: config.max_query_chars,
                actual: len,
            });
        }
    }

    if !bundle.sensitive_tokens.is_empty() {
        errors.push(ValidationError::SensitiveTokens { tokens: bundle.sensitive_tokens.clone() });
    }

    BundleValidation { valid: errors.is_empty(), errors }
}

fn check_variant_set(bundle: &Bundle, errors: &mut Vec<ValidationError>) {
    if bundle.query_variants.len() != 3 {
        errors.push(ValidationError::BadVariantSet {
            reason: format!("expected 3 variants, found {}", bundle.query_variants.len()),
        });
        return;
    }

    let labels: Vec<VariantLabel> = bundle.query_variants.iter().map(|v| v.label).collect();
    let unique: BTreeSet<VariantLabel> = labels.iter().copied().collect();

    if unique.len() != labels.len() {
        errors.push(ValidationError::BadVariantSet {
            reason: "duplicate variant labels".to_string(),
        });
    } else if unique.len() != VariantLabel::ALL.len() {
        errors.push(ValidationError::BadVariantSet {
            reason: "labels must be exactly broad, baseline, narrow".to_string(),
        });
    }
}

/// Soft guardrail pass. Warnings only; approval never fails on these.
pub fn guardrail_warnings(bundle: &Bundle) -> Vec<GuardrailWarning> {
    let mut warnings = Vec::new();

    for variant in &bundle.query_variants {
        let quoted = QUOTED_PHRASE.find_iter(&variant.query).count();
        if quoted > 2 {
            warnings.push(GuardrailWarning {
                code: GuardrailCode::TooManyQuotedPhrases,
                message: format!(
                    "variant '{}' has {} quoted phrases; more than 2 over-constrains recall",
                    variant.label, quoted
                ),
            });
        }
    }

    let or_groups: usize =
        bundle.query_variants.iter().map(|v| OR_GROUP.find_iter(&v.query).count()).sum();
    if or_groups < 2 {
        warnings.push(GuardrailWarning {
            code: GuardrailCode::TooFewOrGroups,
            message: format!(
                "bundle has {or_groups} OR-group(s) across variants; fewer than 2 narrows synonym coverage"
            ),
        });
    }

    for variant in &bundle.query_variants {
        let lowered = variant.query.to_lowercase();
        for (term, context_terms) in AMBIGUOUS_TERMS {
            if contains_word(&lowered, term)
                && !context_terms.iter().any(|ctx| lowered.contains(ctx))
            {
                warnings.push(GuardrailWarning {
                    code: GuardrailCode::AmbiguousTermWithoutContext,
                    message: format!(
                        "variant '{}' uses ambiguous term '{}' without a context term",
                        variant.label, term
                    ),
                });
            }
        }
    }

    warnings
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.split(|c: char| !c.is_alphanumeric()).any(|token| token == word)
}
