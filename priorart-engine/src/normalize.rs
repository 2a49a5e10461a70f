//! Result normalization
//!
//! Collapses the provider's raw records into canonical records keyed
//! by a stable identifier. Patents use the publication number with all
//! separator noise stripped; scholarly items use the DOI when present,
//! otherwise a content hash of title and first author. Normalization
//! is idempotent: the same raw payload always yields the same
//! canonical identifier.

use priorart_core::ContentType;
use priorart_providers::RawSearchItem;
use sha2::{Digest, Sha256};

/// Canonical record derived from one raw provider item.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub identifier: String,
    pub content_type: ContentType,
    pub title: String,
    pub snippet: Option<String>,
    pub link: Option<String>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
    /// 1-based position within the variant's result list.
    pub rank: u32,
}

/// Normalize one variant's result page, preserving rank order. Items
/// whose identifier repeats within the page keep their first (best)
/// rank.
pub fn normalize_page(items: &[RawSearchItem]) -> Vec<NormalizedItem> {
    let mut seen = std::collections::HashSet::new();
    let mut normalized = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Some((identifier, content_type)) = identify(item) else {
            continue;
        };
        if !seen.insert(identifier.clone()) {
            continue;
        }
        normalized.push(NormalizedItem {
            identifier,
            content_type,
            title: item.title.clone(),
            snippet: item.snippet.clone(),
            link: item.link.clone(),
            authors: item.authors.clone(),
            doi: item.doi.clone(),
            rank: index as u32 + 1,
        });
    }

    normalized
}

fn identify(item: &RawSearchItem) -> Option<(String, ContentType)> {
    if !item.is_scholar {
        if let Some(raw) = item.publication_number.as_deref().or(item.patent_id.as_deref()) {
            let canonical = canonical_patent_id(raw);
            if !canonical.is_empty() {
                return Some((canonical, ContentType::Patent));
            }
        }
    }

    if item.is_scholar || item.doi.is_some() {
        return Some((scholar_identifier(item), ContentType::Scholar));
    }

    None
}

/// Canonical form of a patent identifier.
///
/// Accepts both bare publication numbers ("US-1234567-B2",
/// "US 1234567 B2") and provider path forms ("patent/US1234567B2/en"),
/// collapsing all of them to "US1234567B2".
pub fn canonical_patent_id(raw: &str) -> String {
    let mut candidate = raw.trim();

    if let Some(stripped) = candidate.strip_prefix("patent/") {
        candidate = stripped;
        if let Some(slash) = candidate.find('/') {
            candidate = &candidate[..slash];
        }
    }

    candidate
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Stable identifier for a scholarly item: the lower-cased DOI when
/// present, otherwise a hash of the normalized title and first author.
pub fn scholar_identifier(item: &RawSearchItem) -> String {
    if let Some(doi) = item.doi.as_deref() {
        let trimmed = doi.trim().trim_start_matches("https://doi.org/").to_lowercase();
        if !trimmed.is_empty() {
            return format!("DOI:{trimmed}");
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(normalize_text(&item.title));
    hasher.update(b"\x1f");
    if let Some(author) = item.authors.first() {
        hasher.update(normalize_text(author));
    }
    let digest = hasher.finalize();

    format!("SCH:{}", hex::encode(&digest[..12]))
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patent(raw_id: &str) -> RawSearchItem {
        RawSearchItem {
            title: "Heat pump".to_string(),
            publication_number: Some(raw_id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn id_formats_collapse_to_one_canonical_identifier() {
        for raw in ["US-1234567-B2", "US 1234567 B2", "us1234567b2", "patent/US1234567B2/en"] {
            assert_eq!(canonical_patent_id(raw), "US1234567B2", "raw form: {raw}");
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let items = vec![patent("US-1234567-B2")];
        let first = normalize_page(&items);
        let second = normalize_page(&items);
        assert_eq!(first, second);
        assert_eq!(first[0].identifier, "US1234567B2");
    }

    #[test]
    fn duplicate_encodings_keep_best_rank() {
        let items = vec![patent("US-1234567-B2"), patent("patent/US1234567B2/en")];
        let normalized = normalize_page(&items);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].rank, 1);
    }

    #[test]
    fn doi_wins_over_title_hash() {
        let item = RawSearchItem {
            title: "A survey".to_string(),
            doi: Some("https://doi.org/10.1000/XYZ".to_string()),
            is_scholar: true,
            ..Default::default()
        };
        assert_eq!(scholar_identifier(&item), "DOI:10.1000/xyz");
    }

    #[test]
    fn title_hash_is_stable_under_whitespace() {
        let a = RawSearchItem {
            title: "A   Survey of Heat Pumps".to_string(),
            authors: vec!["A. Author".to_string()],
            is_scholar: true,
            ..Default::default()
        };
        let b = RawSearchItem {
            title: "a survey of heat pumps".to_string(),
            authors: vec!["a. author".to_string()],
            is_scholar: true,
            ..Default::default()
        };
        assert_eq!(scholar_identifier(&a), scholar_identifier(&b));
    }

    #[test]
    fn items_without_identity_are_dropped() {
        let item = RawSearchItem { title: "No ids at all".to_string(), ..Default::default() };
        assert!(normalize_page(&[item]).is_empty());
    }

    #[test]
    fn ranks_are_one_based_in_page_order() {
        let items = vec![patent("US-1-A1"), patent("US-2-A1"), patent("US-3-A1")];
        let normalized = normalize_page(&items);
        let ranks: Vec<u32> = normalized.iter().map(|n| n.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }
}
