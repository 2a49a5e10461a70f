//! Enum types for PriorArt entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// BUNDLE ENUMS
// ============================================================================

/// Lifecycle status of a search bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BundleStatus {
    Draft,
    ReadyForReview,
    Approved,
    Archived,
}

/// Label of a query variant within a bundle.
///
/// Every bundle carries exactly one variant per label. The order
/// Broad, Baseline, Narrow is the canonical iteration order used by
/// the executor and the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantLabel {
    Broad,
    Baseline,
    Narrow,
}

impl VariantLabel {
    /// All labels in canonical order.
    pub const ALL: [VariantLabel; 3] =
        [VariantLabel::Broad, VariantLabel::Baseline, VariantLabel::Narrow];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantLabel::Broad => "broad",
            VariantLabel::Baseline => "baseline",
            VariantLabel::Narrow => "narrow",
        }
    }
}

impl fmt::Display for VariantLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "broad" => Ok(VariantLabel::Broad),
            "baseline" => Ok(VariantLabel::Baseline),
            "narrow" => Ok(VariantLabel::Narrow),
            other => Err(format!("unknown variant label: {other}")),
        }
    }
}

// ============================================================================
// RUN ENUMS
// ============================================================================

/// Status of a search run. All states other than `Running` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Completed,
    CompletedWithWarnings,
    Failed,
    CreditExhausted,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    /// Whether a novelty assessment may be started against this run.
    pub fn assessment_allowed(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::CompletedWithWarnings)
    }
}

/// Outcome of one variant execution within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariantOutcome {
    Succeeded,
    Failed,
}

// ============================================================================
// RESULT ENUMS
// ============================================================================

/// Content type of a unified result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Patent,
    Scholar,
}

/// Classification of a result by how many variants surfaced it.
///
/// `None` is reserved for out-of-band items injected outside the
/// cross-variant aggregation (e.g. level-0 local checks). The
/// aggregator itself only ever emits I1/I2/I3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intersection {
    None,
    I1,
    I2,
    I3,
}

impl Intersection {
    /// Classify by the number of variants an item was found in (1..=3).
    pub fn from_count(count: usize) -> Option<Intersection> {
        match count {
            1 => Some(Intersection::I1),
            2 => Some(Intersection::I2),
            3 => Some(Intersection::I3),
            _ => None,
        }
    }

    /// Number of variants this classification represents.
    pub fn count(&self) -> usize {
        match self {
            Intersection::None => 0,
            Intersection::I1 => 1,
            Intersection::I2 => 2,
            Intersection::I3 => 3,
        }
    }

    /// Whether the item was found in more than one variant.
    pub fn is_multi(&self) -> bool {
        matches!(self, Intersection::I2 | Intersection::I3)
    }
}

/// Outcome of a detail fetch for a single shortlisted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchOutcome {
    Fetched,
    Failed,
    Skipped,
}

// ============================================================================
// ASSESSMENT ENUMS
// ============================================================================

/// Status of a novelty assessment run.
///
/// `Novel`, `NotNovel` and `DoubtResolved` are terminal and gate report
/// generation. `Doubt` is non-terminal: stage 2 may still resolve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    InProgress,
    Novel,
    NotNovel,
    Doubt,
    DoubtResolved,
}

impl AssessmentStatus {
    /// Whether report generation is permitted in this state.
    pub fn report_allowed(&self) -> bool {
        matches!(
            self,
            AssessmentStatus::Novel | AssessmentStatus::NotNovel | AssessmentStatus::DoubtResolved
        )
    }
}

/// Categorical determination produced by an assessment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Determination {
    Novel,
    NotNovel,
    Doubt,
}

/// Confidence level reported by the assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}
