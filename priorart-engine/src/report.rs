//! Report gating
//!
//! A PDF report may only be generated once the assessment has reached a
//! terminal determination. Report URLs are computed lazily and omitted
//! for non-terminal states; the renderer itself is an external
//! collaborator invoked strictly post-gate.

use async_trait::async_trait;
use priorart_core::{AssessmentId, NoveltyAssessmentRun, ProviderError, StateError};
use priorart_providers::ReportRenderer;

/// Gate check. Errors with the assessment's current state when the
/// determination is not terminal.
pub fn ensure_report_allowed(assessment: &NoveltyAssessmentRun) -> Result<(), StateError> {
    if assessment.status.report_allowed() {
        Ok(())
    } else {
        Err(StateError::ReportNotAvailable {
            assessment_id: assessment.assessment_id,
            status: assessment.status,
        })
    }
}

/// Lazily computed report URL for status payloads: present only once
/// the gate would pass, without invoking the renderer.
pub fn report_url_for(assessment: &NoveltyAssessmentRun) -> Option<String> {
    assessment
        .status
        .report_allowed()
        .then(|| format!("/api/v1/runs/{}/report", assessment.run_id))
}

/// Renderer stub that maps assessments to paths under a base directory.
/// Deployments swap in a real PDF renderer behind the same trait.
#[derive(Debug, Clone)]
pub struct PathReportRenderer {
    base_dir: String,
}

impl PathReportRenderer {
    pub fn new(base_dir: impl Into<String>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

#[async_trait]
impl ReportRenderer for PathReportRenderer {
    async fn render(&self, assessment_id: AssessmentId) -> Result<String, ProviderError> {
        Ok(format!("{}/{assessment_id}.pdf", self.base_dir))
    }
}
