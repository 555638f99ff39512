use crate::models::{AnalysisResult, Finding};

/// Buckets findings by issue type, preserving arrival order within each bucket.
/// Unrecognized types land in `inconsistencies`.
pub fn group(findings: Vec<Finding>) -> AnalysisResult {
    let mut result = AnalysisResult::default();
    for finding in findings {
        result.get_mut(finding.issue_type.category()).push(finding);
    }
    result
}
