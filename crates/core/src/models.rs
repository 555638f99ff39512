//! Domain types shared by the index, the analyzers and the caller-facing results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Defect class of a known-bad excerpt or a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    WeakKpi,
    ScopeCreep,
    MissingElement,
    RedFlag,
    DeliverableIssue,
    #[default]
    Other,
}

impl IssueType {
    /// Lenient parse of judge output; anything unrecognized is `Other`.
    pub fn coerce(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return IssueType::Other;
        };
        match raw.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "weak_kpi" | "weak_kpis" => IssueType::WeakKpi,
            "scope_creep" => IssueType::ScopeCreep,
            "missing_element" | "missing_elements" => IssueType::MissingElement,
            "red_flag" | "red_flags" => IssueType::RedFlag,
            "deliverable_issue" | "deliverable_issues" => IssueType::DeliverableIssue,
            _ => IssueType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::WeakKpi => "weak_kpi",
            IssueType::ScopeCreep => "scope_creep",
            IssueType::MissingElement => "missing_element",
            IssueType::RedFlag => "red_flag",
            IssueType::DeliverableIssue => "deliverable_issue",
            IssueType::Other => "other",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            IssueType::WeakKpi => Category::WeakKpis,
            IssueType::ScopeCreep => Category::ScopeCreep,
            IssueType::MissingElement => Category::MissingElements,
            IssueType::RedFlag => Category::RedFlags,
            IssueType::DeliverableIssue => Category::DeliverableIssues,
            IssueType::Other => Category::Inconsistencies,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-level rating used for both finding severity and overlap confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Low,
    Medium,
    High,
}

pub type Severity = Level;
pub type Confidence = Level;

impl Level {
    /// Case-insensitive parse; `None` for anything outside HIGH/MEDIUM/LOW.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "HIGH" => Some(Level::High),
            "MEDIUM" | "MED" => Some(Level::Medium),
            "LOW" => Some(Level::Low),
            _ => None,
        }
    }

    pub fn coerce(raw: Option<&str>, fallback: Level) -> Self {
        raw.and_then(Level::parse).unwrap_or(fallback)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::High => "HIGH",
            Level::Medium => "MEDIUM",
            Level::Low => "LOW",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six fixed result buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    WeakKpis,
    ScopeCreep,
    MissingElements,
    RedFlags,
    DeliverableIssues,
    Inconsistencies,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::WeakKpis,
        Category::ScopeCreep,
        Category::MissingElements,
        Category::RedFlags,
        Category::DeliverableIssues,
        Category::Inconsistencies,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::WeakKpis => "weak_kpis",
            Category::ScopeCreep => "scope_creep",
            Category::MissingElements => "missing_elements",
            Category::RedFlags => "red_flags",
            Category::DeliverableIssues => "deliverable_issues",
            Category::Inconsistencies => "inconsistencies",
        }
    }
}

/// One curated example as it appears in the example collection file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExample {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub problematic_section: String,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub actual_outcome: String,
    #[serde(default)]
    pub estimated_cost: String,
    #[serde(default)]
    pub correct_version: String,
    #[serde(default)]
    pub contract_source: String,
}

impl RawExample {
    /// Stable id: the declared one, else a content hash of the excerpt.
    pub fn resolved_id(&self) -> String {
        match &self.id {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                let digest = blake3::hash(self.problematic_section.as_bytes()).to_hex();
                format!("example_{}", &digest.as_str()[..16])
            }
        }
    }
}

/// Indexed known-bad excerpt. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub id: String,
    pub text: String,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub explanation: String,
    pub actual_outcome: String,
    pub estimated_cost: String,
    pub correct_version: String,
    pub contract_source: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl PatternEntry {
    pub fn from_example(example: &RawExample, embedding: Vec<f32>) -> Self {
        Self {
            id: example.resolved_id(),
            text: example.problematic_section.clone(),
            issue_type: IssueType::coerce(example.issue_type.as_deref()),
            severity: Severity::coerce(example.severity.as_deref(), Level::Medium),
            explanation: example.explanation.clone(),
            actual_outcome: example.actual_outcome.clone(),
            estimated_cost: example.estimated_cost.clone(),
            correct_version: example.correct_version.clone(),
            contract_source: example.contract_source.clone(),
            embedding,
        }
    }
}

/// Word-bounded slice of a document; lives for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub ordinal: usize,
    pub text: String,
    pub source_document_id: String,
}

/// Index hit. `similarity_score` is in [0, 1], 1 meaning identical direction.
#[derive(Debug, Clone)]
pub struct SimilarityMatch {
    pub pattern: Arc<PatternEntry>,
    pub similarity_score: f32,
}

/// Best index hit attached to a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedExample {
    #[serde(default)]
    pub pattern_id: Option<String>,
    pub contract_source: String,
    pub similarity_score: f32,
    pub actual_outcome: String,
    pub estimated_cost: String,
    #[serde(default)]
    pub correct_version: String,
}

impl From<&SimilarityMatch> for MatchedExample {
    fn from(m: &SimilarityMatch) -> Self {
        Self {
            pattern_id: Some(m.pattern.id.clone()),
            contract_source: m.pattern.contract_source.clone(),
            similarity_score: m.similarity_score,
            actual_outcome: m.pattern.actual_outcome.clone(),
            estimated_cost: m.pattern.estimated_cost.clone(),
            correct_version: m.pattern.correct_version.clone(),
        }
    }
}

/// A single flagged issue, serialized in the caller-facing shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(skip)]
    pub issue_type: IssueType,
    pub severity: Severity,
    #[serde(rename = "issue")]
    pub explanation: String,
    #[serde(rename = "text")]
    pub quoted_text: String,
    pub location: String,
    pub matched_example: Option<MatchedExample>,
    #[serde(default)]
    pub remediation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
}

/// Six fixed categories, each an ordered list of findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub weak_kpis: Vec<Finding>,
    #[serde(default)]
    pub scope_creep: Vec<Finding>,
    #[serde(default)]
    pub missing_elements: Vec<Finding>,
    #[serde(default)]
    pub red_flags: Vec<Finding>,
    #[serde(default)]
    pub deliverable_issues: Vec<Finding>,
    #[serde(default)]
    pub inconsistencies: Vec<Finding>,
}

impl AnalysisResult {
    pub fn get(&self, category: Category) -> &[Finding] {
        match category {
            Category::WeakKpis => &self.weak_kpis,
            Category::ScopeCreep => &self.scope_creep,
            Category::MissingElements => &self.missing_elements,
            Category::RedFlags => &self.red_flags,
            Category::DeliverableIssues => &self.deliverable_issues,
            Category::Inconsistencies => &self.inconsistencies,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Vec<Finding> {
        match category {
            Category::WeakKpis => &mut self.weak_kpis,
            Category::ScopeCreep => &mut self.scope_creep,
            Category::MissingElements => &mut self.missing_elements,
            Category::RedFlags => &mut self.red_flags,
            Category::DeliverableIssues => &mut self.deliverable_issues,
            Category::Inconsistencies => &mut self.inconsistencies,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[Finding])> {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn total(&self) -> usize {
        self.iter().map(|(_, f)| f.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// (high, medium, low) counts across every category.
    pub fn severity_counts(&self) -> (usize, usize, usize) {
        self.iter()
            .flat_map(|(_, f)| f.iter())
            .fold((0, 0, 0), |(h, m, l), f| match f.severity {
                Level::High => (h + 1, m, l),
                Level::Medium => (h, m + 1, l),
                Level::Low => (h, m, l + 1),
            })
    }
}

/// Redundancy estimate for one document pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapResult {
    pub sow_1_filename: String,
    pub sow_2_filename: String,
    pub overlap_percentage: f64,
    pub explanation: String,
    pub overlapping_areas: Vec<String>,
    pub confidence: Confidence,
    pub budget_1: Option<f64>,
    pub budget_2: Option<f64>,
    pub max_budget: Option<f64>,
    pub redundant_spend: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
