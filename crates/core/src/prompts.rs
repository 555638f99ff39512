//! Prompt templates. Placeholders are `{name}` and filled with `str::replace`,
//! so document text containing braces is passed through untouched.

use crate::models::SimilarityMatch;

pub const VALIDATION_PROMPT: &str = r#"You are an experienced government contract auditor reviewing one section of an uploaded Statement of Work (SOW) for problematic language.

Below are excerpts from REAL government contracts that led to cost overruns, retrieved because they resemble this section.

<uploaded_sow_section>
{sow_section}
</uploaded_sow_section>

<similar_patterns_from_real_contracts>
{similar_patterns}
</similar_patterns_from_real_contracts>

Decide whether the uploaded section has the SAME TYPE of defect as the real examples.

Flag it only when BOTH hold:
1. The section uses language similar to the problematic examples (for example "full range", "all resources", "ample time", "best efforts", "periodically").
2. That language is unbounded or vague, with no qualification.

Do NOT flag it when:
- The phrase is immediately followed by a defining subsection, a numeric bound, or a cross-reference (e.g. "as defined in Section 5").
- Clear limits are stated (budget ceilings, task orders, specific deliverables).
- It is standard IDIQ boilerplate that is properly scoped.
- Subsections right after the phrase enumerate the scope.

Examples:
- "full range of support that may be required from time to time" -> FLAG (unbounded)
- "full range of services as defined in individual task orders per Section 5.1-5.6" -> DO NOT FLAG (bounded)
- "ample time" -> FLAG (no minimum)
- "minimum 10 business days notice" -> DO NOT FLAG (specific)

Return ONLY valid JSON, no other text:

{
  "has_issue": true or false,
  "issue_type": "weak_kpi|scope_creep|missing_element|red_flag|deliverable_issue|other",
  "severity": "HIGH|MEDIUM|LOW",
  "explanation": "1-2 sentences on how this mirrors the real example",
  "problematic_text": "exact quote from the uploaded SOW",
  "location": "section reference if available",
  "matched_example": {
    "contract_source": "string",
    "similarity_score": 0.0,
    "actual_outcome": "string",
    "estimated_cost": "string"
  },
  "remediation": "specific fix in 1-2 sentences"
}

If the section does NOT have the same issue, return: {"has_issue": false}
"#;

pub const OVERLAP_PROMPT: &str = r#"You are comparing two government contract Statements of Work (SOWs) for overlapping or redundant work.

<SOW_1_METADATA>
Filename: {filename_1}
</SOW_1_METADATA>

<SOW_1_TEXT>
{sow_text_1}
</SOW_1_TEXT>

<SOW_2_METADATA>
Filename: {filename_2}
</SOW_2_METADATA>

<SOW_2_TEXT>
{sow_text_2}
</SOW_2_TEXT>

Review the tasks, deliverables and scope of both SOWs and estimate what percentage of the work overlaps. Consider:
- Similar tasks or deliverables described in different words
- Duplicate services or functions
- Shared technical requirements
- Overlapping personnel roles or responsibilities

Return ONLY valid JSON, no other text:

{
  "overlap_percentage": 0-100,
  "explanation": "2-3 sentence summary of what overlaps",
  "overlapping_areas": ["Area 1", "Area 2"],
  "confidence": "HIGH|MEDIUM|LOW"
}

If overlap is minimal (under 15%), report the actual low value and say why.
"#;

pub const BASIC_ANALYSIS_PROMPT: &str = r#"You are a government procurement analyst reviewing a contract SOW for risks and weaknesses.

<sow_data>
{sow_data}
</sow_data>

Look for:
1. WEAK OR UNMEASURABLE KPIs: missing baseline, target, timeframe or measurement method; vague words such as "enhance", "optimize", "acceptable".
2. SCOPE CREEP LANGUAGE: "as needed", "as directed", "best effort", "including but not limited to", "and related tasks", support without stated limits.
3. MISSING CRITICAL ELEMENTS: acceptance criteria, assumptions, roles and responsibilities, government furnished resources, out-of-scope statement, progress reporting, contractor project manager.
4. INTERNAL INCONSISTENCIES: objectives without tasks, deliverables not tied to an objective, unrealistic dates, reporting without frequency or format.
5. DELIVERABLE QUALITY ISSUES: vague outputs, missing format, due dates or acceptance criteria.
6. RED FLAGS: no project management task, no final report, no kick-off meeting, unspecified progress reports, no key personnel, unclear security requirements.

Keep every description to 1-2 sentences. Use only straight double quotes for JSON and single quotes inside string values.

Return ONLY valid JSON with this structure:

{
  "weak_kpis": [{"text": "string", "location": "string", "severity": "HIGH|MEDIUM|LOW", "missing": ["baseline"], "issue": "string"}],
  "scope_creep": [{"text": "string", "location": "string", "severity": "HIGH|MEDIUM|LOW", "issue": "string"}],
  "missing_elements": [{"element": "string", "severity": "HIGH|MEDIUM|LOW"}],
  "inconsistencies": [{"type": "string", "severity": "HIGH|MEDIUM|LOW", "issue": "string"}],
  "deliverable_issues": [{"name": "string", "location": "string", "severity": "HIGH|MEDIUM|LOW", "issue": "string"}],
  "red_flags": [{"flag": "string", "severity": "HIGH|MEDIUM|LOW"}]
}
"#;

/// Renders retrieved matches as numbered example blocks.
pub fn format_matches(matches: &[SimilarityMatch]) -> String {
    let mut out = String::new();
    for (i, m) in matches.iter().enumerate() {
        let p = &m.pattern;
        out.push_str(&format!(
            "\n--- Example {} (Similarity: {:.2}) ---\n",
            i + 1,
            m.similarity_score
        ));
        out.push_str(&format!("Problematic Text: {}\n", p.text));
        out.push_str(&format!("Issue Type: {}\n", p.issue_type));
        out.push_str(&format!("Why Problematic: {}\n", p.explanation));
        out.push_str(&format!("What Happened: {}\n", p.actual_outcome));
        out.push_str(&format!("Cost Impact: {}\n", p.estimated_cost));
        out.push_str(&format!("Source: {}\n", p.contract_source));
    }
    out
}

pub fn validation(sow_section: &str, matches: &[SimilarityMatch]) -> String {
    // Patterns first: the section text may itself contain "{similar_patterns}".
    VALIDATION_PROMPT
        .replace("{similar_patterns}", &format_matches(matches))
        .replace("{sow_section}", sow_section)
}

pub fn overlap(filename_1: &str, text_1: &str, filename_2: &str, text_2: &str) -> String {
    OVERLAP_PROMPT
        .replace("{filename_1}", filename_1)
        .replace("{filename_2}", filename_2)
        .replace("{sow_text_2}", text_2)
        .replace("{sow_text_1}", text_1)
}

pub fn basic_analysis(sow_data: &str) -> String {
    BASIC_ANALYSIS_PROMPT.replace("{sow_data}", sow_data)
}
