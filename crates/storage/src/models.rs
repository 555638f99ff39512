use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One stored pattern, as read back from the `patterns` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PatternRow {
    pub seq: i64,
    pub id: String,
    pub text: String,
    pub issue_type: String,
    pub severity: String,
    pub explanation: String,
    pub actual_outcome: String,
    pub estimated_cost: String,
    pub correct_version: String,
    pub contract_source: String,
    pub embedding_json: String,
}

impl PatternRow {
    pub fn embedding(&self) -> serde_json::Result<Vec<f32>> {
        serde_json::from_str(&self.embedding_json)
    }
}

/// Insert payload; `seq` is assigned by SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPattern {
    pub id: String,
    pub text: String,
    pub issue_type: String,
    pub severity: String,
    pub explanation: String,
    pub actual_outcome: String,
    pub estimated_cost: String,
    pub correct_version: String,
    pub contract_source: String,
    pub embedding: Vec<f32>,
}
