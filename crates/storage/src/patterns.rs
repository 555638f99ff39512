//! Pattern table access. Writes replace the whole table in one transaction.

use crate::models::{NewPattern, PatternRow};
use sqlx::SqlitePool;
use tracing::debug;

/// Replaces every stored pattern with `patterns`, preserving slice order.
///
/// Runs in a single transaction: readers see either the old set or the new one.
pub async fn replace_all(pool: &SqlitePool, patterns: &[NewPattern]) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM patterns").execute(&mut *tx).await?;
    // Restart insertion order so ties stay stable across rebuilds.
    sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'patterns'")
        .execute(&mut *tx)
        .await?;

    for p in patterns {
        let embedding_json = serde_json::to_string(&p.embedding)?;
        sqlx::query(
            r#"
            INSERT INTO patterns (id, text, issue_type, severity, explanation,
                                  actual_outcome, estimated_cost, correct_version,
                                  contract_source, embedding_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&p.id)
        .bind(&p.text)
        .bind(&p.issue_type)
        .bind(&p.severity)
        .bind(&p.explanation)
        .bind(&p.actual_outcome)
        .bind(&p.estimated_cost)
        .bind(&p.correct_version)
        .bind(&p.contract_source)
        .bind(embedding_json)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    debug!(count = patterns.len(), "pattern table replaced");
    Ok(patterns.len())
}

/// All patterns in insertion order.
pub async fn load_all(pool: &SqlitePool) -> anyhow::Result<Vec<PatternRow>> {
    let rows = sqlx::query_as::<_, PatternRow>(
        r#"
        SELECT seq, id, text, issue_type, severity, explanation, actual_outcome,
               estimated_cost, correct_version, contract_source, embedding_json
        FROM patterns
        ORDER BY seq ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count(pool: &SqlitePool) -> anyhow::Result<usize> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patterns")
        .fetch_one(pool)
        .await?;
    Ok(n as usize)
}
