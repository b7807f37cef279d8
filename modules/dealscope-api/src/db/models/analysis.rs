use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Returned by [`insert`].
pub struct SavedAnalysis {
    pub id: i32,
    pub created_at: DateTime<Utc>,
}

/// History listing row; the result document is left out.
pub struct AnalysisSummaryRow {
    pub id: i32,
    pub company_name: String,
    pub sector: String,
    pub created_at: DateTime<Utc>,
}

pub struct AnalysisRow {
    pub id: i32,
    pub company_name: String,
    pub sector: String,
    pub created_at: DateTime<Utc>,
    pub result: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub async fn insert(
    pool: &PgPool,
    company_name: &str,
    sector: &str,
    result: &serde_json::Value,
) -> Result<SavedAnalysis> {
    let row = sqlx::query(
        r#"
        INSERT INTO analyses (company_name, sector, result_json)
        VALUES ($1, $2, $3)
        RETURNING id, created_at
        "#,
    )
    .bind(company_name)
    .bind(sector)
    .bind(result)
    .fetch_one(pool)
    .await?;

    Ok(SavedAnalysis {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Most recent first.
pub async fn list_recent(pool: &PgPool, limit: u32) -> Result<Vec<AnalysisSummaryRow>> {
    let rows = sqlx::query_as::<_, (i32, String, Option<String>, DateTime<Utc>)>(
        r#"
        SELECT id, company_name, sector, created_at
        FROM analyses
        ORDER BY created_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(limit.min(100) as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, company_name, sector, created_at)| AnalysisSummaryRow {
            id,
            company_name,
            sector: sector.unwrap_or_default(),
            created_at,
        })
        .collect())
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<AnalysisRow>> {
    let row = sqlx::query_as::<_, (i32, String, Option<String>, DateTime<Utc>, serde_json::Value)>(
        r#"
        SELECT id, company_name, sector, created_at, result_json
        FROM analyses
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, company_name, sector, created_at, result)| AnalysisRow {
        id,
        company_name,
        sector: sector.unwrap_or_default(),
        created_at,
        result,
    }))
}

/// True when a row was removed.
pub async fn delete(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM analyses WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}
