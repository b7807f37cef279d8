//! Run history and analyst preferences in Postgres.
//!
//! Both stores hold an optional pool. Without `DATABASE_URL` every read
//! comes back empty and every write is dropped.

pub mod models;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

use dealscope_research::PreferenceSource;

use models::analysis::{self, AnalysisRow, AnalysisSummaryRow};
use models::preference;

const CREATE_ANALYSES: &str = r#"
CREATE TABLE IF NOT EXISTS analyses (
    id           SERIAL       PRIMARY KEY,
    company_name TEXT         NOT NULL,
    sector       TEXT,
    created_at   TIMESTAMPTZ  NOT NULL DEFAULT now(),
    result_json  JSONB        NOT NULL
)
"#;

const CREATE_PREFERENCES: &str = r#"
CREATE TABLE IF NOT EXISTS preferences (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// Open a pool and create the tables. `None` when history is disabled or
/// the database cannot be reached.
pub async fn connect(database_url: &str) -> Option<PgPool> {
    if database_url.is_empty() {
        info!("DATABASE_URL not set, history persistence disabled");
        return None;
    }

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, "Database connect failed, history disabled");
            return None;
        }
    };

    if let Err(e) = ensure_schema(&pool).await {
        warn!(error = %e, "Database init failed, history disabled");
        return None;
    }

    info!("Database pool initialised");
    Some(pool)
}

pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(CREATE_ANALYSES).execute(pool).await?;
    sqlx::query(CREATE_PREFERENCES).execute(pool).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub id: i32,
    pub company_name: String,
    pub sector: String,
    pub created_at: DateTime<Utc>,
}

impl From<AnalysisSummaryRow> for AnalysisSummary {
    fn from(row: AnalysisSummaryRow) -> Self {
        Self {
            id: row.id,
            company_name: row.company_name,
            sector: row.sector,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: i32,
    pub company_name: String,
    pub sector: String,
    pub created_at: DateTime<Utc>,
    pub result: serde_json::Value,
}

impl From<AnalysisRow> for AnalysisRecord {
    fn from(row: AnalysisRow) -> Self {
        Self {
            id: row.id,
            company_name: row.company_name,
            sector: row.sector,
            created_at: row.created_at,
            result: row.result,
        }
    }
}

#[derive(Clone, Default)]
pub struct HistoryStore {
    pool: Option<PgPool>,
}

impl HistoryStore {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self { pool }
    }

    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    /// Persist a finished run. Failures are logged and swallowed so a
    /// database outage never affects the stream.
    pub async fn save(
        &self,
        company_name: &str,
        sector: &str,
        result: &serde_json::Value,
    ) -> Option<(i32, DateTime<Utc>)> {
        let pool = self.pool.as_ref()?;
        match analysis::insert(pool, company_name, sector, result).await {
            Ok(saved) => {
                info!(id = saved.id, company = company_name, "Analysis saved");
                Some((saved.id, saved.created_at))
            }
            Err(e) => {
                warn!(error = %e, company = company_name, "Failed to save analysis");
                None
            }
        }
    }

    pub async fn list(&self, limit: u32) -> Result<Vec<AnalysisSummary>> {
        let Some(pool) = &self.pool else {
            return Ok(Vec::new());
        };
        let rows = analysis::list_recent(pool, limit).await?;
        Ok(rows.into_iter().map(AnalysisSummary::from).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<AnalysisRecord>> {
        let Some(pool) = &self.pool else {
            return Ok(None);
        };
        Ok(analysis::find_by_id(pool, id).await?.map(AnalysisRecord::from))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let Some(pool) = &self.pool else {
            return Ok(false);
        };
        analysis::delete(pool, id).await
    }
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct PreferenceStore {
    pool: Option<PgPool>,
}

impl PreferenceStore {
    pub fn new(pool: Option<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn memo(&self) -> Result<String> {
        let Some(pool) = &self.pool else {
            return Ok(String::new());
        };
        Ok(preference::get(pool, preference::MEMO_KEY)
            .await?
            .unwrap_or_default())
    }

    /// False when no database is configured and nothing was stored.
    pub async fn set_memo(&self, value: &str) -> Result<bool> {
        let Some(pool) = &self.pool else {
            return Ok(false);
        };
        preference::upsert(pool, preference::MEMO_KEY, value).await?;
        Ok(true)
    }
}

#[async_trait]
impl PreferenceSource for PreferenceStore {
    async fn memo_preferences(&self) -> Result<String> {
        self.memo().await
    }
}
