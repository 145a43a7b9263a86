use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index; safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Create reports table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            vehicle_year INTEGER NOT NULL,
            vehicle_make TEXT NOT NULL,
            vehicle_model TEXT NOT NULL,
            estimate_text TEXT NOT NULL,
            vin TEXT,
            reference_number TEXT,
            shop_name TEXT,
            claim_number TEXT,
            estimate_date TEXT,
            oem_source_url TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            scrub_result TEXT,
            result_hash TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_updated ON reports(updated_at)")
        .execute(pool)
        .await?;

    Ok(())
}
