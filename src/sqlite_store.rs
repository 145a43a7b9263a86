//! SQLite-backed [`ReportStore`] implementation.
//!
//! Reports live in the `reports` table created by [`crate::migrate`]. The
//! scrub result is stored as its canonical JSON array next to a SHA-256
//! `result_hash` of that JSON, so external tooling can detect changes
//! without parsing it.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use adas_scrub_core::models::{ReportMetadata, ReportRecord, ScrubResult, VehicleDescriptor};
use adas_scrub_core::store::ReportStore;
use adas_scrub_core::workflow::WorkflowStatus;

/// Input for a new report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub vehicle: VehicleDescriptor,
    pub estimate_text: String,
    pub metadata: ReportMetadata,
    pub oem_source_url: Option<String>,
}

/// One row of `scrub report list`.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub id: String,
    pub vehicle: String,
    pub status: String,
    pub scrubbed: bool,
    pub updated_at: String,
}

pub struct SqliteReportStore {
    pool: SqlitePool,
}

impl SqliteReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a draft report and return its generated ID.
    pub async fn insert_report(&self, report: &NewReport) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        let meta = &report.metadata;

        sqlx::query(
            r#"
            INSERT INTO reports (id, vehicle_year, vehicle_make, vehicle_model, estimate_text,
                                 vin, reference_number, shop_name, claim_number, estimate_date,
                                 oem_source_url, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(report.vehicle.year)
        .bind(&report.vehicle.make)
        .bind(&report.vehicle.model)
        .bind(&report.estimate_text)
        .bind(&meta.vin)
        .bind(&meta.reference_number)
        .bind(&meta.shop_name)
        .bind(&meta.claim_number)
        .bind(&meta.estimate_date)
        .bind(&report.oem_source_url)
        .bind(WorkflowStatus::Draft.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// All reports, most recently updated first.
    pub async fn list_reports(&self) -> Result<Vec<ReportSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, vehicle_year, vehicle_make, vehicle_model, status,
                   scrub_result IS NOT NULL AS scrubbed, updated_at
            FROM reports
            ORDER BY updated_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let year: i64 = row.get("vehicle_year");
                let make: String = row.get("vehicle_make");
                let model: String = row.get("vehicle_model");
                ReportSummary {
                    id: row.get("id"),
                    vehicle: format!("{year} {make} {model}"),
                    status: row.get("status"),
                    scrubbed: row.get("scrubbed"),
                    updated_at: format_ts_iso(row.get("updated_at")),
                }
            })
            .collect())
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Hex SHA-256 of a stored scrub result.
pub fn result_hash(json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

fn row_to_record(row: &SqliteRow) -> ReportRecord {
    let id: String = row.get("id");
    let raw_status: String = row.get("status");
    let status = raw_status.parse().unwrap_or_else(|e| {
        warn!(report = %id, error = %e, "unknown stored status; treating as draft");
        WorkflowStatus::Draft
    });
    let year: i64 = row.get("vehicle_year");

    ReportRecord {
        vehicle: VehicleDescriptor {
            year: i32::try_from(year).unwrap_or_default(),
            make: row.get("vehicle_make"),
            model: row.get("vehicle_model"),
        },
        estimate_text: row.get("estimate_text"),
        metadata: ReportMetadata {
            vin: row.get("vin"),
            reference_number: row.get("reference_number"),
            shop_name: row.get("shop_name"),
            claim_number: row.get("claim_number"),
            estimate_date: row.get("estimate_date"),
        },
        oem_source_url: row.get("oem_source_url"),
        status,
        scrub_result_json: row.get("scrub_result"),
        id,
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn load_report(&self, id: &str) -> Result<Option<ReportRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, vehicle_year, vehicle_make, vehicle_model, estimate_text,
                   vin, reference_number, shop_name, claim_number, estimate_date,
                   oem_source_url, status, scrub_result
            FROM reports WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn save_scrub_result(&self, id: &str, result: &ScrubResult) -> Result<()> {
        let json = result.to_json();
        let hash = result_hash(&json);

        let done = sqlx::query(
            "UPDATE reports SET scrub_result = ?, result_hash = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&json)
        .bind(&hash)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            bail!("report not found: {}", id);
        }
        Ok(())
    }

    async fn update_status(&self, id: &str, status: WorkflowStatus) -> Result<()> {
        let done = sqlx::query("UPDATE reports SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            bail!("report not found: {}", id);
        }
        Ok(())
    }
}
