//! Storage abstractions for ADAS Scrub.
//!
//! The core never talks to a database or rule file directly. Vehicle rule
//! data comes through a [`RuleProvider`]; reports and their stored scrub
//! results go through a [`ReportStore`]. Both are async (via
//! `async-trait`) so the application can back them with SQLite or files
//! while tests use [`memory::InMemoryStore`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ReportRecord, ScrubResult, VehicleRuleSet};
use crate::workflow::WorkflowStatus;

/// Source of manufacturer rule data.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_vehicle`](RuleProvider::find_vehicle) | Exact or "All Models" rule set for a vehicle |
/// | [`vehicles_for_year`](RuleProvider::vehicles_for_year) | Every rule set whose range covers a year |
#[async_trait]
pub trait RuleProvider: Send + Sync {
    /// Rule set for `(year, make, model)`, or `None` when unmapped.
    async fn find_vehicle(&self, year: i32, make: &str, model: &str) -> Result<Option<VehicleRuleSet>>;

    /// All rule sets covering `year`, across makes and models.
    async fn vehicles_for_year(&self, year: i32) -> Result<Vec<VehicleRuleSet>>;
}

/// Persistence for reports and their scrub results.
///
/// There is no concurrency control at this layer: callers must not run
/// two re-scrubs of the same report at once.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn load_report(&self, id: &str) -> Result<Option<ReportRecord>>;

    /// Overwrite the stored scrub result of report `id`.
    async fn save_scrub_result(&self, id: &str, result: &ScrubResult) -> Result<()>;

    async fn update_status(&self, id: &str, status: WorkflowStatus) -> Result<()>;
}
