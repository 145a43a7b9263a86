//! In-memory [`RuleProvider`] and [`ReportStore`] for tests.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock` for thread safety.
//! Saves are counted so callers can check that unchanged re-scrubs do
//! not write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::matcher::select_vehicle;
use crate::models::{ReportRecord, ScrubResult, VehicleRuleSet};
use crate::workflow::WorkflowStatus;

use super::{ReportStore, RuleProvider};

pub struct InMemoryStore {
    rules: RwLock<Vec<VehicleRuleSet>>,
    reports: RwLock<HashMap<String, ReportRecord>>,
    saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            reports: RwLock::new(HashMap::new()),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn with_rules(rules: Vec<VehicleRuleSet>) -> Self {
        let store = Self::new();
        *store.rules.write().unwrap() = rules;
        store
    }

    pub fn add_vehicle(&self, vehicle: VehicleRuleSet) {
        self.rules.write().unwrap().push(vehicle);
    }

    pub fn insert_report(&self, report: ReportRecord) {
        self.reports.write().unwrap().insert(report.id.clone(), report);
    }

    /// Number of `save_scrub_result` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleProvider for InMemoryStore {
    async fn find_vehicle(&self, year: i32, make: &str, model: &str) -> Result<Option<VehicleRuleSet>> {
        let rules = self.rules.read().unwrap();
        Ok(select_vehicle(&rules, year, make, model).cloned())
    }

    async fn vehicles_for_year(&self, year: i32) -> Result<Vec<VehicleRuleSet>> {
        let rules = self.rules.read().unwrap();
        Ok(rules.iter().filter(|v| v.covers_year(year)).cloned().collect())
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn load_report(&self, id: &str) -> Result<Option<ReportRecord>> {
        Ok(self.reports.read().unwrap().get(id).cloned())
    }

    async fn save_scrub_result(&self, id: &str, result: &ScrubResult) -> Result<()> {
        let mut reports = self.reports.write().unwrap();
        let Some(report) = reports.get_mut(id) else {
            bail!("report not found: {id}");
        };
        report.scrub_result_json = Some(result.to_json());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_status(&self, id: &str, status: WorkflowStatus) -> Result<()> {
        let mut reports = self.reports.write().unwrap();
        let Some(report) = reports.get_mut(id) else {
            bail!("report not found: {id}");
        };
        report.status = status;
        Ok(())
    }
}
