//! Application façade used by the CLI.
//!
//! [`ScrubApp`] owns the configuration, the rule provider, the report
//! store, and the process-wide [`RateLimiter`]. Every operation takes the
//! caller's identity and is rate-checked per `(caller, endpoint)` before
//! doing any work.

use std::sync::Arc;

use anyhow::Result;

use adas_scrub_core::completeness::CompletenessAssessment;
use adas_scrub_core::models::VehicleDescriptor;
use adas_scrub_core::overrides::ManualOverrides;
use adas_scrub_core::scrub::{scrub_estimate, ScrubOutcome};
use adas_scrub_core::service::{self, RescrubReport};
use adas_scrub_core::store::RuleProvider;
use adas_scrub_core::workflow::WorkflowStatus;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::rate_limit::{Clock, RateLimiter, SystemClock};
use crate::rules::FileRuleProvider;
use crate::sqlite_store::{NewReport, ReportSummary, SqliteReportStore};

pub struct ScrubApp {
    config: Config,
    provider: Box<dyn RuleProvider>,
    store: SqliteReportStore,
    limiter: RateLimiter,
}

impl ScrubApp {
    /// Connect to the database, apply migrations, and load the rules file.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = db::connect(&config).await?;
        migrate::apply(&pool).await?;
        let provider = FileRuleProvider::load(&config.rules.path)?;
        Ok(Self::with_parts(
            config,
            Box::new(provider),
            SqliteReportStore::new(pool),
            Arc::new(SystemClock),
        ))
    }

    pub fn with_parts(
        config: Config,
        provider: Box<dyn RuleProvider>,
        store: SqliteReportStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = RateLimiter::new(&config.rate_limit, clock);
        Self {
            config,
            provider,
            store,
            limiter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// One-off scrub of estimate text; nothing is stored.
    pub async fn scrub_text(
        &self,
        caller: &str,
        vehicle: &VehicleDescriptor,
        estimate_text: &str,
    ) -> Result<ScrubOutcome> {
        self.limiter.check(caller, "scrub")?;
        let rules = service::resolve_vehicle(self.provider.as_ref(), vehicle).await?;
        Ok(scrub_estimate(estimate_text, rules.as_ref(), &self.config.scrub.options()))
    }

    pub async fn create_report(&self, caller: &str, report: &NewReport) -> Result<String> {
        self.limiter.check(caller, "report.create")?;
        self.store.insert_report(report).await
    }

    pub async fn list_reports(&self, caller: &str) -> Result<Vec<ReportSummary>> {
        self.limiter.check(caller, "report.list")?;
        self.store.list_reports().await
    }

    pub async fn rescrub_report(
        &self,
        caller: &str,
        report_id: &str,
        overrides: &ManualOverrides,
    ) -> Result<RescrubReport> {
        self.limiter.check(caller, "rescrub")?;
        service::rescrub_report(
            self.provider.as_ref(),
            &self.store,
            report_id,
            overrides,
            &self.config.scrub.options(),
            &self.config.completeness,
        )
        .await
    }

    pub async fn assess_report(&self, caller: &str, report_id: &str) -> Result<CompletenessAssessment> {
        self.limiter.check(caller, "assess")?;
        service::assess_report(
            &self.store,
            report_id,
            &self.config.scrub.options(),
            &self.config.completeness,
        )
        .await
    }

    pub async fn transition_status(
        &self,
        caller: &str,
        report_id: &str,
        target: WorkflowStatus,
    ) -> Result<CompletenessAssessment> {
        self.limiter.check(caller, "status")?;
        service::transition_report(
            &self.store,
            report_id,
            target,
            &self.config.scrub.options(),
            &self.config.completeness,
        )
        .await
    }
}
