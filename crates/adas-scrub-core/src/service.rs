//! Report-level operations over the storage traits.
//!
//! These are the only async functions in the core. Each loads what it
//! needs through a [`RuleProvider`] / [`ReportStore`], runs the pure
//! pipeline, and writes back only when the stored content changes.

use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::info;

use crate::completeness::{assess, CompletenessAssessment, CompletenessInput, CompletenessWeights};
use crate::group::group_calibrations;
use crate::matcher::select_vehicle;
use crate::models::{GroupedCalibration, ReportRecord, ScrubResult, VehicleDescriptor, VehicleRuleSet};
use crate::overrides::{ManualOverrides, OverrideReport};
use crate::scrub::{rescrub, ScrubOptions};
use crate::store::{ReportStore, RuleProvider};
use crate::workflow::{guard_transition, WorkflowStatus};

/// Result of re-scrubbing one stored report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescrubReport {
    pub report_id: String,
    /// True when the stored result was overwritten.
    pub changed: bool,
    pub vehicle_matched: bool,
    pub result: ScrubResult,
    pub groups: Vec<GroupedCalibration>,
    pub overrides: OverrideReport,
    pub assessment: CompletenessAssessment,
}

/// Rule set for `vehicle`: the provider's own lookup first, then the
/// year's candidates resolved locally.
pub async fn resolve_vehicle(
    provider: &dyn RuleProvider,
    vehicle: &VehicleDescriptor,
) -> Result<Option<VehicleRuleSet>> {
    if let Some(found) = provider
        .find_vehicle(vehicle.year, &vehicle.make, &vehicle.model)
        .await?
    {
        return Ok(Some(found));
    }
    let candidates = provider.vehicles_for_year(vehicle.year).await?;
    Ok(select_vehicle(&candidates, vehicle.year, &vehicle.make, &vehicle.model).cloned())
}

/// Re-run the pipeline for a stored report and persist a changed result.
///
/// The read-compare-write sequence is not transactional; callers must
/// serialize re-scrubs of the same report.
pub async fn rescrub_report(
    provider: &dyn RuleProvider,
    store: &dyn ReportStore,
    report_id: &str,
    overrides: &ManualOverrides,
    options: &ScrubOptions,
    weights: &CompletenessWeights,
) -> Result<RescrubReport> {
    let report = load(store, report_id).await?;
    let vehicle = resolve_vehicle(provider, &report.vehicle).await?;
    let (outcome, override_report) = rescrub(&report.estimate_text, vehicle.as_ref(), overrides, options);

    let changed = report.scrub_result_json.is_none() || !report.scrub_result().same_content(&outcome.result);
    if changed {
        store.save_scrub_result(report_id, &outcome.result).await?;
    }
    info!(
        report = report_id,
        changed,
        groups = outcome.groups.len(),
        removed = override_report.removed,
        added = override_report.added,
        "re-scrub finished"
    );

    let assessment = assess(&completeness_input(&report, &outcome.groups), weights);
    Ok(RescrubReport {
        report_id: report_id.to_string(),
        changed,
        vehicle_matched: outcome.vehicle_matched,
        result: outcome.result,
        groups: outcome.groups,
        overrides: override_report,
        assessment,
    })
}

/// Assess a report from its stored scrub result.
pub async fn assess_report(
    store: &dyn ReportStore,
    report_id: &str,
    options: &ScrubOptions,
    weights: &CompletenessWeights,
) -> Result<CompletenessAssessment> {
    let report = load(store, report_id).await?;
    let groups = group_calibrations(&report.scrub_result(), &options.type_separator);
    Ok(assess(&completeness_input(&report, &groups), weights))
}

/// Move a report to `target`, enforcing the submission gate.
pub async fn transition_report(
    store: &dyn ReportStore,
    report_id: &str,
    target: WorkflowStatus,
    options: &ScrubOptions,
    weights: &CompletenessWeights,
) -> Result<CompletenessAssessment> {
    let assessment = assess_report(store, report_id, options, weights).await?;
    guard_transition(target, &assessment)?;
    store.update_status(report_id, target).await?;
    info!(report = report_id, status = %target, score = assessment.score, "status changed");
    Ok(assessment)
}

async fn load(store: &dyn ReportStore, report_id: &str) -> Result<ReportRecord> {
    store
        .load_report(report_id)
        .await?
        .ok_or_else(|| anyhow!("report not found: {report_id}"))
}

fn completeness_input<'a>(report: &'a ReportRecord, groups: &'a [GroupedCalibration]) -> CompletenessInput<'a> {
    CompletenessInput {
        estimate_text: &report.estimate_text,
        metadata: &report.metadata,
        groups,
        oem_source_url: report.oem_source_url.as_deref(),
    }
}
