//! The estimate scrub pipeline.
//!
//! ```text
//! text ─▶ estimate_lines ─▶ detect_repairs ─▶ match_lines ─▶ merge_inferred
//!                                                               │
//!                         group_calibrations ◀─ apply_overrides ◀┘
//! ```
//!
//! Everything here is synchronous and total: an unmapped vehicle yields
//! an empty direct match set, never an error.

use serde::Serialize;
use tracing::debug;

use crate::canonical::DEFAULT_TYPE_SEPARATOR;
use crate::group::{group_calibrations, merge_inferred};
use crate::inference::infer_matches;
use crate::matcher::match_lines;
use crate::models::{GroupedCalibration, ScrubResult, VehicleRuleSet};
use crate::normalize::estimate_lines;
use crate::overrides::{apply_overrides, ManualOverrides, OverrideReport};
use crate::repair::{detect_repairs, RepairOperation};

/// Pipeline policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubOptions {
    /// Merge inferred matches even when direct matches exist. When off,
    /// inference only runs as a fallback for an empty direct match set.
    pub include_inferred: bool,
    /// Joins distinct calibration types within one group.
    pub type_separator: String,
}

impl Default for ScrubOptions {
    fn default() -> Self {
        Self {
            include_inferred: true,
            type_separator: DEFAULT_TYPE_SEPARATOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrubOutcome {
    pub result: ScrubResult,
    pub groups: Vec<GroupedCalibration>,
    pub repairs: Vec<RepairOperation>,
    /// Whether a rule set was available for the vehicle.
    pub vehicle_matched: bool,
}

/// Scrub `text` against an optional vehicle rule set.
pub fn scrub_estimate(text: &str, vehicle: Option<&VehicleRuleSet>, options: &ScrubOptions) -> ScrubOutcome {
    let (outcome, _) = rescrub(text, vehicle, &ManualOverrides::default(), options);
    outcome
}

/// Scrub `text`, then apply reviewer overrides before grouping.
pub fn rescrub(
    text: &str,
    vehicle: Option<&VehicleRuleSet>,
    overrides: &ManualOverrides,
    options: &ScrubOptions,
) -> (ScrubOutcome, OverrideReport) {
    let lines = estimate_lines(text);
    let repairs = detect_repairs(&lines);

    let direct = match vehicle {
        Some(v) => match_lines(&lines, v),
        None => ScrubResult::default(),
    };

    let merged = if options.include_inferred || direct.is_empty() {
        let inferred = infer_matches(&lines, &repairs);
        debug!(
            direct = direct.match_count(),
            inferred = inferred.match_count(),
            "merging inferred matches"
        );
        merge_inferred(&direct, &inferred)
    } else {
        direct
    };

    let (result, report) = if overrides.is_empty() {
        (merged, OverrideReport::default())
    } else {
        apply_overrides(&merged, overrides, &lines)
    };
    let groups = group_calibrations(&result, &options.type_separator);

    (
        ScrubOutcome {
            result,
            groups,
            repairs,
            vehicle_matched: vehicle.is_some(),
        },
        report,
    )
}
