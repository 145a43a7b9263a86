//! Reviewer overrides applied on top of a scrub result.
//!
//! Overrides arrive as JSON alongside a re-scrub request:
//!
//! ```json
//! {
//!   "remove": [{ "systemName": "steering" }],
//!   "add": [{ "lineNumber": 4, "systemName": "Front Radar", "calibrationType": "Static" }]
//! }
//! ```
//!
//! Removals run first, then additions. Instructions that cannot be
//! applied are skipped and counted in the [`OverrideReport`]; they never
//! fail the batch.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::canonical::{canonical_operation_name, canonical_system_name, normalize_key, operation_key};
use crate::models::{CalibrationMatch, ScrubLine, ScrubResult};
use crate::normalize::EstimateLine;
use crate::repair::clean_description;

/// Highest line number an add instruction may target.
pub const MAX_OVERRIDE_LINE: i64 = 999;

const MANUAL_KEYWORD: &str = "manual";
const MANUAL_REASON: &str = "Manually added by reviewer";
const MANUAL_OPERATION: &str = "Manual override";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOverride {
    pub line_number: i64,
    #[serde(default)]
    pub system_name: String,
    #[serde(default)]
    pub calibration_type: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub matched_keyword: Option<String>,
    #[serde(default)]
    pub repair_operation: Option<String>,
    /// Line description used when the line has to be created.
    #[serde(default)]
    pub description: Option<String>,
}

/// Match filter; every field that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveOverride {
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub system_name: Option<String>,
    #[serde(default)]
    pub line_number: Option<i64>,
}

/// A reviewer's override batch.
///
/// Items are parsed one by one: an item that is not a valid instruction
/// (missing or mistyped `lineNumber`, wrong field types) is dropped,
/// logged, and counted in `rejected` instead of failing the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOverrides")]
pub struct ManualOverrides {
    #[serde(default)]
    pub add: Vec<AddOverride>,
    #[serde(default)]
    pub remove: Vec<RemoveOverride>,
    /// Items that could not be read as instructions.
    #[serde(skip)]
    pub rejected: usize,
}

impl ManualOverrides {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.rejected == 0
    }
}

#[derive(Deserialize)]
struct RawOverrides {
    #[serde(default)]
    add: Vec<serde_json::Value>,
    #[serde(default)]
    remove: Vec<serde_json::Value>,
}

impl From<RawOverrides> for ManualOverrides {
    fn from(raw: RawOverrides) -> Self {
        let mut rejected = 0;
        let add = parse_items(raw.add, "add", &mut rejected);
        let remove = parse_items(raw.remove, "remove", &mut rejected);
        Self { add, remove, rejected }
    }
}

fn parse_items<T: DeserializeOwned>(items: Vec<serde_json::Value>, kind: &str, rejected: &mut usize) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(kind, %item, error = %e, "skipping unreadable override");
                *rejected += 1;
                None
            }
        })
        .collect()
}

/// What an override batch actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideReport {
    pub removed: usize,
    pub added: usize,
    /// Unreadable items, and instructions with no usable criteria or
    /// out-of-range values.
    pub skipped_invalid: usize,
    /// Adds whose `(system, operation)` already existed on the line.
    pub skipped_duplicate: usize,
}

/// Apply `overrides` to `result`: removals first, then additions.
///
/// `lines` supplies the estimate's own text for lines an addition has to
/// create.
pub fn apply_overrides(
    result: &ScrubResult,
    overrides: &ManualOverrides,
    lines: &[EstimateLine],
) -> (ScrubResult, OverrideReport) {
    let mut out = result.clone();
    let mut report = OverrideReport {
        skipped_invalid: overrides.rejected,
        ..OverrideReport::default()
    };

    for remove in &overrides.remove {
        match RemoveFilter::from_instruction(remove) {
            Some(filter) => report.removed += filter.apply(&mut out),
            None => {
                warn!(?remove, "skipping remove override with no usable criteria");
                report.skipped_invalid += 1;
            }
        }
    }

    for add in &overrides.add {
        let system = add.system_name.trim();
        if system.is_empty() || !(1..=MAX_OVERRIDE_LINE).contains(&add.line_number) {
            warn!(line = add.line_number, system, "skipping invalid add override");
            report.skipped_invalid += 1;
            continue;
        }
        if add_match(&mut out, add, system, lines) {
            report.added += 1;
        } else {
            report.skipped_duplicate += 1;
        }
    }

    (out, report)
}

struct RemoveFilter {
    operation: Option<(String, String)>,
    system: Option<String>,
    line_number: Option<i64>,
}

impl RemoveFilter {
    fn from_instruction(remove: &RemoveOverride) -> Option<Self> {
        let operation = remove
            .operation
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|op| (normalize_key(&canonical_operation_name(op)), normalize_key(op)));
        let system = remove
            .system_name
            .as_deref()
            .map(normalize_key)
            .filter(|s| !s.is_empty());

        if operation.is_none() && system.is_none() && remove.line_number.is_none() {
            return None;
        }
        Some(Self {
            operation,
            system,
            line_number: remove.line_number,
        })
    }

    fn matches(&self, line_number: u32, m: &CalibrationMatch) -> bool {
        if let Some(n) = self.line_number {
            if i64::from(line_number) != n {
                return false;
            }
        }
        if let Some((canonical, raw)) = &self.operation {
            let group_key = operation_key(&m.system_name, &m.repair_operation);
            if *canonical != group_key && *raw != normalize_key(&m.repair_operation) {
                return false;
            }
        }
        if let Some(needle) = &self.system {
            let raw = normalize_key(&m.system_name);
            let canonical = normalize_key(&canonical_system_name(&m.system_name, Some(&m.repair_operation)));
            if !raw.contains(needle.as_str()) && !canonical.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }

    /// Remove matching matches; lines emptied here are dropped.
    fn apply(&self, result: &mut ScrubResult) -> usize {
        let mut removed = 0;
        result.lines.retain_mut(|line| {
            let before = line.calibration_matches.len();
            let line_number = line.line_number;
            line.calibration_matches.retain(|m| !self.matches(line_number, m));
            let gone = before - line.calibration_matches.len();
            removed += gone;
            !(gone > 0 && line.calibration_matches.is_empty())
        });
        removed
    }
}

/// Returns `false` when an equivalent match was already on the line.
fn add_match(result: &mut ScrubResult, add: &AddOverride, system: &str, lines: &[EstimateLine]) -> bool {
    // Range checked by the caller.
    let line_number = add.line_number as u32;
    let operation = non_blank(&add.repair_operation).unwrap_or(MANUAL_OPERATION);

    let idx = match result.lines.iter().position(|l| l.line_number == line_number) {
        Some(idx) => idx,
        None => {
            let description = non_blank(&add.description)
                .map(str::to_string)
                .or_else(|| {
                    lines
                        .iter()
                        .find(|l| l.line_number == line_number)
                        .map(|l| clean_description(&l.text))
                })
                .unwrap_or_else(|| format!("Line {line_number}"));
            let at = result
                .lines
                .iter()
                .position(|l| l.line_number > line_number)
                .unwrap_or(result.lines.len());
            result.lines.insert(
                at,
                ScrubLine {
                    line_number,
                    description,
                    calibration_matches: Vec::new(),
                },
            );
            at
        }
    };

    let system_key = normalize_key(&canonical_system_name(system, Some(operation)));
    let op_key = operation_key(system, operation);
    let line = &mut result.lines[idx];
    let equivalent = line.calibration_matches.iter().any(|m| {
        normalize_key(&canonical_system_name(&m.system_name, Some(&m.repair_operation))) == system_key
            && operation_key(&m.system_name, &m.repair_operation) == op_key
    });
    if equivalent {
        return false;
    }

    line.push_unique(CalibrationMatch {
        system_name: system.to_string(),
        calibration_type: non_blank(&add.calibration_type).map(str::to_string),
        reason: non_blank(&add.reason).unwrap_or(MANUAL_REASON).to_string(),
        matched_keyword: non_blank(&add.matched_keyword).unwrap_or(MANUAL_KEYWORD).to_string(),
        repair_operation: operation.to_string(),
        procedure_type: None,
        procedure_name: None,
        location: None,
        tools_required: None,
        inferred: false,
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
