//! Core data models used throughout ADAS Scrub.
//!
//! These types represent vehicle rule data, scrub results, and report
//! records that flow through the matching pipeline. The persisted shape of
//! a [`ScrubResult`] is a JSON array of line entries with camelCase
//! fields; see [`ScrubResult::to_json`] and [`ScrubResult::from_json_lenient`].

use serde::{Deserialize, Serialize};

/// Model name used for a make-level fallback rule set.
pub const ALL_MODELS: &str = "All Models";

/// An ADAS component known for a vehicle, with its calibration type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdasSystem {
    pub name: String,
    #[serde(default)]
    pub calibration_type: Option<String>,
}

/// A repair operation and the keywords and systems it triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationMapping {
    pub repair_operation: String,
    /// Keywords tested as case-insensitive substrings, in order.
    pub keywords: Vec<String>,
    pub systems: Vec<String>,
    #[serde(default)]
    pub procedure_type: Option<String>,
    #[serde(default)]
    pub procedure_name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tools_required: Option<Vec<String>>,
}

/// Manufacturer rule data for one make/model over an inclusive year range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRuleSet {
    pub make: String,
    pub model: String,
    pub year_start: i32,
    pub year_end: i32,
    #[serde(default)]
    pub systems: Vec<AdasSystem>,
    #[serde(default)]
    pub mappings: Vec<CalibrationMapping>,
}

impl VehicleRuleSet {
    pub fn covers_year(&self, year: i32) -> bool {
        self.year_start <= year && year <= self.year_end
    }

    pub fn is_all_models(&self) -> bool {
        self.model.trim().eq_ignore_ascii_case(ALL_MODELS)
    }

    /// Calibration type of the named system, compared case-insensitively.
    pub fn calibration_type_for(&self, system_name: &str) -> Option<&str> {
        let wanted = system_name.trim();
        self.systems
            .iter()
            .find(|s| s.name.trim().eq_ignore_ascii_case(wanted))
            .and_then(|s| s.calibration_type.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

/// A single calibration requirement attached to an estimate line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationMatch {
    pub system_name: String,
    #[serde(default)]
    pub calibration_type: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub matched_keyword: String,
    #[serde(default)]
    pub repair_operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_required: Option<Vec<String>>,
    /// Set on matches produced by the heuristic inference pass.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inferred: bool,
}

impl CalibrationMatch {
    /// True when `other` has the same `(system_name, matched_keyword)` pair.
    pub fn same_trigger(&self, other: &CalibrationMatch) -> bool {
        self.system_name.eq_ignore_ascii_case(&other.system_name)
            && self.matched_keyword.eq_ignore_ascii_case(&other.matched_keyword)
    }
}

/// One estimate line and the calibrations it triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrubLine {
    pub line_number: u32,
    pub description: String,
    #[serde(default)]
    pub calibration_matches: Vec<CalibrationMatch>,
}

impl ScrubLine {
    /// Push `m` unless a match with the same trigger is already present.
    ///
    /// Returns `true` when the match was added.
    pub fn push_unique(&mut self, m: CalibrationMatch) -> bool {
        if self.calibration_matches.iter().any(|e| e.same_trigger(&m)) {
            return false;
        }
        self.calibration_matches.push(m);
        true
    }
}

/// Ordered per-line calibration matches for one estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrubResult {
    pub lines: Vec<ScrubLine>,
}

impl ScrubResult {
    pub fn new(lines: Vec<ScrubLine>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.calibration_matches.is_empty())
    }

    pub fn match_count(&self) -> usize {
        self.lines.iter().map(|l| l.calibration_matches.len()).sum()
    }

    pub fn line(&self, line_number: u32) -> Option<&ScrubLine> {
        self.lines.iter().find(|l| l.line_number == line_number)
    }

    /// Serialize into the canonical stored representation.
    pub fn to_json(&self) -> String {
        // Every field is a string, number, bool, or list of those, so
        // serialization cannot fail.
        serde_json::to_string(&self.lines).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parse a stored representation, treating malformed input as empty.
    pub fn from_json_lenient(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Vec<ScrubLine>>(trimmed) {
            Ok(lines) => Self { lines },
            Err(e) => {
                tracing::warn!(error = %e, "stored scrub result is malformed; treating as empty");
                Self::default()
            }
        }
    }

    /// Content equality ignoring line order and match order.
    pub fn same_content(&self, other: &ScrubResult) -> bool {
        fn flatten(r: &ScrubResult) -> Vec<String> {
            let mut rows: Vec<String> = r
                .lines
                .iter()
                .flat_map(|l| {
                    l.calibration_matches.iter().map(move |m| {
                        format!(
                            "{}\u{1f}{}\u{1f}{}",
                            l.line_number,
                            l.description,
                            serde_json::to_string(m).unwrap_or_default()
                        )
                    })
                })
                .collect();
            rows.sort();
            rows
        }
        flatten(self) == flatten(other)
    }
}

/// Canonical operation grouping of calibration matches across lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedCalibration {
    /// Comparison key of the recommended operation; unique per group.
    pub operation_key: String,
    /// Display form of the recommended operation.
    pub operation: String,
    pub system_name: String,
    pub calibration_type: Option<String>,
    pub trigger_lines: Vec<u32>,
    pub trigger_descriptions: Vec<String>,
    pub matched_keywords: Vec<String>,
    /// True only when every member match came from the inference pass.
    pub inferred: bool,
}

/// Report metadata consulted by the completeness scorer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub claim_number: Option<String>,
    /// Estimate or loss date, free-form (`YYYY-MM-DD` preferred).
    #[serde(default)]
    pub estimate_date: Option<String>,
}

/// Year, make, and model used for rule lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    pub year: i32,
    pub make: String,
    pub model: String,
}

/// A report as seen by the core: inputs to a scrub plus its stored result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: String,
    pub vehicle: VehicleDescriptor,
    pub estimate_text: String,
    #[serde(default)]
    pub metadata: ReportMetadata,
    #[serde(default)]
    pub oem_source_url: Option<String>,
    pub status: crate::workflow::WorkflowStatus,
    /// Serialized [`ScrubResult`], if the report has been scrubbed.
    #[serde(default)]
    pub scrub_result_json: Option<String>,
}

impl ReportRecord {
    pub fn scrub_result(&self) -> ScrubResult {
        self.scrub_result_json
            .as_deref()
            .map(ScrubResult::from_json_lenient)
            .unwrap_or_default()
    }
}
