//! Heuristic calibration inference.
//!
//! A second pass over already-detected repairs that suggests calibrations
//! the vehicle's rule table does not cover. It never looks at rule data;
//! [`crate::group::merge_inferred`] decides which suggestions survive.
//!
//! Besides the per-repair rules, free text such as "steering angle reset
//! required per line 14" is attributed to the referenced line.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::canonical::{recommended_operation, FORWARD_CAMERA, FRONT_RADAR, STEERING_ANGLE_SENSOR};
use crate::models::{CalibrationMatch, ScrubLine, ScrubResult};
use crate::normalize::EstimateLine;
use crate::repair::{clean_description, RepairOperation};

/// `(pattern, system, calibration type, front only)`, evaluated against
/// the text of every repair.
const INFERENCE_RULES: &[(&str, &str, &str, bool)] = &[
    (
        r"(?i)\b(?:alignment|align|suspension|steering|tie\s*rod|control\s+arm|strut|knuckle|subframe)\b",
        STEERING_ANGLE_SENSOR,
        "Reset",
        false,
    ),
    (
        r"(?i)\b(?:windshield|windscreen|camera|head\s*(?:lamp|light)s?)\b",
        FORWARD_CAMERA,
        "Static",
        true,
    ),
    (
        r"(?i)\b(?:(?:front|frt|fr)\s+bumper|grilles?|grill|radar(?:\s+sensor)?)\b",
        FRONT_RADAR,
        "Static",
        true,
    ),
];

struct InferenceRule {
    pattern: Regex,
    system: &'static str,
    kind: &'static str,
    front_only: bool,
}

static RULES: LazyLock<Vec<InferenceRule>> = LazyLock::new(|| {
    INFERENCE_RULES
        .iter()
        .map(|(pattern, system, kind, front_only)| InferenceRule {
            pattern: Regex::new(pattern).expect("inference pattern"),
            system: *system,
            kind: *kind,
            front_only: *front_only,
        })
        .collect()
});

/// Rear, side, and parking locations; front-system rules never fire on these.
static NON_FRONT_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:rear|rr|side|back\s*up|backup|reverse|park(?:ing)?|blind\s*spot|surround|360|quarter|qtr|liftgate|tailgate|trunk)\b",
    )
    .expect("non-front location pattern")
});

/// Steering mention, then an explicit "line N" reference.
static STEERING_THEN_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(steering|alignment|sas)\b.*?\bline\s*(?:#|no\.?)?\s*(\d{1,3})\b")
        .expect("steering reference pattern")
});

/// "line N" reference, then a steering mention.
static LINE_THEN_STEERING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bline\s*(?:#|no\.?)?\s*(\d{1,3})\b.*?\b(steering|alignment|sas)\b")
        .expect("line reference pattern")
});

/// Suggest calibrations for detected repairs.
///
/// Every returned match has `inferred` set. Output lines are ordered by
/// line number and carry at most one match per `(system, keyword)`.
pub fn infer_matches(lines: &[EstimateLine], repairs: &[RepairOperation]) -> ScrubResult {
    let mut by_line: BTreeMap<u32, ScrubLine> = BTreeMap::new();

    for repair in repairs {
        let non_front = NON_FRONT_LOCATION.is_match(&repair.text);
        for rule in RULES.iter() {
            if rule.front_only && non_front {
                continue;
            }
            let Some(hit) = rule.pattern.find(&repair.text) else {
                continue;
            };
            let (system, kind) = (rule.system, rule.kind);
            let entry = by_line.entry(repair.line_number).or_insert_with(|| ScrubLine {
                line_number: repair.line_number,
                description: repair.description.clone(),
                calibration_matches: Vec::new(),
            });
            entry.push_unique(inferred_match(
                system,
                kind,
                &hit.as_str().to_lowercase(),
                &repair.category,
                format!("Inferred: {} suggests {}", repair.category, recommended_operation(system)),
            ));
        }
    }

    for line in lines {
        let Some((keyword, target)) = steering_reference(&line.text) else {
            continue;
        };
        let description = lines
            .iter()
            .find(|l| l.line_number == target)
            .map(|l| clean_description(&l.text))
            .unwrap_or_else(|| clean_description(&line.text));
        let entry = by_line.entry(target).or_insert_with(|| ScrubLine {
            line_number: target,
            description,
            calibration_matches: Vec::new(),
        });
        entry.push_unique(inferred_match(
            STEERING_ANGLE_SENSOR,
            "Reset",
            &keyword,
            "Steering",
            format!("Inferred: steering work referenced on line {target}"),
        ));
    }

    ScrubResult::new(by_line.into_values().collect())
}

fn steering_reference(text: &str) -> Option<(String, u32)> {
    let (keyword, number) = if let Some(caps) = STEERING_THEN_LINE.captures(text) {
        (caps[1].to_lowercase(), caps[2].parse::<u32>().ok()?)
    } else {
        let caps = LINE_THEN_STEERING.captures(text)?;
        (caps[2].to_lowercase(), caps[1].parse::<u32>().ok()?)
    };
    (number > 0).then_some((keyword, number))
}

fn inferred_match(system: &str, kind: &str, keyword: &str, operation: &str, reason: String) -> CalibrationMatch {
    CalibrationMatch {
        system_name: system.to_string(),
        calibration_type: Some(kind.to_string()),
        reason,
        matched_keyword: keyword.to_string(),
        repair_operation: operation.to_string(),
        procedure_type: None,
        procedure_name: None,
        location: None,
        tools_required: None,
        inferred: true,
    }
}
