//! Grouping of calibration matches by canonical operation.
//!
//! Matches are collapsed onto the key of the operation recommended for
//! their canonical system, so "SAS" on line 3 and "Steering angle sensor"
//! on line 9 become one "Steering Angle Sensor Reset" group triggered by
//! lines 3 and 9.
//!
//! Matches are accumulated in a fixed order (line number, description,
//! system, keyword, type) so the groups, and the first-seen order used
//! when merging calibration types, do not depend on input line order.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::canonical::{
    canonical_operation_name, canonical_system_name, merge_calibration_types, operation_key,
    recommended_operation,
};
use crate::models::{CalibrationMatch, GroupedCalibration, ScrubLine, ScrubResult};

#[derive(Default)]
struct Accumulator {
    labels: BTreeSet<String>,
    types: Vec<String>,
    lines: BTreeSet<u32>,
    descriptions: Vec<String>,
    keywords: Vec<String>,
    all_inferred: bool,
}

/// Group every match of `result` by canonical operation key.
///
/// Output is ordered by lowest trigger line, then system name, then key.
pub fn group_calibrations(result: &ScrubResult, type_separator: &str) -> Vec<GroupedCalibration> {
    let mut rows: Vec<(&ScrubLine, &CalibrationMatch)> = result
        .lines
        .iter()
        .flat_map(|line| line.calibration_matches.iter().map(move |m| (line, m)))
        .collect();
    rows.sort_by(|(la, ma), (lb, mb)| {
        la.line_number
            .cmp(&lb.line_number)
            .then_with(|| la.description.cmp(&lb.description))
            .then_with(|| ma.system_name.cmp(&mb.system_name))
            .then_with(|| ma.matched_keyword.cmp(&mb.matched_keyword))
            .then_with(|| ma.calibration_type.cmp(&mb.calibration_type))
    });

    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for (line, m) in rows {
        let key = operation_key(&m.system_name, &m.repair_operation);
        if key.is_empty() {
            continue;
        }
        let acc = groups.entry(key).or_insert_with(|| Accumulator {
            all_inferred: true,
            ..Accumulator::default()
        });
        acc.labels
            .insert(canonical_system_name(&m.system_name, Some(&m.repair_operation)));
        if let Some(t) = &m.calibration_type {
            acc.types.push(t.clone());
        }
        acc.lines.insert(line.line_number);
        if !line.description.is_empty() && !acc.descriptions.contains(&line.description) {
            acc.descriptions.push(line.description.clone());
        }
        let keyword = m.matched_keyword.trim();
        if !keyword.is_empty() && !acc.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            acc.keywords.push(keyword.to_string());
        }
        acc.all_inferred &= m.inferred;
    }

    let mut out: Vec<GroupedCalibration> = groups
        .into_iter()
        .map(|(key, acc)| {
            let system_name = acc.labels.into_iter().next().unwrap_or_default();
            GroupedCalibration {
                operation: canonical_operation_name(&recommended_operation(&system_name)),
                operation_key: key,
                system_name,
                calibration_type: merge_calibration_types(acc.types.iter().map(String::as_str), type_separator),
                trigger_lines: acc.lines.into_iter().collect(),
                trigger_descriptions: acc.descriptions,
                matched_keywords: acc.keywords,
                inferred: acc.all_inferred,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        a.trigger_lines
            .first()
            .cmp(&b.trigger_lines.first())
            .then_with(|| a.system_name.cmp(&b.system_name))
            .then_with(|| a.operation_key.cmp(&b.operation_key))
    });
    out
}

/// Fold inferred matches into `primary` for operations it does not cover.
///
/// Direct matches always win: an inferred match is kept only when no
/// primary match shares its canonical operation key. Inferred matches on a
/// line already in `primary` join that line; other lines are inserted in
/// line-number order.
pub fn merge_inferred(primary: &ScrubResult, inferred: &ScrubResult) -> ScrubResult {
    let covered: HashSet<String> = primary
        .lines
        .iter()
        .flat_map(|l| &l.calibration_matches)
        .map(|m| operation_key(&m.system_name, &m.repair_operation))
        .collect();

    let mut merged = primary.clone();
    for line in &inferred.lines {
        let extra: Vec<&CalibrationMatch> = line
            .calibration_matches
            .iter()
            .filter(|m| !covered.contains(&operation_key(&m.system_name, &m.repair_operation)))
            .collect();
        if extra.is_empty() {
            continue;
        }

        let idx = match merged.lines.iter().position(|l| l.line_number == line.line_number) {
            Some(idx) => idx,
            None => {
                let at = merged
                    .lines
                    .iter()
                    .position(|l| l.line_number > line.line_number)
                    .unwrap_or(merged.lines.len());
                merged.lines.insert(
                    at,
                    ScrubLine {
                        line_number: line.line_number,
                        description: line.description.clone(),
                        calibration_matches: Vec::new(),
                    },
                );
                at
            }
        };
        for m in extra {
            merged.lines[idx].push_unique(m.clone());
        }
    }
    merged
}
