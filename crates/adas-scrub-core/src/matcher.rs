//! Vehicle rule lookup and keyword-to-system matching.
//!
//! A vehicle resolves to at most one [`VehicleRuleSet`]: an exact model
//! match within the year range wins, otherwise the make's "All Models"
//! entry, otherwise nothing. An unmapped vehicle is not an error; it
//! simply produces an empty scrub result.

use tracing::debug;

use crate::canonical::normalize_key;
use crate::models::{CalibrationMatch, ScrubLine, ScrubResult, VehicleRuleSet};
use crate::normalize::EstimateLine;
use crate::repair::clean_description;

/// Make spellings that collapse onto one manufacturer key.
const MAKE_ALIASES: &[(&str, &str)] = &[
    ("mercedes", "mercedesbenz"),
    ("benz", "mercedesbenz"),
    ("mb", "mercedesbenz"),
    ("vw", "volkswagen"),
    ("chevy", "chevrolet"),
    ("alfa", "alfaromeo"),
    ("minicooper", "mini"),
    ("rangerover", "landrover"),
];

/// Manufacturer key: separators and case removed, aliases collapsed.
pub fn normalize_make(make: &str) -> String {
    let key = normalize_key(make);
    MAKE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(key)
}

/// Model key, compared case- and punctuation-insensitively.
pub fn normalize_model(model: &str) -> String {
    normalize_key(model)
}

/// Pick the rule set for a vehicle from `candidates`.
///
/// Overlapping exact candidates resolve to the narrowest year range, then
/// the earliest start year, so the choice never depends on input order.
pub fn select_vehicle<'a>(
    candidates: &'a [VehicleRuleSet],
    year: i32,
    make: &str,
    model: &str,
) -> Option<&'a VehicleRuleSet> {
    let make_key = normalize_make(make);
    let make_key = make_key.as_str();
    let model_key = normalize_model(model);
    let rank = |v: &&VehicleRuleSet| (v.year_end - v.year_start, v.year_start, v.model.clone());

    let in_scope = || {
        candidates
            .iter()
            .filter(move |v| v.covers_year(year) && normalize_make(&v.make) == make_key)
    };

    let exact = if model_key.is_empty() {
        None
    } else {
        in_scope()
            .filter(|v| !v.is_all_models() && normalize_model(&v.model) == model_key)
            .min_by_key(rank)
    };

    exact.or_else(|| in_scope().filter(|v| v.is_all_models()).min_by_key(rank))
}

/// Test every mapping keyword against every line.
///
/// Each keyword hit adds one match per system listed on the mapping.
/// Matches are unique per line by `(system_name, matched_keyword)`, and
/// lines without any match are left out of the result.
pub fn match_lines(lines: &[EstimateLine], vehicle: &VehicleRuleSet) -> ScrubResult {
    let mut out = Vec::new();

    for line in lines {
        let lower = line.text.to_lowercase();
        let mut entry = ScrubLine {
            line_number: line.line_number,
            description: clean_description(&line.text),
            calibration_matches: Vec::new(),
        };

        for mapping in &vehicle.mappings {
            for keyword in &mapping.keywords {
                let keyword = keyword.trim();
                if keyword.is_empty() || !lower.contains(&keyword.to_lowercase()) {
                    continue;
                }
                for system in mapping.systems.iter().map(|s| s.trim()) {
                    if system.is_empty() {
                        continue;
                    }
                    let added = entry.push_unique(CalibrationMatch {
                        system_name: system.to_string(),
                        calibration_type: vehicle.calibration_type_for(system).map(str::to_string),
                        reason: format!(
                            "{} requires {} calibration",
                            mapping.repair_operation.trim(),
                            system
                        ),
                        matched_keyword: keyword.to_string(),
                        repair_operation: mapping.repair_operation.trim().to_string(),
                        procedure_type: mapping.procedure_type.clone(),
                        procedure_name: mapping.procedure_name.clone(),
                        location: mapping.location.clone(),
                        tools_required: mapping.tools_required.clone(),
                        inferred: false,
                    });
                    if added {
                        debug!(line = line.line_number, system, keyword, "calibration match");
                    }
                }
            }
        }

        if !entry.calibration_matches.is_empty() {
            out.push(entry);
        }
    }

    ScrubResult::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdasSystem, CalibrationMapping};
    use crate::normalize::estimate_lines;

    fn vehicle(make: &str, model: &str, start: i32, end: i32) -> VehicleRuleSet {
        VehicleRuleSet {
            make: make.to_string(),
            model: model.to_string(),
            year_start: start,
            year_end: end,
            systems: vec![
                AdasSystem {
                    name: "Front Radar".to_string(),
                    calibration_type: Some("Static".to_string()),
                },
                AdasSystem {
                    name: "Blind Spot Monitoring".to_string(),
                    calibration_type: None,
                },
            ],
            mappings: vec![CalibrationMapping {
                repair_operation: "Bumper R&R".to_string(),
                keywords: vec!["bumper".to_string(), "bumper cover".to_string(), " ".to_string()],
                systems: vec!["Front Radar".to_string(), "Blind Spot Monitoring".to_string()],
                procedure_type: Some("Static".to_string()),
                procedure_name: None,
                location: None,
                tools_required: None,
            }],
        }
    }

    #[test]
    fn make_variants_collapse() {
        assert_eq!(normalize_make("Mercedes Benz"), normalize_make("Mercedes-Benz"));
        assert_eq!(normalize_make("MERCEDES_BENZ"), "mercedesbenz");
        assert_eq!(normalize_make("Mercedes"), "mercedesbenz");
        assert_eq!(normalize_make("VW"), "volkswagen");
        assert_eq!(normalize_make(" Toyota "), "toyota");
    }

    #[test]
    fn exact_model_before_all_models() {
        let rules = vec![
            vehicle("Mercedes-Benz", "All Models", 2015, 2025),
            vehicle("Mercedes-Benz", "C-Class", 2019, 2023),
        ];
        let picked = select_vehicle(&rules, 2021, "Mercedes Benz", "c class").map(|v| v.model.as_str());
        assert_eq!(picked, Some("C-Class"));

        let picked = select_vehicle(&rules, 2021, "mercedes-benz", "GLE").map(|v| v.model.as_str());
        assert_eq!(picked, Some("All Models"));

        let picked = select_vehicle(&rules, 2024, "Mercedes-Benz", "C-Class").map(|v| v.model.as_str());
        assert_eq!(picked, Some("All Models"));
    }

    #[test]
    fn unmapped_vehicle_is_none() {
        let rules = vec![vehicle("Toyota", "Camry", 2018, 2022)];
        assert!(select_vehicle(&rules, 2021, "Honda", "Civic").is_none());
        assert!(select_vehicle(&rules, 2017, "Toyota", "Camry").is_none());
        assert!(select_vehicle(&[], 2021, "Toyota", "Camry").is_none());
    }

    #[test]
    fn overlapping_candidates_resolve_deterministically() {
        let wide = vehicle("Toyota", "Camry", 2015, 2025);
        let narrow = vehicle("Toyota", "camry", 2020, 2022);
        let a = vec![wide.clone(), narrow.clone()];
        let b = vec![narrow, wide];
        let pa = select_vehicle(&a, 2021, "Toyota", "Camry").map(|v| v.year_start);
        let pb = select_vehicle(&b, 2021, "Toyota", "Camry").map(|v| v.year_start);
        assert_eq!(pa, Some(2020));
        assert_eq!(pa, pb);
    }

    #[test]
    fn keyword_hits_add_every_mapped_system() {
        let v = vehicle("Toyota", "Camry", 2018, 2022);
        let lines = estimate_lines("2 * Rpr Bumper cover\nHazardous waste");
        let result = match_lines(&lines, &v);
        assert_eq!(result.lines.len(), 1);
        let line = &result.lines[0];
        assert_eq!(line.line_number, 2);
        assert_eq!(line.description, "Bumper Cover - Repair");
        // two keywords x two systems
        assert_eq!(line.calibration_matches.len(), 4);
        let radar = &line.calibration_matches[0];
        assert_eq!(radar.system_name, "Front Radar");
        assert_eq!(radar.calibration_type.as_deref(), Some("Static"));
        assert_eq!(radar.matched_keyword, "bumper");
        assert!(radar.reason.contains("Bumper R&R"));
        assert_eq!(line.calibration_matches[1].calibration_type, None);
    }

    #[test]
    fn duplicate_keywords_do_not_duplicate_matches() {
        let mut v = vehicle("Toyota", "Camry", 2018, 2022);
        let mut again = v.mappings[0].clone();
        again.keywords = vec!["BUMPER".to_string()];
        v.mappings.push(again);
        let lines = estimate_lines("Front bumper");
        let result = match_lines(&lines, &v);
        let matches = &result.lines[0].calibration_matches;
        for (i, a) in matches.iter().enumerate() {
            for b in &matches[i + 1..] {
                assert!(!a.same_trigger(b), "duplicate trigger {a:?}");
            }
        }
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn address_lines_never_match() {
        let mut v = vehicle("Toyota", "Camry", 2018, 2022);
        v.mappings[0].keywords = vec!["ave".to_string()];
        let lines = estimate_lines("123 NW 5th Ave\nRpr Ave bracket");
        let result = match_lines(&lines, &v);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].line_number, 1);
    }
}
