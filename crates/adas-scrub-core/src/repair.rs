//! Repair-operation detection and description cleaning.
//!
//! Each estimate line is classified by an ordered table of
//! `(predicate, category)` rules evaluated top-down; the first rule whose
//! patterns all match wins, so a line never carries more than one
//! category. Specific variants (bumper overhaul, bumper R&I, ...) come
//! before their generic forms.
//!
//! Estimate lines interleave part numbers, prices, and supplier codes
//! with no consistent delimiter. [`clean_description`] turns such a line
//! into a short human-readable label:
//!
//! 1. Detect an operation verb from a fixed prefix set.
//! 2. Detect a component from an ordered, most-specific-first list.
//! 3. Component found: title-case it, append `" - <Operation>"` when an
//!    operation was detected.
//! 4. Otherwise strip line numbers, operation prefixes, part numbers,
//!    prices, inclusion markers, quality-grade codes, and quantities, then
//!    title-case what is left.
//! 5. Nothing usable left: a quality-grade label or a truncated excerpt.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::normalize::EstimateLine;

const BUMPER: &str = r"(?i)\b(?:bumper|bmpr)\b";
const GRILLE: &str = r"(?i)\bgrille?\b";
const OVERHAUL: &str = r"(?i)(?:\bo/h\b|\boverhaul\b)";
const R_AND_I: &str = r"(?i)(?:\br\s*&\s*i\b|\br/i\b|\bremove\s+(?:&|and)\s+install\b)";
const R_AND_R: &str = r"(?i)(?:\br\s*&\s*r\b|\br/r\b|\brepl\b|\breplace(?:ment)?\b)";
const REPAIR: &str = r"(?i)\b(?:rpr|repair)\b";

/// Ordered category rules; every pattern of a rule must match.
const CATEGORY_RULES: &[(&[&str], &str)] = &[
    (&[OVERHAUL, BUMPER], "Bumper Overhaul"),
    (&[R_AND_I, BUMPER], "Bumper R&I"),
    (&[R_AND_R, BUMPER], "Bumper R&R"),
    (&[REPAIR, BUMPER], "Bumper Repair"),
    (&[BUMPER], "Bumper"),
    (&[R_AND_I, GRILLE], "Grille R&I"),
    (&[R_AND_R, GRILLE], "Grille Replacement"),
    (&[GRILLE], "Grille"),
    (
        &[r"(?i)\b(?:windshield|windscreen|w/s\s+glass|front\s+glass)\b"],
        "Windshield Replacement",
    ),
    (&[r"(?i)\bmirrors?\b"], "Mirror"),
    (&[r"(?i)\bhead\s*(?:lamp|light)s?\b"], "Headlamp"),
    (
        &[r"(?i)\b(?:radar|camera|lidar|sensor|distance\s+sensor|acc\s+module)s?\b"],
        "Radar/Camera",
    ),
    (
        &[r"(?i)\b(?:fender|quarter\s+panel|qtr\s+panel|hood|doors?|door\s+shell|door\s+skin)\b"],
        "Body Panel",
    ),
    (
        &[r"(?i)\b(?:alignment|align|suspension|steering|tie\s*rod|control\s+arm|strut|knuckle|subframe)\b"],
        "Suspension/Steering",
    ),
    (
        &[r"(?i)\b(?:calibrat\w*|recalibrat\w*|aim|aiming|adas)\b"],
        "Calibration",
    ),
    (
        &[r"(?i)\b(?:refinish|refn|rfn|paint|clear\s*coat|blend|blnd)\b"],
        "Refinish",
    ),
    (
        &[r"(?i)\b(?:frame|rail|apron|pillar|structural|unibody|rocker|weld)\b"],
        "Structural",
    ),
    (&[r"(?i)\broof\b"], "Roof"),
    (
        &[r"(?i)\b(?:trunk|liftgate|lift\s+gate|tailgate|deck\s*lid|hatch)\b"],
        "Trunk/Liftgate",
    ),
];

/// Ordered component names, most specific first.
const COMPONENTS: &[(&str, &str)] = &[
    (r"front\s+bumper\s*(?:&|and)\s*grille", "front bumper & grille"),
    (r"(?:front|frt|fr)\s+bumper\s+(?:cover|fascia)", "front bumper cover"),
    (r"(?:rear|rr)\s+bumper\s+(?:cover|fascia)", "rear bumper cover"),
    (r"(?:front|frt|fr)\s+bumper", "front bumper"),
    (r"(?:rear|rr)\s+bumper", "rear bumper"),
    (r"bumper\s+(?:cover|fascia)", "bumper cover"),
    (r"bumper\s+reinf(?:orcement)?|reinf(?:orcement)?\s+bar", "bumper reinforcement"),
    (r"bumper", "bumper"),
    (r"grille?", "grille"),
    (r"windshield|windscreen", "windshield"),
    (r"(?:outside|side|door)\s+mirror", "outside mirror"),
    (r"mirror", "mirror"),
    (r"head\s*(?:lamp|light)", "headlamp"),
    (r"fog\s*(?:lamp|light)", "fog lamp"),
    (r"radar(?:\s+sensor)?", "radar sensor"),
    (r"camera", "camera"),
    (r"quarter\s+panel|qtr\s+panel", "quarter panel"),
    (r"fender", "fender"),
    (r"hood", "hood"),
    (r"door", "door"),
    (r"liftgate|lift\s+gate", "liftgate"),
    (r"trunk\s+lid|deck\s*lid", "trunk lid"),
    (r"tailgate", "tailgate"),
    (r"roof(?:\s+panel)?", "roof"),
    (r"(?:four|4)\s+wheel\s+alignment|wheel\s+alignment|alignment", "wheel alignment"),
    (r"tie\s*rod", "tie rod"),
    (r"control\s+arm", "control arm"),
    (r"strut", "strut"),
    (r"knuckle", "steering knuckle"),
];

/// Operation verb prefixes and their display form.
const OPERATION_PREFIXES: &[(&str, &str)] = &[
    (r"r\s*&\s*i|r/i", "R&I"),
    (r"r\s*&\s*r|r/r|repl|replace", "Replace"),
    (r"o/h|overhaul", "Overhaul"),
    (r"rpr|repair", "Repair"),
    (r"refn|rfn|refinish|blnd|blend", "Refinish"),
];

/// Quality-grade codes and their fallback labels.
const QUALITY_GRADES: &[(&str, &str)] = &[
    (r"opt\s+oem", "Optional OEM Part"),
    (r"oem", "OEM Part"),
    (r"a/m|aftermarket", "Aftermarket Part"),
    (r"capa", "CAPA Certified Part"),
    (r"nsf", "NSF Certified Part"),
    (r"lkq|used|recycled", "Recycled Part"),
    (r"reman|recond", "Remanufactured Part"),
];

const EXCERPT_CHARS: usize = 60;

struct CategoryRule {
    patterns: Vec<Regex>,
    category: &'static str,
}

static CATEGORY_TABLE: LazyLock<Vec<CategoryRule>> = LazyLock::new(|| {
    CATEGORY_RULES
        .iter()
        .map(|(patterns, category)| CategoryRule {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("category pattern"))
                .collect(),
            category: *category,
        })
        .collect()
});

static COMPONENT_TABLE: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    COMPONENTS
        .iter()
        .map(|(p, name)| {
            (
                Regex::new(&format!(r"(?i)\b(?:{p})\b")).expect("component pattern"),
                *name,
            )
        })
        .collect()
});

static OPERATION_TABLE: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    OPERATION_PREFIXES
        .iter()
        .map(|(p, label)| {
            (
                Regex::new(&format!(r"(?i)^[\s*#]*(?:{p})\b[\s*#.:-]*")).expect("operation pattern"),
                *label,
            )
        })
        .collect()
});

static QUALITY_TABLE: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    QUALITY_GRADES
        .iter()
        .map(|(p, label)| {
            (
                Regex::new(&format!(r"(?i)(?:^|[^a-z0-9/])(?:{p})(?:$|[^a-z0-9/])"))
                    .expect("quality pattern"),
                *label,
            )
        })
        .collect()
});

static LEADING_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s*#>]*\d{1,3}(?:[\s*#.)]+|$)").expect("leading index pattern"));

/// Noise removed, in order, when no component is recognised.
static NOISE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // part numbers: any token carrying a run of 5+ digits
        r"\b[\w-]*\d{5,}[\w-]*",
        // prices and decimal hours
        r"\$?\d[\d,]*\.\d+",
        r"(?i)\b(?:incl\.?|included|inc\.|n/c|no\s+charge)(?:\s|$)",
        r"(?i)(?:^|\s)(?:opt\s+oem|oem|a/m|aftermarket|capa|nsf|lkq|used|recycled|reman|recond|new|existing)(?:\s|$)",
        r"(?i)\bqty\s*:?\s*\d+\b",
        r"(?i)\b\d+\s*(?:ea|pcs?|x)\b",
        r"(?i)\bx\s*\d+\b",
        r"\b\d+\b",
        r"[*#$]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("noise pattern"))
    .collect()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// A detected repair operation on one estimate line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOperation {
    pub line_number: u32,
    pub category: String,
    pub description: String,
    pub text: String,
}

/// Category of the first matching rule, if any.
pub fn classify(line: &str) -> Option<&'static str> {
    CATEGORY_TABLE
        .iter()
        .find(|rule| rule.patterns.iter().all(|p| p.is_match(line)))
        .map(|rule| rule.category)
}

/// Classify one estimate line.
pub fn detect_repair(line: &EstimateLine) -> Option<RepairOperation> {
    let category = classify(&line.text)?;
    Some(RepairOperation {
        line_number: line.line_number,
        category: category.to_string(),
        description: clean_description(&line.text),
        text: line.text.clone(),
    })
}

/// Classify every line; lines matching no rule are skipped.
pub fn detect_repairs(lines: &[EstimateLine]) -> Vec<RepairOperation> {
    lines.iter().filter_map(detect_repair).collect()
}

/// Operation verb at the start of the line (after any line index).
pub fn detect_operation(line: &str) -> Option<&'static str> {
    let body = strip_leading_index(line);
    OPERATION_TABLE
        .iter()
        .find(|(re, _)| re.is_match(body))
        .map(|(_, label)| *label)
}

/// First component named on the line, most specific first.
pub fn detect_component(line: &str) -> Option<&'static str> {
    COMPONENT_TABLE
        .iter()
        .find(|(re, _)| re.is_match(line))
        .map(|(_, name)| *name)
}

/// Human-readable description of a raw estimate line.
pub fn clean_description(line: &str) -> String {
    let operation = detect_operation(line);

    if let Some(component) = detect_component(line) {
        let mut out = title_case(component);
        if let Some(op) = operation {
            out.push_str(" - ");
            out.push_str(op);
        }
        return out;
    }

    let mut rest = strip_leading_index(line).to_string();
    if let Some((re, _)) = OPERATION_TABLE.iter().find(|(re, _)| re.is_match(&rest)) {
        rest = re.replace(&rest, "").into_owned();
    }
    // Adjacent tokens share a separator, so repeat until nothing matches.
    for re in NOISE.iter() {
        while re.is_match(&rest) {
            rest = re.replace_all(&rest, " ").into_owned();
        }
    }
    let rest = WHITESPACE.replace_all(&rest, " ");
    let rest = rest.trim_matches(|c: char| c.is_whitespace() || ",;:.-/()".contains(c));

    if rest.chars().filter(|c| c.is_alphabetic()).count() >= 2 {
        return title_case(rest);
    }

    if let Some((_, label)) = QUALITY_TABLE.iter().find(|(re, _)| re.is_match(line)) {
        return label.to_string();
    }
    excerpt(line)
}

/// Capitalize the first letter of every word and lowercase the rest.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn strip_leading_index(line: &str) -> &str {
    match LEADING_INDEX.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

fn excerpt(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bumper_variants_first_match_wins() {
        assert_eq!(classify("7 O/H Front bumper"), Some("Bumper Overhaul"));
        assert_eq!(classify("12 R&I Front bumper"), Some("Bumper R&I"));
        assert_eq!(classify("3 Repl Rear bumper cover"), Some("Bumper R&R"));
        assert_eq!(classify("2 * Rpr Bumper cover"), Some("Bumper Repair"));
        assert_eq!(classify("Bumper cover"), Some("Bumper"));
    }

    #[test]
    fn other_categories() {
        assert_eq!(classify("5 R&I Grille"), Some("Grille R&I"));
        assert_eq!(classify("5 Repl Grille assy"), Some("Grille Replacement"));
        assert_eq!(classify("14 Repl Windshield"), Some("Windshield Replacement"));
        assert_eq!(classify("Repl LT Mirror glass"), Some("Mirror"));
        assert_eq!(classify("Repl RT Headlamp assy"), Some("Headlamp"));
        assert_eq!(classify("R&I Radar sensor"), Some("Radar/Camera"));
        assert_eq!(classify("Rpr LT Fender"), Some("Body Panel"));
        assert_eq!(classify("Four wheel alignment"), Some("Suspension/Steering"));
        assert_eq!(classify("Static calibration"), Some("Calibration"));
        assert_eq!(classify("Clear coat"), Some("Refinish"));
        assert_eq!(classify("Pull frame rail"), Some("Structural"));
        assert_eq!(classify("Rpr Roof"), Some("Roof"));
        assert_eq!(classify("R&I Liftgate"), Some("Trunk/Liftgate"));
        assert_eq!(classify("Hazardous waste disposal"), None);
    }

    #[test]
    fn component_with_operation() {
        assert_eq!(clean_description("2 * Rpr Bumper cover"), "Bumper Cover - Repair");
        assert_eq!(clean_description("14 Repl Windshield 5610106260 OEM 612.40"), "Windshield - Replace");
        assert_eq!(clean_description("12 R&I Front bumper & grille"), "Front Bumper & Grille - R&I");
        assert_eq!(clean_description("Front bumper cover"), "Front Bumper Cover");
    }

    #[test]
    fn most_specific_component_first() {
        assert_eq!(detect_component("frt bumper cover"), Some("front bumper cover"));
        assert_eq!(detect_component("LT outside mirror"), Some("outside mirror"));
        assert_eq!(detect_component("bumpers"), None);
    }

    #[test]
    fn noise_is_stripped_without_component() {
        assert_eq!(
            clean_description("8 Repl Emblem 75311-0E010 A/M 2 ea 24.50 Incl."),
            "Emblem"
        );
        assert_eq!(clean_description("Hazardous waste disposal 3.00"), "Hazardous Waste Disposal");
    }

    #[test]
    fn fallback_to_quality_label_or_excerpt() {
        assert_eq!(clean_description("9 A/M 5211906953 112.00"), "Aftermarket Part");
        assert_eq!(clean_description("4 OEM 86790-0E040"), "OEM Part");
        assert_eq!(clean_description("9 A/M CAPA 5211906953"), "Aftermarket Part");
        assert_eq!(clean_description("5211906953 112.00"), "5211906953 112.00");
    }

    #[test]
    fn operations_from_prefix_only() {
        assert_eq!(detect_operation("2 * Rpr Bumper cover"), Some("Repair"));
        assert_eq!(detect_operation("R & I Grille"), Some("R&I"));
        assert_eq!(detect_operation("Bumper cover rpr"), None);
    }

    #[test]
    fn detect_repairs_uses_line_numbers() {
        let lines = crate::normalize::estimate_lines("Header\n2 * Rpr Bumper cover\nShop supplies");
        let repairs = detect_repairs(&lines);
        assert_eq!(repairs.len(), 1);
        assert_eq!(repairs[0].line_number, 2);
        assert_eq!(repairs[0].category, "Bumper Repair");
        assert_eq!(repairs[0].description, "Bumper Cover - Repair");
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("front BUMPER  cover"), "Front Bumper Cover");
        assert_eq!(title_case(""), "");
    }
}
