//! Estimate-native line number recovery.
//!
//! Structured invoices number their lines (`"2 * Rpr Bumper cover"`,
//! `"14 Repl Windshield"`, `"3 FRONT BUMPER"`). When that number can be
//! recovered it is kept so reviewers can cross-reference the paper/PDF
//! estimate; otherwise the 1-based position among filtered lines is used,
//! moved past any number already taken.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Leading 1–3 digit index, separators/emphasis markers, then an operation code.
static OPERATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[\s*#>]*(\d{1,3})[\s*#.)]+(?:rpr|repair|repl|replace|o/h|oh|overhaul|r\s*&\s*i|r/i|r\s*&\s*r|r/r|subl|sublet|add|blnd|blend|refn|rfn|refinish)\b",
    )
    .expect("operation line pattern")
});

/// Leading index followed by an all-caps section header.
static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s*#]*(\d{1,3})[\s.)]+([A-Z][A-Z &/,'-]*[A-Z])\s*$").expect("section header pattern")
});

/// Recover the estimate's own line index, if the line carries one.
pub fn extract_line_number(line: &str) -> Option<u32> {
    if let Some(caps) = OPERATION_LINE.captures(line) {
        return parse_index(&caps[1]);
    }
    let caps = SECTION_HEADER.captures(line)?;
    let letters = caps[2].chars().filter(|c| c.is_ascii_alphabetic()).count();
    if letters < 3 {
        return None;
    }
    parse_index(&caps[1])
}

/// Estimate-native line number, else the first number from `position`
/// up that is not in `taken`.
pub fn resolve_line_number(line: &str, position: u32, taken: &BTreeSet<u32>) -> u32 {
    if let Some(n) = extract_line_number(line) {
        return n;
    }
    let mut n = position;
    while taken.contains(&n) {
        n += 1;
    }
    n
}

fn parse_index(digits: &str) -> Option<u32> {
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}
