//! Estimate text normalization.
//!
//! Splits raw estimate text into trimmed, non-empty lines and discards
//! supplier boilerplate (street addresses, phone/fax numbers, "City, ST
//! ZIP" lines, vendor quality codes followed by an address). Discarded
//! lines take no part in repair detection or calibration matching, and do
//! not consume a positional line number.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::line_number::{extract_line_number, resolve_line_number};
use crate::repair::{detect_component, detect_operation};

const STREET_TYPES: &str = r"(?:st|street|ave|avenue|blvd|boulevard|rd|road|dr|drive|ln|lane|hwy|highway|pkwy|parkway|ct|court|way|pl|place|cir|circle|ter|terrace|trl|trail)";

/// Number + directional + optional street name + street-type token.
static STREET_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b\d{{1,6}}\s+(?:n|s|e|w|ne|nw|se|sw|north|south|east|west)\.?\s+(?:[a-z0-9]+\.?\s+){{0,4}}{STREET_TYPES}\b\.?"
    ))
    .expect("street address pattern")
});

static PHONE_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:phone|ph|tel|fax)\b\s*[.:#]?\s*\(?\d{3}").expect("phone label pattern")
});

static PHONE_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d{3}\)\s*\d{3}[\s.-]\d{4}\b").expect("phone paren pattern"));

static PHONE_DASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}[.-]\d{3}[.-]\d{4}\b").expect("phone dashed pattern"));

/// A whole line of `City, ST 12345[-6789]`.
static CITY_STATE_ZIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z .'-]*),\s*([A-Z]{2})\s+\d{5}(?:-\d{4})?\s*$")
        .expect("city/state/zip pattern")
});

/// Side codes that follow a part name the way a state follows a city.
const SIDE_CODES: &[&str] = &["LT", "RT", "LH", "RH", "LF", "RF", "LR", "RR"];

/// Vendor quality marker followed by something that reads like an address.
static VENDOR_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^\W*(?:a/m|aftermarket|capa|oem|opt\s+oem|nsf|lkq|reman|recond)\b.*\b\d{{2,6}}\s+(?:[a-z0-9]+\.?\s+){{1,4}}{STREET_TYPES}\b"
    ))
    .expect("vendor address pattern")
});

/// A surviving estimate line with its resolved line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateLine {
    /// 1-based position among the surviving lines.
    pub position: u32,
    /// Estimate-native number when recoverable, else the first free
    /// number from `position` up.
    pub line_number: u32,
    pub text: String,
}

/// Split on line breaks, trim, and drop empty lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// True for supplier or vendor boilerplate that must be discarded.
pub fn is_supplier_line(line: &str) -> bool {
    STREET_ADDRESS.is_match(line)
        || PHONE_LABELLED.is_match(line)
        || PHONE_PAREN.is_match(line)
        || PHONE_DASHED.is_match(line)
        || is_city_state_zip(line)
        || VENDOR_ADDRESS.is_match(line)
}

fn is_city_state_zip(line: &str) -> bool {
    let Some(caps) = CITY_STATE_ZIP.captures(line) else {
        return false;
    };
    let city = &caps[1];
    !SIDE_CODES.contains(&&caps[2])
        && detect_operation(city).is_none()
        && detect_component(city).is_none()
}

/// Normalize raw estimate text into numbered, filtered lines.
///
/// Positional fallback numbers skip every number the estimate itself
/// uses, so a fallback line never shares its number with a native one.
pub fn estimate_lines(text: &str) -> Vec<EstimateLine> {
    let kept: Vec<String> = split_lines(text)
        .into_iter()
        .filter(|raw| {
            let supplier = is_supplier_line(raw);
            if supplier {
                tracing::debug!(line = %raw, "dropping supplier line");
            }
            !supplier
        })
        .collect();

    let mut taken: BTreeSet<u32> = kept.iter().filter_map(|raw| extract_line_number(raw)).collect();
    let mut out = Vec::with_capacity(kept.len());
    for (idx, raw) in kept.into_iter().enumerate() {
        let position = idx as u32 + 1;
        let line_number = resolve_line_number(&raw, position, &taken);
        taken.insert(line_number);
        out.push(EstimateLine {
            position,
            line_number,
            text: raw,
        });
    }
    out
}
