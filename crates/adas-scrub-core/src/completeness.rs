//! Completeness scoring for submission readiness.
//!
//! A report is scored by a fixed list of weighted boolean checks. Each
//! passing check contributes its weight; with the default weights the
//! score is out of 100.
//!
//! | Check | Default weight | Passes when |
//! |-------|----------------|-------------|
//! | VIN | 15 | VIN in metadata or a VIN-shaped token in the estimate |
//! | Reference number | 10 | metadata reference, or an RO/estimate number in the text |
//! | Shop / claim | 10 | shop name or claim number present |
//! | Calibrations | 30 | at least one grouped calibration |
//! | Trigger evidence | 15 | every group names at least one trigger line |
//! | OEM source | 10 | [`is_usable_oem_url`] accepts the source URL |
//! | Date | 10 | estimate date in metadata or a date in the text |
//!
//! `ready_for_submission` requires the score to reach the threshold
//! (85 by default) **and** at least one grouped calibration.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{GroupedCalibration, ReportMetadata};

static VIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[A-HJ-NPR-Z0-9]{17}\b").expect("vin pattern"));

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:r\.?o\.?|repair\s+order|ref(?:erence)?|estimate|workfile)\s*(?:#|no\.?|number|id)?\s*[:#]?\s*(?:[A-Z]{1,6}-?)?\d[A-Z0-9-]{2,}")
        .expect("reference pattern")
});

static CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bclaim\s*(?:#|no\.?|number)?\s*[:#]?\s*(?:[A-Z]{1,6}-?)?\d[A-Z0-9-]{2,}").expect("claim pattern")
});

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/(?:\d{4}|\d{2}))\b").expect("date pattern")
});

const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip"];

/// Weight per check plus the readiness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletenessWeights {
    pub vin: u32,
    pub reference_number: u32,
    pub shop_claim: u32,
    pub calibrations: u32,
    pub trigger_evidence: u32,
    pub oem_source: u32,
    pub date: u32,
    pub ready_threshold: u32,
}

impl Default for CompletenessWeights {
    fn default() -> Self {
        Self {
            vin: 15,
            reference_number: 10,
            shop_claim: 10,
            calibrations: 30,
            trigger_evidence: 15,
            oem_source: 10,
            date: 10,
            ready_threshold: 85,
        }
    }
}

impl CompletenessWeights {
    /// Sum of all check weights (the threshold is not a weight).
    pub fn total(&self) -> u32 {
        self.vin
            + self.reference_number
            + self.shop_claim
            + self.calibrations
            + self.trigger_evidence
            + self.oem_source
            + self.date
    }
}

/// Everything the scorer looks at for one report.
#[derive(Debug, Clone, Copy)]
pub struct CompletenessInput<'a> {
    pub estimate_text: &'a str,
    pub metadata: &'a ReportMetadata,
    pub groups: &'a [GroupedCalibration],
    pub oem_source_url: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessCheck {
    pub key: String,
    pub label: String,
    pub weight: u32,
    pub passed: bool,
}

/// Derived readiness of a report; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessAssessment {
    pub score: u32,
    pub checks: Vec<CompletenessCheck>,
    pub ready_for_submission: bool,
    /// Labels of the failed checks, in check order.
    pub missing: Vec<String>,
}

/// Score `input` against `weights`.
pub fn assess(input: &CompletenessInput<'_>, weights: &CompletenessWeights) -> CompletenessAssessment {
    let meta = input.metadata;
    let text = input.estimate_text;

    let checks = vec![
        check("vin", "VIN", weights.vin, has_vin(meta, text)),
        check(
            "reference_number",
            "Reference number",
            weights.reference_number,
            present(&meta.reference_number) || REFERENCE.is_match(text),
        ),
        check(
            "shop_claim",
            "Shop / claim details",
            weights.shop_claim,
            present(&meta.shop_name) || present(&meta.claim_number) || CLAIM.is_match(text),
        ),
        check("calibrations", "Calibrations identified", weights.calibrations, !input.groups.is_empty()),
        check(
            "trigger_evidence",
            "Trigger line evidence",
            weights.trigger_evidence,
            !input.groups.is_empty() && input.groups.iter().all(|g| !g.trigger_lines.is_empty()),
        ),
        check(
            "oem_source",
            "OEM source",
            weights.oem_source,
            input.oem_source_url.is_some_and(is_usable_oem_url),
        ),
        check(
            "date",
            "Estimate date",
            weights.date,
            present(&meta.estimate_date) || DATE.is_match(text),
        ),
    ];

    let score = checks.iter().filter(|c| c.passed).map(|c| c.weight).sum();
    let missing = checks.iter().filter(|c| !c.passed).map(|c| c.label.clone()).collect();

    CompletenessAssessment {
        score,
        ready_for_submission: score >= weights.ready_threshold && !input.groups.is_empty(),
        checks,
        missing,
    }
}

/// True for an `http(s)` URL with a host that is not a direct document link.
pub fn is_usable_oem_url(url: &str) -> bool {
    let url = url.trim();
    let lower = url.to_lowercase();
    let rest = match lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return false,
    };
    if url.chars().any(char::is_whitespace) {
        return false;
    }

    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..host_end];
    if host.is_empty() || host.starts_with(':') {
        return false;
    }

    let path = rest[host_end..]
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    !DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn check(key: &str, label: &str, weight: u32, passed: bool) -> CompletenessCheck {
    CompletenessCheck {
        key: key.to_string(),
        label: label.to_string(),
        weight,
        passed,
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn has_vin(meta: &ReportMetadata, text: &str) -> bool {
    let looks_like_vin = |s: &str| {
        s.len() == 17 && VIN.is_match(s) && s.chars().any(|c| c.is_ascii_digit())
    };
    if meta.vin.as_deref().map(str::trim).is_some_and(looks_like_vin) {
        return true;
    }
    VIN.find_iter(text).any(|m| looks_like_vin(m.as_str()))
}
