//! # ADAS Scrub Core
//!
//! Estimate-to-calibration matching for collision repair: given the free
//! text of a repair estimate and a vehicle's manufacturer rule data,
//! decide which ADAS systems need recalibration and whether the report
//! is complete enough to submit.
//!
//! | Module | Role |
//! |--------|------|
//! | [`normalize`] | Line splitting and supplier-address filtering |
//! | [`line_number`] | Estimate-native line number recovery |
//! | [`repair`] | Repair category detection and description cleaning |
//! | [`matcher`] | Vehicle lookup and keyword-to-system matching |
//! | [`canonical`] | System, operation and calibration-type canonicalization |
//! | [`group`] | Grouping by operation and inferred-match merging |
//! | [`inference`] | Heuristic calibration inference |
//! | [`overrides`] | Reviewer add/remove instructions |
//! | [`completeness`] | Weighted readiness scoring |
//! | [`workflow`] | Report status and the submission gate |
//! | [`scrub`] | The synchronous pipeline |
//! | [`store`] | Rule provider and report store traits |
//! | [`service`] | Async report operations over the store traits |
//!
//! Everything except [`store`] and [`service`] is synchronous and free of
//! I/O.

pub mod canonical;
pub mod completeness;
pub mod group;
pub mod inference;
pub mod line_number;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod overrides;
pub mod repair;
pub mod scrub;
pub mod service;
pub mod store;
pub mod workflow;
