//! # ADAS Scrub
//!
//! Determines which ADAS components need recalibration after a collision
//! repair, from the free text of the repair estimate and manufacturer
//! rule data. Matching, grouping, overrides, and completeness scoring
//! live in [`adas_scrub_core`]; this crate adds configuration, SQLite
//! persistence, a file-backed rule provider, rate limiting, and the
//! `scrub` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ rules.json │──▶│  adas-scrub-core │──▶│  SQLite  │
//! │  provider  │   │ match+group+score│   │ reports  │
//! └────────────┘   └────────┬─────────┘   └──────────┘
//!                           │
//!                      ┌────▼─────┐
//!                      │ ScrubApp │◀── rate limiter
//!                      └────┬─────┘
//!                           ▼
//!                      scrub CLI
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite report store |
//! | [`rules`] | File-backed vehicle rule provider |
//! | [`rate_limit`] | Per-caller fixed-window rate limiter |
//! | [`app`] | Application façade used by the CLI |

pub mod app;
pub mod config;
pub mod db;
pub mod migrate;
pub mod rate_limit;
pub mod rules;
pub mod sqlite_store;
