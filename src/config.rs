//! TOML configuration for the `scrub` binary.
//!
//! ```toml
//! [db]
//! path = "./data/scrub.sqlite"
//!
//! [rules]
//! path = "./config/rules.json"
//!
//! [scrub]
//! include_inferred = true
//! type_separator = "/"
//!
//! [completeness]
//! ready_threshold = 85
//!
//! [rate_limit]
//! max_requests = 60
//! window_secs = 60
//! ```
//!
//! Only `[db]` and `[rules]` are required.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use adas_scrub_core::canonical::{CALIBRATION_TYPES, DEFAULT_TYPE_SEPARATOR};
use adas_scrub_core::completeness::CompletenessWeights;
use adas_scrub_core::scrub::ScrubOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub rules: RulesConfig,
    #[serde(default)]
    pub scrub: ScrubConfig,
    #[serde(default)]
    pub completeness: CompletenessWeights,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RulesConfig {
    /// JSON array of vehicle rule sets.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrubConfig {
    #[serde(default = "default_include_inferred")]
    pub include_inferred: bool,
    #[serde(default = "default_type_separator")]
    pub type_separator: String,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            include_inferred: default_include_inferred(),
            type_separator: default_type_separator(),
        }
    }
}

impl ScrubConfig {
    pub fn options(&self) -> ScrubOptions {
        ScrubOptions {
            include_inferred: self.include_inferred,
            type_separator: self.type_separator.clone(),
        }
    }
}

fn default_include_inferred() -> bool {
    true
}
fn default_type_separator() -> String {
    DEFAULT_TYPE_SEPARATOR.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_max_requests() -> u32 {
    60
}
fn default_window_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate scrub
    if config.scrub.type_separator.is_empty() {
        anyhow::bail!("scrub.type_separator must not be empty");
    }
    let sep = config.scrub.type_separator.as_str();
    if let Some(label) = CALIBRATION_TYPES.iter().find(|t| t.contains(sep)) {
        anyhow::bail!(
            "scrub.type_separator {:?} occurs inside calibration type {:?}",
            sep,
            label
        );
    }

    // Validate completeness
    let total = config.completeness.total();
    if total != 100 {
        anyhow::bail!("completeness weights must sum to 100 (got {})", total);
    }
    if !(1..=100).contains(&config.completeness.ready_threshold) {
        anyhow::bail!("completeness.ready_threshold must be in [1, 100]");
    }

    // Validate rate limit
    if config.rate_limit.max_requests == 0 {
        anyhow::bail!("rate_limit.max_requests must be > 0");
    }
    if config.rate_limit.window_secs == 0 {
        anyhow::bail!("rate_limit.window_secs must be > 0");
    }

    Ok(config)
}
