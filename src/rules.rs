//! File-backed [`RuleProvider`].
//!
//! Reads `[rules].path`, a JSON array of vehicle rule sets:
//!
//! ```json
//! [{
//!   "make": "Toyota", "model": "Camry", "yearStart": 2018, "yearEnd": 2024,
//!   "systems": [{ "name": "Front Radar", "calibrationType": "Static" }],
//!   "mappings": [{ "repairOperation": "Bumper R&R", "keywords": ["bumper"], "systems": ["Front Radar"] }]
//! }]
//! ```
//!
//! The file is loaded once; the provider only looks rules up.

use std::path::Path;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use adas_scrub_core::matcher::select_vehicle;
use adas_scrub_core::models::VehicleRuleSet;
use adas_scrub_core::store::RuleProvider;

#[derive(Debug)]
pub struct FileRuleProvider {
    rules: Vec<VehicleRuleSet>,
}

impl FileRuleProvider {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
        let rules: Vec<VehicleRuleSet> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse rules file: {}", path.display()))?;

        for rule in &rules {
            if rule.year_start > rule.year_end {
                bail!(
                    "rule set {} {} has year_start {} after year_end {}",
                    rule.make,
                    rule.model,
                    rule.year_start,
                    rule.year_end
                );
            }
            if rule.mappings.is_empty() {
                warn!(make = %rule.make, model = %rule.model, "rule set has no calibration mappings");
            }
        }
        info!(count = rules.len(), path = %path.display(), "loaded vehicle rules");

        Ok(Self { rules })
    }

    pub fn from_rules(rules: Vec<VehicleRuleSet>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl RuleProvider for FileRuleProvider {
    async fn find_vehicle(&self, year: i32, make: &str, model: &str) -> Result<Option<VehicleRuleSet>> {
        Ok(select_vehicle(&self.rules, year, make, model).cloned())
    }

    async fn vehicles_for_year(&self, year: i32) -> Result<Vec<VehicleRuleSet>> {
        Ok(self.rules.iter().filter(|v| v.covers_year(year)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"[
        {"make": "Subaru", "model": "All Models", "yearStart": 2019, "yearEnd": 2024,
         "systems": [{"name": "EyeSight", "calibrationType": "Static"}],
         "mappings": [{"repairOperation": "Windshield Replacement", "keywords": ["windshield"], "systems": ["EyeSight"]}]},
        {"make": "Subaru", "model": "Outback", "yearStart": 2020, "yearEnd": 2024,
         "mappings": [{"repairOperation": "Bumper R&R", "keywords": ["bumper"], "systems": ["Front Radar"]}]}
    ]"#;

    #[tokio::test]
    async fn loads_and_looks_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, RULES).unwrap();

        let provider = FileRuleProvider::load(&path).unwrap();
        assert_eq!(provider.len(), 2);

        let outback = provider.find_vehicle(2021, "SUBARU", "outback").await.unwrap().unwrap();
        assert_eq!(outback.model, "Outback");
        let forester = provider.find_vehicle(2021, "Subaru", "Forester").await.unwrap().unwrap();
        assert_eq!(forester.model, "All Models");
        assert!(provider.find_vehicle(2018, "Subaru", "Outback").await.unwrap().is_none());
        assert_eq!(provider.vehicles_for_year(2019).await.unwrap().len(), 1);
    }

    #[test]
    fn rejects_inverted_year_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"make":"Kia","model":"Soul","yearStart":2024,"yearEnd":2020}]"#).unwrap();
        assert!(FileRuleProvider::load(&path).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{").unwrap();
        let err = FileRuleProvider::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("rules.json"));
    }
}
