//! Scenario runner for batch projections
//!
//! Loads the raw reference rows once, then runs projections under any number
//! of salary growth assumptions. Each assumption builds its reference table
//! once; later runs reuse it from the cache.

use crate::error::{LoadError, ValidationError};
use crate::profile::{EarningsHistory, PersonProfile};
use crate::projection::{ProjectionConfig, ProjectionEngine, ProjectionResult};
use crate::reference::{self, RawReferenceRow, ReferenceTableCache};
use std::path::Path;

/// Pre-loaded scenario runner for batch projections
///
/// # Example
/// ```ignore
/// let mut runner = ScenarioRunner::bundled()?;
///
/// // Same person, several growth assumptions
/// let results = runner.run_growth_scenarios(&profile, &history, &[2.0, 3.1, 4.0]);
/// ```
#[derive(Debug)]
pub struct ScenarioRunner {
    cache: ReferenceTableCache,
    config: ProjectionConfig,
}

impl ScenarioRunner {
    /// Create runner over raw reference rows
    pub fn new(rows: Vec<RawReferenceRow>) -> Self {
        Self {
            cache: ReferenceTableCache::new(rows),
            config: ProjectionConfig::default(),
        }
    }

    /// Create runner over the reference table compiled into the crate
    pub fn bundled() -> Result<Self, LoadError> {
        Ok(Self::new(reference::loader::load_bundled_rows()?))
    }

    /// Create runner by loading reference rows from a CSV file
    pub fn from_csv_path(path: &Path) -> Result<Self, LoadError> {
        Ok(Self::new(reference::load_reference_rows(path)?))
    }

    pub fn with_config(mut self, config: ProjectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one projection with the profile's own growth assumption
    pub fn run(
        &mut self,
        profile: &PersonProfile,
        history: &EarningsHistory,
    ) -> Result<ProjectionResult, ValidationError> {
        let table = self.cache.get_or_build(profile.salary_growth_rate);
        ProjectionEngine::new(&table, self.config.clone()).project(profile, history)
    }

    /// Run the same person under several salary growth assumptions
    pub fn run_growth_scenarios(
        &mut self,
        profile: &PersonProfile,
        history: &EarningsHistory,
        growth_rates: &[f64],
    ) -> Vec<Result<ProjectionResult, ValidationError>> {
        growth_rates
            .iter()
            .map(|&rate| {
                let scenario = PersonProfile {
                    salary_growth_rate: rate,
                    ..profile.clone()
                };
                self.run(&scenario, history)
            })
            .collect()
    }

    /// Cache statistics: (hits, misses, hit rate)
    pub fn cache_stats(&self) -> (u64, u64, f64) {
        (self.cache.cache_hits, self.cache.cache_misses, self.cache.hit_rate())
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> PersonProfile {
        PersonProfile {
            birth_year: 1985,
            birth_month: 4,
            birth_day: 20,
            retirement_age: 65,
            benefit_claim_age: 65,
            ..Default::default()
        }
    }

    #[test]
    fn test_growth_scenarios_reuse_tables() {
        let mut runner = ScenarioRunner::bundled().unwrap();
        let profile = profile();
        let history = EarningsHistory::flat(&profile, 60000.0);

        let results = runner.run_growth_scenarios(&profile, &history, &[2.0, 3.1, 4.0, 3.1]);
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.is_ok()));

        let (hits, misses, _) = runner.cache_stats();
        assert_eq!(misses, 3);
        assert_eq!(hits, 1);

        // Faster MGA growth means a higher benefit in claim-year dollars
        let low = results[0].as_ref().unwrap().summary.annual_benefit;
        let high = results[2].as_ref().unwrap().summary.annual_benefit;
        assert!(high > low);
    }

    #[test]
    fn test_run_surfaces_validation_errors() {
        let mut runner = ScenarioRunner::bundled().unwrap().with_config(ProjectionConfig {
            parallel: false,
            ..Default::default()
        });
        let profile = PersonProfile {
            birth_month: 0,
            ..profile()
        };
        let history = EarningsHistory::empty(&profile);

        let err = runner.run(&profile, &history).unwrap_err();
        assert!(err.has_field("birth_month"));
        assert!(!runner.config().parallel);
    }
}
