//! Projection engine: benefit grid, marginal benefits and IRR per contribution year

use super::cashflows::{CashFlowSeries, DetailRow, ProjectionResult, ProjectionSummary, YearIrr};
use super::irr::{IrrSolver, NO_SOLUTION};
use super::validation::validate;
use crate::benefits::{BenefitFormula, ContributionEngine, ContributionSchedule};
use crate::error::ValidationError;
use crate::profile::{EarningsHistory, PersonProfile, CONTRIBUTORY_SLOTS};
use crate::reference::ReferenceTable;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Configuration for a projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Youngest claim age of the benefit grid
    pub min_claim_age: u32,

    /// Oldest claim age of the benefit grid
    pub max_claim_age: u32,

    /// Settings for the IRR of each contribution year
    pub solver: IrrSolver,

    /// Compute grid rows and IRRs on the rayon pool
    pub parallel: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            min_claim_age: 60,
            max_claim_age: 72,
            solver: IrrSolver::default(),
            parallel: true,
        }
    }
}

impl ProjectionConfig {
    pub fn claim_ages(&self) -> RangeInclusive<u32> {
        self.min_claim_age..=self.max_claim_age
    }
}

/// Main projection engine
#[derive(Debug, Clone)]
pub struct ProjectionEngine<'a> {
    table: &'a ReferenceTable,
    config: ProjectionConfig,
}

impl<'a> ProjectionEngine<'a> {
    /// Create a new projection engine over a reference table
    pub fn new(table: &'a ReferenceTable, config: ProjectionConfig) -> Self {
        Self { table, config }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Run the full projection for one person
    pub fn project(
        &self,
        profile: &PersonProfile,
        history: &EarningsHistory,
    ) -> Result<ProjectionResult, ValidationError> {
        validate(profile, history, self.table, &self.config)?;

        if profile.salary_growth_rate != self.table.salary_growth_rate() {
            log::warn!(
                "profile assumes {}% salary growth but the reference table was built with {}%",
                profile.salary_growth_rate,
                self.table.salary_growth_rate()
            );
        }

        log::info!(
            "projecting benefits for a person born {}-{:02}, claiming at {}",
            profile.birth_year,
            profile.birth_month,
            profile.benefit_claim_age
        );

        let earnings = history.resolve(profile, self.table);
        let contributions = ContributionEngine::new(self.table).compute(profile, &earnings);
        let formula = BenefitFormula::new(self.table, profile, &earnings);

        let benefit = formula.evaluate(profile.claim_date(), CONTRIBUTORY_SLOTS);
        log::debug!(
            "monthly benefit at {}: {:.2} ({:.2} in {} dollars)",
            benefit.claim_date,
            benefit.monthly_benefit,
            benefit.monthly_benefit_reference,
            profile.reference_year
        );

        let claim_ages: Vec<u32> = self.config.claim_ages().collect();
        let benefit_grid = self.map_indices(claim_ages.len(), |row| {
            let claim_date = profile.claim_date_for_age(claim_ages[row]);
            (1..=CONTRIBUTORY_SLOTS)
                .map(|years| formula.monthly_benefit(claim_date, years))
                .collect::<Vec<f64>>()
        });
        let marginal_grid = marginal_benefits(&benefit_grid);

        let claim_row = claim_ages
            .iter()
            .position(|&age| age == profile.benefit_claim_age)
            .unwrap_or_default();

        let cashflows: Vec<CashFlowSeries> = (0..CONTRIBUTORY_SLOTS)
            .map(|slot| {
                CashFlowSeries::build(
                    profile,
                    slot,
                    contributions.effective_for_slot(slot),
                    marginal_grid[claim_row][slot],
                )
            })
            .collect();

        let solver = self.config.solver;
        let irr_by_year = self.map_indices(cashflows.len(), |slot| YearIrr {
            year: cashflows[slot].year,
            age: profile.slot_age(slot),
            irr: solver.solve(&cashflows[slot].flows),
        });

        let unsolved = irr_by_year
            .iter()
            .filter(|entry| entry.irr == NO_SOLUTION)
            .count();
        log::debug!("{} of {} contribution years have no IRR", unsolved, irr_by_year.len());

        let scale = benefit.reference_scale();
        let detail = self.detail_rows(
            profile,
            &contributions,
            &cashflows,
            &irr_by_year,
            &benefit_grid[claim_row],
            scale,
        );

        log::info!(
            "projection complete: {:.2}/month at {}, {} detail rows",
            benefit.monthly_benefit,
            benefit.claim_date,
            detail.len()
        );

        Ok(ProjectionResult {
            summary: ProjectionSummary::from_benefit(&benefit),
            benefit,
            claim_ages,
            benefit_grid,
            marginal_grid,
            contributions,
            cashflows,
            irr_by_year,
            detail,
        })
    }

    /// Map `0..len` on the rayon pool or sequentially, per the config
    fn map_indices<T, F>(&self, len: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        if self.config.parallel {
            (0..len).into_par_iter().map(f).collect()
        } else {
            (0..len).map(f).collect()
        }
    }

    /// Per-year table from the reference year (or first contributory year) to retirement
    fn detail_rows(
        &self,
        profile: &PersonProfile,
        contributions: &ContributionSchedule,
        cashflows: &[CashFlowSeries],
        irr_by_year: &[YearIrr],
        claim_row_benefits: &[f64],
        scale: f64,
    ) -> Vec<DetailRow> {
        let start_year = profile.reference_year.max(profile.slot_year(0));
        let start_age = u32::try_from(start_year - profile.birth_year - 1).unwrap_or_default();
        let span = profile.retirement_age.saturating_sub(start_age);

        let reference_ceiling = self.table.ceiling(profile.reference_year);
        let claim_age = profile.benefit_claim_age;

        let mut rows: Vec<DetailRow> = Vec::with_capacity(span as usize + 1);
        // Accumulated and incremental benefit before rescaling
        let mut accumulated = 0.0;
        let mut incremental = 0.0;

        for offset in 0..=span {
            let year = start_year + offset as i32;
            let age = start_age + offset;
            let slot = profile.slot_of_year(year);

            let year_ceiling = match self.table.ceiling(year) {
                c if c == 0.0 => 1.0,
                c => c,
            };
            let contribution = -contributions.effective_for_year(year) * reference_ceiling / year_ceiling;

            let irr_pct = slot
                .map(|s| irr_by_year[s].irr)
                .filter(|&irr| contribution != 0.0 && irr != NO_SOLUTION)
                .map(|irr| irr * 100.0);

            accumulated = if offset == 0 {
                // Benefit already earned through the previous year
                profile
                    .slot_of_year(year - 1)
                    .and_then(|s| claim_row_benefits.get(s))
                    .map_or(0.0, |monthly| monthly * 12.0)
            } else {
                accumulated + incremental
            };
            incremental = slot.map_or(0.0, |s| cashflows[s].flow_at_age(claim_age));

            rows.push(DetailRow {
                age,
                year,
                irr_pct,
                contribution,
                accumulated_benefit: accumulated * scale,
                incremental_benefit: incremental * scale,
            });
        }

        rows
    }
}

/// Column 0 as is, then the difference with the previous column
pub fn marginal_benefits(grid: &[Vec<f64>]) -> Vec<Vec<f64>> {
    grid.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(k, &value)| if k == 0 { value } else { value - row[k - 1] })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::EarningsMode;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn scenario_profile() -> PersonProfile {
        PersonProfile {
            birth_year: 1980,
            birth_month: 11,
            birth_day: 15,
            retirement_age: 71,
            benefit_claim_age: 60,
            life_expectancy_age: 95,
            self_employed: false,
            inflation_rate: 2.1,
            salary_growth_rate: 3.1,
            reference_year: 2025,
            earnings_replacement_before: 114.0,
            earnings_replacement_after: 114.0,
        }
    }

    fn bundled() -> ReferenceTable {
        ReferenceTable::bundled(3.1).unwrap()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let table = bundled();
        let profile = scenario_profile();
        let history = EarningsHistory::flat(&profile, 50000.0);

        let engine = ProjectionEngine::new(&table, ProjectionConfig::default());
        let result = engine.project(&profile, &history).unwrap();

        assert!(result.benefit.monthly_benefit.is_finite());
        assert!(result.benefit.monthly_benefit > 0.0);
        assert!(result.summary.annual_benefit_reference.is_finite());

        assert_eq!(result.claim_ages, (60..=72).collect::<Vec<_>>());
        assert_eq!(result.benefit_grid.len(), 13);
        assert!(result.benefit_grid.iter().all(|row| row.len() == 55));
        assert!(result.benefit_grid.iter().flatten().all(|v| v.is_finite()));

        // Early contribution years buy a benefit worth a real return
        let early: Vec<f64> = result.irr_by_year.iter().take(5).map(|e| e.irr).collect();
        assert!(
            early.iter().any(|&irr| irr > -1.0 && irr < 10.0),
            "no early IRR in range: {:?}",
            early
        );

        // Claiming at 60 with every year counted matches the summary benefit
        assert_relative_eq!(
            result.benefit_at(60, 55).unwrap(),
            result.benefit.monthly_benefit,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let table = bundled();
        let profile = scenario_profile();
        let history = EarningsHistory::flat(&profile, 50000.0);

        let parallel = ProjectionEngine::new(&table, ProjectionConfig::default())
            .project(&profile, &history)
            .unwrap();
        let sequential = ProjectionEngine::new(
            &table,
            ProjectionConfig {
                parallel: false,
                ..Default::default()
            },
        )
        .project(&profile, &history)
        .unwrap();

        assert_eq!(parallel.benefit_grid, sequential.benefit_grid);
        assert_eq!(parallel.irr_by_year, sequential.irr_by_year);
        assert_eq!(parallel.detail, sequential.detail);
    }

    #[test]
    fn test_marginal_benefits_of_flat_earnings_are_non_negative() {
        let table = bundled();
        let profile = PersonProfile {
            benefit_claim_age: 65,
            ..scenario_profile()
        };
        let history = EarningsHistory::flat(&profile, 50000.0);

        let result = ProjectionEngine::new(&table, ProjectionConfig::default())
            .project(&profile, &history)
            .unwrap();

        // Rounding to cents can move a difference by at most a cent
        for row in &result.marginal_grid {
            assert!(row.iter().all(|&m| m >= -0.01), "negative marginal benefit: {:?}", row);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_marginal_benefits_non_negative_for_rising_earnings(
            base in 0.0f64..40_000.0,
            raises in proptest::collection::vec(0.0f64..4_000.0, 56),
            claim_age in 60u32..=72,
        ) {
            let table = bundled();
            let profile = PersonProfile {
                benefit_claim_age: claim_age,
                ..scenario_profile()
            };
            let values: Vec<Option<f64>> = raises
                .iter()
                .scan(base, |amount, raise| {
                    *amount += raise;
                    Some(Some(*amount))
                })
                .collect();
            let history = EarningsHistory::from_values(&profile, &values);

            let result = ProjectionEngine::new(&table, ProjectionConfig::default())
                .project(&profile, &history)
                .unwrap();

            for (row, &age) in result.marginal_grid.iter().zip(&result.claim_ages) {
                for (years, &m) in row.iter().enumerate() {
                    prop_assert!(
                        m >= -0.01 - 1e-9,
                        "claim age {} column {}: marginal benefit {}",
                        age,
                        years,
                        m
                    );
                }
            }
        }
    }

    #[test]
    fn test_marginal_benefits_telescope() {
        let grid = vec![vec![10.0, 15.0, 15.0, 22.5]];
        let marginal = marginal_benefits(&grid);
        assert_eq!(marginal, vec![vec![10.0, 5.0, 0.0, 7.5]]);
        let total: f64 = marginal[0].iter().sum();
        assert_relative_eq!(total, 22.5);
    }

    #[test]
    fn test_detail_table() {
        let table = bundled();
        let profile = PersonProfile {
            benefit_claim_age: 65,
            retirement_age: 65,
            ..scenario_profile()
        };
        let history = EarningsHistory::flat(&profile, 50000.0);

        let result = ProjectionEngine::new(&table, ProjectionConfig::default())
            .project(&profile, &history)
            .unwrap();

        let first = result.detail[0];
        assert_eq!(first.year, 2025);
        assert_eq!(first.age, 44);
        assert_eq!(result.detail.last().map(|r| r.age), Some(65));
        assert_eq!(result.detail.len(), 22);

        // 2025 contribution is already in 2025 dollars
        assert_relative_eq!(
            first.contribution,
            -result.contributions.effective_for_year(2025),
            epsilon = 1e-9
        );
        assert!(first.accumulated_benefit > 0.0);
        assert!(first.irr_pct.is_some());

        for pair in result.detail.windows(2) {
            assert_relative_eq!(
                pair[1].accumulated_benefit,
                pair[0].accumulated_benefit + pair[0].incremental_benefit,
                epsilon = 1e-6
            );
        }

        // Retired in the claim year: nothing paid, no IRR
        let last = result.detail.last().unwrap();
        assert_eq!(last.contribution, 0.0);
        assert_eq!(last.irr_pct, None);
    }

    #[test]
    fn test_percent_of_ceiling_history() {
        let table = bundled();
        let profile = scenario_profile();
        let history = EarningsHistory::flat(&profile, 100.0).with_mode(EarningsMode::PercentOfCeiling);

        let result = ProjectionEngine::new(&table, ProjectionConfig::default())
            .project(&profile, &history)
            .unwrap();
        assert!(result.benefit.monthly_benefit > 0.0);
    }

    #[test]
    fn test_rejects_invalid_request_before_computing() {
        let table = bundled();
        let profile = PersonProfile {
            benefit_claim_age: 75,
            life_expectancy_age: 70,
            ..scenario_profile()
        };
        let history = EarningsHistory::flat(&profile, 50000.0);

        let err = ProjectionEngine::new(&table, ProjectionConfig::default())
            .project(&profile, &history)
            .unwrap_err();
        assert!(err.has_field("benefit_claim_age"));
        assert!(err.has_field("life_expectancy_age"));
        assert_eq!(err.violations.len(), 2);
    }
}
