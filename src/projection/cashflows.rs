//! Cash-flow series and output structures for projections

use crate::benefits::{BenefitResult, ContributionSchedule};
use crate::profile::PersonProfile;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Yearly cash flows attributable to one contribution year, by age
///
/// The contribution is paid (negative) in its own year; the benefit it buys
/// starts at the claim age and is indexed to inflation every following year
/// until life expectancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSeries {
    /// Calendar year of the contribution
    pub year: i32,
    /// Age of the first flow
    pub start_age: u32,
    pub flows: Vec<f64>,
}

impl CashFlowSeries {
    /// Build the series for a contributory slot
    ///
    /// `monthly_marginal` is the monthly benefit this slot adds when claiming
    /// at the profile's claim age.
    pub fn build(profile: &PersonProfile, slot: usize, contribution: f64, monthly_marginal: f64) -> Self {
        let start_age = profile.start_age();
        let claim_age = profile.benefit_claim_age;
        let life_expectancy = profile.life_expectancy_age;
        let indexation = profile.inflation_factor();

        let mut flows: Vec<f64> = Vec::with_capacity(life_expectancy.saturating_sub(start_age) as usize + 1);

        for (i, age) in (start_age..=life_expectancy).enumerate() {
            let mut flow = 0.0;

            if i == slot && age < claim_age {
                flow -= contribution;
            }
            if age == claim_age {
                flow += monthly_marginal * 12.0;
            }
            if let Some(&prev) = flows.last() {
                // Benefit keeps flowing, indexed
                if prev > 0.0 && age < life_expectancy {
                    flow += prev * indexation;
                }
            }

            flows.push(flow);
        }

        Self {
            year: profile.slot_year(slot),
            start_age,
            flows,
        }
    }

    /// Flow at an age, zero outside the series
    pub fn flow_at_age(&self, age: u32) -> f64 {
        age.checked_sub(self.start_age)
            .and_then(|i| self.flows.get(i as usize))
            .copied()
            .unwrap_or(0.0)
    }
}

/// IRR of one contribution year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearIrr {
    pub year: i32,
    pub age: u32,
    /// Rate per year, `-1` when no solution
    pub irr: f64,
}

/// One row of the per-year table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetailRow {
    pub age: u32,
    pub year: i32,
    /// IRR in percent; absent without contribution or solution
    pub irr_pct: Option<f64>,
    /// Annual contribution in reference-year dollars (negative)
    pub contribution: f64,
    /// Annual benefit earned so far, reference-year dollars
    pub accumulated_benefit: f64,
    /// Annual benefit added by this year, reference-year dollars
    pub incremental_benefit: f64,
}

/// Annual benefit totals, in claim-year and reference-year dollars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub claim_date: NaiveDate,
    pub claim_age: i32,

    pub annual_benefit: f64,
    pub annual_benefit_reference: f64,

    pub basic_annual: f64,
    pub basic_annual_reference: f64,

    pub volet1_annual: f64,
    pub volet1_annual_reference: f64,

    pub volet2_annual: f64,
    pub volet2_annual_reference: f64,
}

impl ProjectionSummary {
    pub fn from_benefit(benefit: &BenefitResult) -> Self {
        let scale = benefit.reference_scale();

        Self {
            claim_date: benefit.claim_date,
            claim_age: benefit.age_at_claim,
            annual_benefit: benefit.monthly_benefit * 12.0,
            annual_benefit_reference: benefit.monthly_benefit_reference * 12.0,
            basic_annual: benefit.basic_monthly * 12.0,
            basic_annual_reference: benefit.basic_monthly * 12.0 * scale,
            volet1_annual: benefit.volet1_monthly * 12.0,
            volet1_annual_reference: benefit.volet1_monthly * 12.0 * scale,
            volet2_annual: benefit.volet2_monthly * 12.0,
            volet2_annual_reference: benefit.volet2_monthly * 12.0 * scale,
        }
    }
}

/// Complete projection result
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionResult {
    pub summary: ProjectionSummary,

    /// Benefit at the requested claim date with every contributory year
    pub benefit: BenefitResult,

    /// Claim ages of the grid rows
    pub claim_ages: Vec<u32>,

    /// Monthly benefit by claim age (rows) and contributory years (columns)
    pub benefit_grid: Vec<Vec<f64>>,

    /// Monthly benefit added by each contributory year
    pub marginal_grid: Vec<Vec<f64>>,

    pub contributions: ContributionSchedule,

    pub cashflows: Vec<CashFlowSeries>,

    pub irr_by_year: Vec<YearIrr>,

    pub detail: Vec<DetailRow>,
}

impl ProjectionResult {
    /// Grid row of a claim age
    pub fn claim_row(&self, claim_age: u32) -> Option<usize> {
        self.claim_ages.iter().position(|&age| age == claim_age)
    }

    /// Monthly benefit when claiming at `claim_age` after `years` contributory years
    pub fn benefit_at(&self, claim_age: u32, years: usize) -> Option<f64> {
        let row = self.claim_row(claim_age)?;
        years
            .checked_sub(1)
            .and_then(|column| self.benefit_grid[row].get(column))
            .copied()
    }
}
