//! Yearly QPP contributions: base plan plus the two supplementary components

use crate::profile::{PersonProfile, ResolvedEarnings, CONTRIBUTORY_SLOTS};
use crate::reference::ReferenceTable;
use serde::{Deserialize, Serialize};

/// Contributions for one contributory year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContributionYearRecord {
    pub year: i32,
    pub age: u32,
    /// What the person actually pays (doubled when self-employed)
    pub effective: f64,
    /// Employee share at earnings of MSGA or more
    pub maximum: f64,
    pub base: f64,
    pub supplementary_v1: f64,
    pub supplementary_v2: f64,
}

impl ContributionYearRecord {
    fn zero(year: i32, age: u32) -> Self {
        Self {
            year,
            age,
            effective: 0.0,
            maximum: 0.0,
            base: 0.0,
            supplementary_v1: 0.0,
            supplementary_v2: 0.0,
        }
    }
}

/// Contributions over all contributory slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionSchedule {
    pub records: Vec<ContributionYearRecord>,
}

impl ContributionSchedule {
    pub fn for_year(&self, year: i32) -> Option<&ContributionYearRecord> {
        self.records.iter().find(|r| r.year == year)
    }

    /// Effective contribution of a calendar year, zero outside the schedule
    pub fn effective_for_year(&self, year: i32) -> f64 {
        self.for_year(year).map_or(0.0, |r| r.effective)
    }

    /// Effective contribution of a slot, zero outside the schedule
    pub fn effective_for_slot(&self, slot: usize) -> f64 {
        self.records.get(slot).map_or(0.0, |r| r.effective)
    }

    pub fn total_effective(&self) -> f64 {
        self.records.iter().map(|r| r.effective).sum()
    }
}

/// Computes contributions from resolved earnings and the reference table
#[derive(Debug, Clone, Copy)]
pub struct ContributionEngine<'a> {
    table: &'a ReferenceTable,
}

impl<'a> ContributionEngine<'a> {
    pub fn new(table: &'a ReferenceTable) -> Self {
        Self { table }
    }

    /// Contributions for every contributory slot
    pub fn compute(&self, profile: &PersonProfile, earnings: &ResolvedEarnings) -> ContributionSchedule {
        let records = (0..CONTRIBUTORY_SLOTS)
            .map(|slot| {
                self.compute_year(
                    profile.slot_year(slot),
                    profile.slot_age(slot),
                    earnings.slot(slot),
                    profile.self_employed,
                )
            })
            .collect();

        ContributionSchedule { records }
    }

    /// Contributions for one year of earnings
    pub fn compute_year(&self, year: i32, age: u32, earnings: f64, self_employed: bool) -> ContributionYearRecord {
        // Unknown years are treated as earnings below the exemption
        let Some(reference) = self.table.get(year) else {
            return ContributionYearRecord::zero(year, age);
        };

        let ceiling = reference.ceiling_earnings;
        let supplementary_ceiling = reference.supplementary_ceiling;

        let pensionable = (ceiling.min(earnings) - reference.exemption).max(0.0);
        let base = pensionable * reference.base_rate / 100.0;
        let supplementary_v1 = pensionable * reference.supplementary_rate_v1 / 100.0;
        let supplementary_v2 = (earnings.min(supplementary_ceiling) - ceiling).max(0.0)
            * reference.supplementary_rate_v2
            / 100.0;

        let shares = if self_employed { 2.0 } else { 1.0 };
        let effective = (base + supplementary_v1 + supplementary_v2) * shares;

        let maximum = (ceiling - reference.exemption).max(0.0)
            * (reference.base_rate + reference.supplementary_rate_v1)
            / 100.0
            + reference.supplementary_rate_v2 / 100.0 * (supplementary_ceiling - ceiling);

        ContributionYearRecord {
            year,
            age,
            effective,
            maximum,
            base,
            supplementary_v1,
            supplementary_v2,
        }
    }
}
