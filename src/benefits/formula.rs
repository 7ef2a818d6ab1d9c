//! Monthly retirement benefit at a given claim date
//!
//! `compute_raw` ranks the contributory slots, applies the general drop-out and
//! sums both supplementary components. `evaluate` runs it twice, at the
//! requested date and pinned at age 65, and combines the two into the adjusted
//! monthly benefit.

use super::ranking::{
    apportion_dropout, best_slots, dropout_quota, rank_slots, RankKey, SUPPLEMENTARY_BEST_YEARS,
};
use crate::profile::{PersonProfile, ResolvedEarnings, CONTRIBUTORY_SLOTS, PROTECTION_AGE};
use crate::reference::ReferenceTable;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// First year of supplementary component 1
pub const SUPPLEMENTARY_V1_START_YEAR: i32 = 2019;
/// First year of supplementary component 2
pub const SUPPLEMENTARY_V2_START_YEAR: i32 = 2024;

/// Share of the average pensionable earnings paid as the basic benefit
pub const BASIC_REPLACEMENT: f64 = 0.25;
pub const SUPPLEMENTARY_V1_ACCRUAL: f64 = 0.0833;
pub const SUPPLEMENTARY_V2_ACCRUAL: f64 = 0.3333;
/// Months of contributions a full supplementary benefit is spread over
pub const SUPPLEMENTARY_ACCRUAL_MONTHS: f64 = 480.0;

/// Monthly bonus for each month claimed after 65
pub const DEFERRAL_RATE: f64 = 0.007;
/// Monthly reduction before 65, before the earnings-dependent part
pub const EARLY_BASE_RATE: f64 = 0.005;
pub const EARLY_VARIABLE_RATE: f64 = 0.001;
/// Cap on the early/deferred adjustment factor
pub const MAX_ADJUSTMENT_FACTOR: f64 = 1.588;

/// Per-slot working values of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotDetail {
    pub year: i32,
    pub age: u32,
    /// MGA of the year, zero after the claim year
    pub ceiling: f64,
    /// Mean of the last five ceilings; absent for the first four slots
    pub trailing_average: Option<f64>,
    pub months: u32,
    /// Earnings capped at the ceiling, zero past the contributory horizon
    pub capped_earnings: f64,
    /// Earnings re-expressed against the maximum average monthly ceiling
    pub ratio: f64,
    pub rank: usize,
    pub excluded_months: u32,
    pub volet1: f64,
    pub volet2: f64,
}

/// Unadjusted result of one pass of the formula
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawBenefit {
    pub claim_date: NaiveDate,
    pub claim_year: i32,
    pub age_at_claim: i32,
    pub contributory_years: usize,
    /// Highest five-year average ceiling
    pub max_average_ceiling: f64,
    pub monthly_max_ceiling: f64,
    pub total_months: u32,
    pub excluded_months: u32,
    /// Average monthly pensionable earnings after the drop-out
    pub average: f64,
    pub volet1_total: f64,
    pub volet2_total: f64,
    /// Average monthly ceiling of the claim year
    pub claim_monthly_ceiling: f64,
    /// Average monthly ceiling of the reference year
    pub reference_monthly_ceiling: f64,
    pub slots: Vec<SlotDetail>,
}

/// Adjusted monthly benefit and its components
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenefitResult {
    pub claim_date: NaiveDate,
    pub claim_year: i32,
    pub age_at_claim: i32,
    pub average: f64,
    /// Age-65 average brought to the claim year
    pub protected_average: f64,
    pub adjustment_rate: f64,
    pub adjustment_factor: f64,
    pub basic_monthly: f64,
    pub volet1_monthly: f64,
    pub volet2_monthly: f64,
    /// Total monthly benefit in claim-year dollars, rounded to cents
    pub monthly_benefit: f64,
    /// Same benefit in reference-year dollars
    pub monthly_benefit_reference: f64,
    pub claim_monthly_ceiling: f64,
    pub reference_monthly_ceiling: f64,
}

impl BenefitResult {
    /// Ratio turning claim-year dollars into reference-year dollars
    pub fn reference_scale(&self) -> f64 {
        safe_ratio(self.reference_monthly_ceiling, self.claim_monthly_ceiling)
    }
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator != 0.0 && denominator.is_finite() {
        numerator / denominator
    } else {
        0.0
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Benefit formula for one person and one table
#[derive(Debug, Clone)]
pub struct BenefitFormula<'a> {
    table: &'a ReferenceTable,
    profile: &'a PersonProfile,
    earnings: [f64; CONTRIBUTORY_SLOTS],
}

impl<'a> BenefitFormula<'a> {
    pub fn new(table: &'a ReferenceTable, profile: &'a PersonProfile, earnings: &ResolvedEarnings) -> Self {
        Self {
            table,
            profile,
            earnings: earnings.slots(),
        }
    }

    /// One pass of the formula for a claim date, counting only the first
    /// `contributory_years` slots of earnings
    pub fn compute_raw(&self, claim_date: NaiveDate, contributory_years: usize) -> RawBenefit {
        let profile = self.profile;
        let claim_year = claim_date.year();
        let claim_month = claim_date.month();

        let years: Vec<i32> = (0..CONTRIBUTORY_SLOTS).map(|i| profile.slot_year(i)).collect();

        let ceilings: Vec<f64> = years
            .iter()
            .map(|&year| if year > claim_year { 0.0 } else { self.table.ceiling(year) })
            .collect();

        let trailing: Vec<Option<f64>> = (0..CONTRIBUTORY_SLOTS)
            .map(|i| (i >= 4).then(|| ceilings[i - 4..=i].iter().sum::<f64>() / 5.0))
            .collect();

        let max_average_ceiling = trailing.iter().flatten().copied().fold(0.0, f64::max);
        let monthly_max_ceiling = max_average_ceiling / 12.0;

        let months: Vec<u32> = years
            .iter()
            .enumerate()
            .map(|(i, &year)| {
                if year > claim_year {
                    0
                } else if i == 0 {
                    if profile.birth_month < 12 {
                        12 - profile.birth_month
                    } else {
                        12
                    }
                } else if year == claim_year {
                    claim_month.saturating_sub(1)
                } else {
                    12
                }
            })
            .collect();

        let capped: Vec<f64> = (0..CONTRIBUTORY_SLOTS)
            .map(|i| {
                if i < contributory_years {
                    self.earnings[i].min(ceilings[i])
                } else {
                    0.0
                }
            })
            .collect();

        let ratios: Vec<f64> = (0..CONTRIBUTORY_SLOTS)
            .map(|i| {
                if months[i] > 0 && ceilings[i] > 0.0 {
                    let annualised = capped[i] * 12.0 / months[i] as f64;
                    monthly_max_ceiling.min(annualised * monthly_max_ceiling / ceilings[i])
                } else {
                    0.0
                }
            })
            .collect();

        // General drop-out
        let keys: Vec<RankKey> = (0..CONTRIBUTORY_SLOTS)
            .map(|i| RankKey {
                value: ratios[i],
                months: months[i],
                year: years[i],
            })
            .collect();
        let ranks = rank_slots(&keys);

        let total_months: u32 = months.iter().sum();
        let excluded = apportion_dropout(&months, &ranks, dropout_quota(total_months));
        let excluded_months: u32 = excluded.iter().sum();

        let weighted: f64 = (0..CONTRIBUTORY_SLOTS).map(|i| ratios[i] * months[i] as f64).sum();
        let removed: f64 = (0..CONTRIBUTORY_SLOTS).map(|i| ratios[i] * excluded[i] as f64).sum();
        let kept_months = total_months as f64 - excluded_months as f64;
        let average = if kept_months > 0.0 {
            (weighted - removed) / kept_months
        } else {
            0.0
        };

        // Supplementary component 1: best 40 years since its introduction
        let fractions: Vec<f64> = years
            .iter()
            .map(|&year| self.table.introduction_fraction_v1(year) / 100.0)
            .collect();
        let v1_keys: Vec<RankKey> = (0..CONTRIBUTORY_SLOTS)
            .map(|i| RankKey {
                value: ratios[i] * fractions[i],
                ..keys[i]
            })
            .collect();
        let v1_eligible: Vec<bool> = years.iter().map(|&y| y >= SUPPLEMENTARY_V1_START_YEAR).collect();
        let v1_kept = best_slots(&v1_keys, &v1_eligible, SUPPLEMENTARY_BEST_YEARS);
        let volet1: Vec<f64> = (0..CONTRIBUTORY_SLOTS)
            .map(|i| {
                if v1_kept[i] {
                    ratios[i] * months[i] as f64 * fractions[i]
                } else {
                    0.0
                }
            })
            .collect();

        // Supplementary component 2: earnings between the MGA and the MSGA
        let v2_values: Vec<f64> = (0..CONTRIBUTORY_SLOTS)
            .map(|i| {
                let ceiling = ceilings[i];
                let excess = (self.earnings[i] - ceiling)
                    .min(self.table.supplementary_ceiling(years[i]) - ceiling)
                    .max(0.0);
                let prorated = if capped[i] >= ceiling {
                    excess * months[i] as f64 / 12.0
                } else {
                    0.0
                };
                let scale = if ceiling > 0.0 {
                    max_average_ceiling / ceiling
                } else {
                    1.0
                };
                prorated * scale
            })
            .collect();
        let v2_keys: Vec<RankKey> = (0..CONTRIBUTORY_SLOTS)
            .map(|i| RankKey {
                value: v2_values[i],
                ..keys[i]
            })
            .collect();
        let v2_eligible: Vec<bool> = years.iter().map(|&y| y >= SUPPLEMENTARY_V2_START_YEAR).collect();
        let v2_kept = best_slots(&v2_keys, &v2_eligible, SUPPLEMENTARY_BEST_YEARS);
        let volet2: Vec<f64> = (0..CONTRIBUTORY_SLOTS)
            .map(|i| if v2_kept[i] { v2_values[i] } else { 0.0 })
            .collect();

        let slots = (0..CONTRIBUTORY_SLOTS)
            .map(|i| SlotDetail {
                year: years[i],
                age: profile.slot_age(i),
                ceiling: ceilings[i],
                trailing_average: trailing[i],
                months: months[i],
                capped_earnings: capped[i],
                ratio: ratios[i],
                rank: ranks[i],
                excluded_months: excluded[i],
                volet1: volet1[i],
                volet2: volet2[i],
            })
            .collect();

        RawBenefit {
            claim_date,
            claim_year,
            age_at_claim: profile.age_at(claim_date),
            contributory_years,
            max_average_ceiling,
            monthly_max_ceiling,
            total_months,
            excluded_months,
            average,
            volet1_total: volet1.iter().sum(),
            volet2_total: volet2.iter().sum(),
            claim_monthly_ceiling: self.table.monthly_average_ceiling(claim_year),
            reference_monthly_ceiling: self.table.monthly_average_ceiling(profile.reference_year),
            slots,
        }
    }

    /// Adjusted monthly benefit for a claim date
    pub fn evaluate(&self, claim_date: NaiveDate, contributory_years: usize) -> BenefitResult {
        let raw = self.compute_raw(claim_date, contributory_years);
        let protected = self.compute_raw(self.profile.protection_claim_date(), contributory_years);
        self.combine(&raw, &protected)
    }

    /// Rounded monthly benefit only
    pub fn monthly_benefit(&self, claim_date: NaiveDate, contributory_years: usize) -> f64 {
        self.evaluate(claim_date, contributory_years).monthly_benefit
    }

    fn combine(&self, raw: &RawBenefit, protected: &RawBenefit) -> BenefitResult {
        let age = raw.age_at_claim;
        let protection_age = PROTECTION_AGE as i32;

        let protected_average = protected.average
            * safe_ratio(raw.claim_monthly_ceiling, protected.claim_monthly_ceiling);

        let basic = BASIC_REPLACEMENT
            * if age >= protection_age {
                raw.average.max(protected_average)
            } else {
                raw.average
            };

        let adjustment_rate = match age.cmp(&protection_age) {
            std::cmp::Ordering::Equal => 0.0,
            std::cmp::Ordering::Greater => DEFERRAL_RATE,
            std::cmp::Ordering::Less => {
                EARLY_BASE_RATE
                    + EARLY_VARIABLE_RATE * safe_ratio(basic, BASIC_REPLACEMENT * raw.monthly_max_ceiling)
            }
        };
        let adjustment_factor =
            (1.0 + (age - protection_age) as f64 * adjustment_rate * 12.0).min(MAX_ADJUSTMENT_FACTOR);

        let volet1 = raw.volet1_total * SUPPLEMENTARY_V1_ACCRUAL / SUPPLEMENTARY_ACCRUAL_MONTHS;
        let volet2 = raw.volet2_total * SUPPLEMENTARY_V2_ACCRUAL / SUPPLEMENTARY_ACCRUAL_MONTHS;

        let basic_monthly = basic * adjustment_factor;
        let volet1_monthly = volet1 * adjustment_factor;
        let volet2_monthly = volet2 * adjustment_factor;
        let monthly_benefit = round_cents(basic_monthly + volet1_monthly + volet2_monthly);

        BenefitResult {
            claim_date: raw.claim_date,
            claim_year: raw.claim_year,
            age_at_claim: age,
            average: raw.average,
            protected_average,
            adjustment_rate,
            adjustment_factor,
            basic_monthly,
            volet1_monthly,
            volet2_monthly,
            monthly_benefit,
            monthly_benefit_reference: monthly_benefit
                * safe_ratio(raw.reference_monthly_ceiling, raw.claim_monthly_ceiling),
            claim_monthly_ceiling: raw.claim_monthly_ceiling,
            reference_monthly_ceiling: raw.reference_monthly_ceiling,
        }
    }
}
