//! Person profile driving every derived year and age

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Number of contributory year slots (start age through age 71, or 72 for December births)
pub const CONTRIBUTORY_SLOTS: usize = 55;

/// Last age covered by an earnings history
pub const LAST_HISTORY_AGE: u32 = 72;

/// Claim age the benefit protection pass is pinned to
pub const PROTECTION_AGE: u32 = 65;

/// Person and economic assumptions for one projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonProfile {
    pub birth_year: i32,
    /// 1..=12
    pub birth_month: u32,
    pub birth_day: u32,

    /// Age at which earnings stop
    pub retirement_age: u32,

    /// Age at which the pension starts
    pub benefit_claim_age: u32,

    /// Age up to which benefits are received in the IRR cash flows
    pub life_expectancy_age: u32,

    /// Self-employed workers pay both the employee and employer share
    #[serde(default)]
    pub self_employed: bool,

    /// Percent per year
    pub inflation_rate: f64,

    /// Percent per year, drives the MGA extrapolation
    pub salary_growth_rate: f64,

    /// Year whose dollars results are presented in
    pub reference_year: i32,

    /// Percent of the MGA earned in years before the reference year
    pub earnings_replacement_before: f64,

    /// Percent of the MGA earned from the reference year on
    pub earnings_replacement_after: f64,
}

impl Default for PersonProfile {
    fn default() -> Self {
        Self {
            birth_year: 1990,
            birth_month: 12,
            birth_day: 1,
            retirement_age: 65,
            benefit_claim_age: 65,
            life_expectancy_age: 95,
            self_employed: false,
            inflation_rate: 2.1,
            salary_growth_rate: 3.1,
            reference_year: 2025,
            earnings_replacement_before: 114.0,
            earnings_replacement_after: 114.0,
        }
    }
}

impl PersonProfile {
    pub fn born_in_december(&self) -> bool {
        self.birth_month == 12
    }

    /// First contributory age: 18 for December births (the first year would have no months), else 17
    pub fn start_age(&self) -> u32 {
        if self.born_in_december() {
            18
        } else {
            17
        }
    }

    /// Calendar year in which the person is `age` for most of the year
    pub fn year_at_age(&self, age: u32) -> i32 {
        self.birth_year + age as i32 + 1
    }

    /// Calendar year of a contributory slot (0-based)
    pub fn slot_year(&self, slot: usize) -> i32 {
        self.year_at_age(self.start_age()) + slot as i32
    }

    /// Age of a contributory slot (0-based)
    pub fn slot_age(&self, slot: usize) -> u32 {
        self.start_age() + slot as u32
    }

    /// Slot index of a calendar year, if it is one of the contributory years
    pub fn slot_of_year(&self, year: i32) -> Option<usize> {
        let offset = year - self.slot_year(0);
        usize::try_from(offset).ok().filter(|&slot| slot < CONTRIBUTORY_SLOTS)
    }

    /// Birth date, with an impossible day clamped to the month's last day
    pub fn birth_date(&self) -> NaiveDate {
        let month = self.birth_month.clamp(1, 12);
        let day = self.birth_day.clamp(1, 31);
        (28..=day)
            .rev()
            .chain(std::iter::once(day.min(28)))
            .find_map(|d| NaiveDate::from_ymd_opt(self.birth_year, month, d))
            .unwrap_or_default()
    }

    /// Pension start date when claiming at `age`: first day of the month after the birthday
    pub fn claim_date_for_age(&self, age: u32) -> NaiveDate {
        if self.born_in_december() {
            first_of_month(self.year_at_age(age), 1)
        } else {
            first_of_month(self.birth_year + age as i32, self.birth_month + 1)
        }
    }

    /// Requested pension start date
    pub fn claim_date(&self) -> NaiveDate {
        self.claim_date_for_age(self.benefit_claim_age)
    }

    /// Pension start date of the age-65 protection pass
    pub fn protection_claim_date(&self) -> NaiveDate {
        self.claim_date_for_age(PROTECTION_AGE)
    }

    /// Completed age in years at a pension start date
    pub fn age_at(&self, date: NaiveDate) -> i32 {
        let months = date.year() * 12 + date.month() as i32
            - self.birth_year * 12
            - self.birth_month as i32;
        months.div_euclid(12)
    }

    /// Earnings replacement percentage for a calendar year, as a fraction
    pub fn replacement_fraction(&self, year: i32) -> f64 {
        let percent = if year < self.reference_year {
            self.earnings_replacement_before
        } else {
            self.earnings_replacement_after
        };
        percent / 100.0
    }

    /// Inflation as a growth factor
    pub fn inflation_factor(&self) -> f64 {
        1.0 + self.inflation_rate / 100.0
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month.clamp(1, 12), 1).unwrap_or_default()
}
