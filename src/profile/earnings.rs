//! Earnings history and its resolution into concrete yearly amounts
//!
//! Entries that were not supplied are filled from the MGA of the year times the
//! earnings-replacement percentage, so the benefit formula only ever sees plain
//! numbers.

use super::data::{PersonProfile, CONTRIBUTORY_SLOTS, LAST_HISTORY_AGE};
use crate::reference::ReferenceTable;
use serde::{Deserialize, Serialize};

/// How supplied earnings values are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EarningsMode {
    /// Dollar amounts
    #[default]
    Amount,
    /// Percent of the year's MGA
    PercentOfCeiling,
}

/// One contributory year of the history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarningsEntry {
    pub age: u32,
    pub year: i32,
    /// `None` when not provided
    pub earnings: Option<f64>,
}

/// Earnings by age, from the start age through age 72
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsHistory {
    pub mode: EarningsMode,
    entries: Vec<EarningsEntry>,
}

impl EarningsHistory {
    /// History with nothing supplied: every year is extrapolated
    pub fn empty(profile: &PersonProfile) -> Self {
        let entries = (profile.start_age()..=LAST_HISTORY_AGE)
            .map(|age| EarningsEntry {
                age,
                year: profile.year_at_age(age),
                earnings: None,
            })
            .collect();

        Self {
            mode: EarningsMode::Amount,
            entries,
        }
    }

    /// History from values by slot; missing trailing slots stay unsupplied
    pub fn from_values(profile: &PersonProfile, values: &[Option<f64>]) -> Self {
        let mut history = Self::empty(profile);
        for (entry, value) in history.entries.iter_mut().zip(values) {
            entry.earnings = *value;
        }
        history
    }

    /// The same amount for every year of the history
    pub fn flat(profile: &PersonProfile, amount: f64) -> Self {
        let mut history = Self::empty(profile);
        for entry in &mut history.entries {
            entry.earnings = Some(amount);
        }
        history
    }

    pub fn with_mode(mut self, mode: EarningsMode) -> Self {
        self.mode = mode;
        self
    }

    /// Supply earnings for an age. Ages outside the history are ignored.
    pub fn set(&mut self, age: u32, earnings: Option<f64>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.age == age) {
            entry.earnings = earnings;
        }
    }

    pub fn entries(&self) -> &[EarningsEntry] {
        &self.entries
    }

    pub fn start_age(&self) -> Option<u32> {
        self.entries.first().map(|e| e.age)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every entry into a concrete amount
    pub fn resolve(&self, profile: &PersonProfile, table: &ReferenceTable) -> ResolvedEarnings {
        let mut amounts = Vec::with_capacity(self.entries.len());

        for (i, entry) in self.entries.iter().enumerate() {
            amounts.push(resolve_entry(self.mode, i, entry, profile, table));
        }

        ResolvedEarnings { amounts }
    }
}

fn resolve_entry(
    mode: EarningsMode,
    index: usize,
    entry: &EarningsEntry,
    profile: &PersonProfile,
    table: &ReferenceTable,
) -> f64 {
    let claim_age = profile.benefit_claim_age;

    // No earnings once the pension has started
    if entry.age > claim_age || (index == 0 && entry.age >= claim_age) {
        return 0.0;
    }
    if entry.age >= profile.retirement_age {
        return 0.0;
    }

    let ceiling = table.ceiling(entry.year);

    match entry.earnings.filter(|v| v.is_finite()) {
        Some(value) => {
            let amount = match mode {
                EarningsMode::Amount => value,
                EarningsMode::PercentOfCeiling => value / 100.0 * ceiling,
            };
            amount.max(0.0)
        }
        None => {
            let full_year = profile.replacement_fraction(entry.year) * ceiling;
            let months = if entry.age + 1 == profile.retirement_age {
                // Works until the birthday month of the last year
                profile.birth_month as f64
            } else if entry.age == 17 {
                // Contributions start the month after the 18th birthday
                12.0 - profile.birth_month as f64
            } else {
                12.0
            };
            (full_year * months / 12.0).max(0.0)
        }
    }
}

/// Concrete earnings by history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEarnings {
    amounts: Vec<f64>,
}

impl ResolvedEarnings {
    /// Wrap amounts that are already resolved, one per contributory slot
    pub fn from_amounts(amounts: Vec<f64>) -> Self {
        Self { amounts }
    }

    /// All resolved amounts, through age 72
    pub fn amounts(&self) -> &[f64] {
        &self.amounts
    }

    /// Amounts of the contributory slots, padded with zeros when short
    pub fn slots(&self) -> [f64; CONTRIBUTORY_SLOTS] {
        let mut slots = [0.0; CONTRIBUTORY_SLOTS];
        for (slot, amount) in slots.iter_mut().zip(&self.amounts) {
            *slot = *amount;
        }
        slots
    }

    /// Earnings of one contributory slot, zero outside the history
    pub fn slot(&self, slot: usize) -> f64 {
        self.amounts.get(slot).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::RawReferenceRow;
    use approx::assert_relative_eq;

    fn flat_table(ceiling: f64) -> ReferenceTable {
        let rows: Vec<RawReferenceRow> = (1990..=2060)
            .map(|year| RawReferenceRow {
                ceiling_earnings: Some(ceiling),
                unrounded_ceiling: Some(ceiling),
                ..RawReferenceRow::blank(year)
            })
            .collect();
        ReferenceTable::build(&rows, 0.0)
    }

    fn profile() -> PersonProfile {
        PersonProfile {
            birth_year: 1980,
            birth_month: 11,
            birth_day: 15,
            retirement_age: 65,
            benefit_claim_age: 65,
            reference_year: 2025,
            earnings_replacement_before: 100.0,
            earnings_replacement_after: 50.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_history_spans_start_age_through_72() {
        let november = EarningsHistory::empty(&profile());
        assert_eq!(november.start_age(), Some(17));
        assert_eq!(november.len(), 56);
        assert_eq!(november.entries()[0].year, 1998);

        let december = EarningsHistory::empty(&PersonProfile::default());
        assert_eq!(december.start_age(), Some(18));
        assert_eq!(december.len(), 55);
    }

    #[test]
    fn test_missing_years_use_replacement_percentage() {
        let profile = profile();
        let table = flat_table(60000.0);
        let resolved = EarningsHistory::empty(&profile).resolve(&profile, &table);

        // Age 17, born in November: one month of earnings
        assert_relative_eq!(resolved.slot(0), 60000.0 / 12.0);
        // Age 30 (2011) is before the reference year
        assert_relative_eq!(resolved.slot(13), 60000.0);
        // Age 50 (2031) is after it
        assert_relative_eq!(resolved.slot(33), 30000.0);
        // Age 64 is the last working year: prorated by the birth month
        assert_relative_eq!(resolved.slot(47), 30000.0 * 11.0 / 12.0);
        // Retired from 65 on
        assert_eq!(resolved.slot(48), 0.0);
        assert_eq!(resolved.slot(55), 0.0);
    }

    #[test]
    fn test_supplied_values_by_mode() {
        let profile = profile();
        let table = flat_table(60000.0);

        let mut history = EarningsHistory::empty(&profile);
        history.set(30, Some(45000.0));
        history.set(31, Some(-10.0));
        history.set(32, Some(f64::NAN));
        let resolved = history.resolve(&profile, &table);
        assert_eq!(resolved.slot(13), 45000.0);
        assert_eq!(resolved.slot(14), 0.0);
        // NaN is treated as not supplied
        assert_relative_eq!(resolved.slot(15), 60000.0);

        let mut percent = EarningsHistory::empty(&profile).with_mode(EarningsMode::PercentOfCeiling);
        percent.set(30, Some(50.0));
        let resolved = percent.resolve(&profile, &table);
        assert_relative_eq!(resolved.slot(13), 30000.0);
    }

    #[test]
    fn test_no_earnings_after_claim_age() {
        let profile = PersonProfile {
            retirement_age: 71,
            benefit_claim_age: 60,
            ..profile()
        };
        let table = flat_table(60000.0);
        let resolved = EarningsHistory::flat(&profile, 50000.0).resolve(&profile, &table);

        assert_eq!(resolved.slot(43), 50000.0); // age 60
        assert_eq!(resolved.slot(44), 0.0); // age 61
    }

    #[test]
    fn test_slots_pad_short_histories() {
        let resolved = ResolvedEarnings::from_amounts(vec![1.0, 2.0]);
        let slots = resolved.slots();
        assert_eq!(slots[0], 1.0);
        assert_eq!(slots[1], 2.0);
        assert_eq!(slots[54], 0.0);
    }
}
