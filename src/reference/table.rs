//! Year-indexed QPP reference table (MGA, MSGA, rates, phase-in fractions)
//!
//! Built once per salary-growth assumption from raw rows that may have gaps.
//! Missing cells are derived year by year in ascending order, so every derived
//! value only depends on earlier years (the trailing 5-year average looks back).

use serde::{Deserialize, Serialize};

/// Default base contribution rate (%) when a row leaves it blank
pub const DEFAULT_BASE_RATE: f64 = 5.25;
/// Default basic exemption when a row leaves it blank
pub const DEFAULT_EXEMPTION: f64 = 3500.0;
/// Default first supplementary contribution rate (%)
pub const DEFAULT_SUPPLEMENTARY_RATE_V1: f64 = 0.0;
/// Default second supplementary contribution rate (%)
pub const DEFAULT_SUPPLEMENTARY_RATE_V2: f64 = 1.0;
/// Default phase-in percentage of the first supplementary component
pub const DEFAULT_INTRODUCTION_FRACTION_V1: f64 = 0.0;
/// MSGA is 114% of the MGA, rounded down to the hundred
pub const SUPPLEMENTARY_CEILING_FACTOR: f64 = 1.14;

/// Raw table row as read from the source file. `None` means "derive it".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReferenceRow {
    pub year: i32,
    pub ceiling_earnings: Option<f64>,
    pub trailing5_avg_ceiling: Option<f64>,
    pub trailing5_avg_monthly_ceiling: Option<f64>,
    pub supplementary_ceiling: Option<f64>,
    pub base_rate: Option<f64>,
    pub exemption: Option<f64>,
    pub supplementary_rate_v1: Option<f64>,
    pub supplementary_rate_v2: Option<f64>,
    pub unrounded_ceiling: Option<f64>,
    pub introduction_fraction_v1: Option<f64>,
}

impl RawReferenceRow {
    /// A row with only the year filled in
    pub fn blank(year: i32) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }
}

/// Fully resolved reference values for one calendar year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceYearRecord {
    pub year: i32,
    /// MGA: maximum pensionable earnings
    pub ceiling_earnings: f64,
    /// Mean MGA over the year and the four before it (absent for the first four years)
    pub trailing5_avg_ceiling: Option<f64>,
    pub trailing5_avg_monthly_ceiling: Option<f64>,
    /// MSGA: additional maximum pensionable earnings
    pub supplementary_ceiling: f64,
    /// Percent
    pub base_rate: f64,
    pub exemption: f64,
    /// Percent
    pub supplementary_rate_v1: f64,
    /// Percent
    pub supplementary_rate_v2: f64,
    pub unrounded_ceiling: f64,
    /// Percent
    pub introduction_fraction_v1: f64,
}

/// Immutable year -> record lookup over a contiguous range of years
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceTable {
    first_year: i32,
    records: Vec<ReferenceYearRecord>,
    salary_growth_rate: f64,
}

impl ReferenceTable {
    /// Build the table from raw rows and a salary growth assumption (%)
    ///
    /// Rows are sorted by year; gaps between the first and last year are filled
    /// with blank rows and duplicate years keep their first occurrence.
    pub fn build(rows: &[RawReferenceRow], salary_growth_rate: f64) -> Self {
        let rows = normalize_rows(rows);
        let growth = 1.0 + salary_growth_rate / 100.0;

        let mut records: Vec<ReferenceYearRecord> = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            let prev = records.last();

            // Rule 1: unrounded MGA grows from the prior year
            let unrounded_ceiling = match (row.unrounded_ceiling, prev) {
                (Some(value), _) => value,
                (None, Some(p)) => p.unrounded_ceiling * growth,
                // Nothing to grow from: fall back on the year's own MGA
                (None, None) => row.ceiling_earnings.unwrap_or(0.0),
            };

            // Rule 2: MGA rounds the unrounded value down to the hundred
            let ceiling_earnings = row
                .ceiling_earnings
                .unwrap_or_else(|| round_down_to_hundred(unrounded_ceiling));

            // Rule 3: trailing 5-year average needs four prior years
            let trailing5_avg_ceiling = row.trailing5_avg_ceiling.or_else(|| {
                if i < 4 {
                    None
                } else {
                    let window = &records[i - 4..i];
                    let sum: f64 = window.iter().map(|r| r.ceiling_earnings).sum::<f64>()
                        + ceiling_earnings;
                    Some(sum / 5.0)
                }
            });

            // Rule 4
            let trailing5_avg_monthly_ceiling = row
                .trailing5_avg_monthly_ceiling
                .or_else(|| trailing5_avg_ceiling.map(|avg| avg / 12.0));

            // Rule 5
            let supplementary_ceiling = row.supplementary_ceiling.unwrap_or_else(|| {
                round_down_to_hundred(ceiling_earnings * SUPPLEMENTARY_CEILING_FACTOR)
            });

            records.push(ReferenceYearRecord {
                year: row.year,
                ceiling_earnings,
                trailing5_avg_ceiling,
                trailing5_avg_monthly_ceiling,
                supplementary_ceiling,
                // Rule 6
                base_rate: row.base_rate.unwrap_or(DEFAULT_BASE_RATE),
                exemption: row.exemption.unwrap_or(DEFAULT_EXEMPTION),
                supplementary_rate_v1: row
                    .supplementary_rate_v1
                    .unwrap_or(DEFAULT_SUPPLEMENTARY_RATE_V1),
                supplementary_rate_v2: row
                    .supplementary_rate_v2
                    .unwrap_or(DEFAULT_SUPPLEMENTARY_RATE_V2),
                unrounded_ceiling,
                introduction_fraction_v1: row
                    .introduction_fraction_v1
                    .unwrap_or(DEFAULT_INTRODUCTION_FRACTION_V1),
            });
        }

        log::debug!(
            "built reference table: {} years ({:?}..={:?}), growth {}%",
            records.len(),
            records.first().map(|r| r.year),
            records.last().map(|r| r.year),
            salary_growth_rate
        );

        Self {
            first_year: records.first().map(|r| r.year).unwrap_or(0),
            records,
            salary_growth_rate,
        }
    }

    /// Salary growth assumption (%) the table was extrapolated with
    pub fn salary_growth_rate(&self) -> f64 {
        self.salary_growth_rate
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.records.first().map(|r| r.year)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.records.last().map(|r| r.year)
    }

    pub fn records(&self) -> &[ReferenceYearRecord] {
        &self.records
    }

    pub fn contains(&self, year: i32) -> bool {
        self.get(year).is_some()
    }

    /// Record for a calendar year, or `None` outside the table
    pub fn get(&self, year: i32) -> Option<&ReferenceYearRecord> {
        let offset = year.checked_sub(self.first_year)?;
        usize::try_from(offset).ok().and_then(|i| self.records.get(i))
    }

    // Lookups below read absent years as zero.

    /// MGA for the year
    pub fn ceiling(&self, year: i32) -> f64 {
        self.get(year).map_or(0.0, |r| r.ceiling_earnings)
    }

    /// MSGA for the year
    pub fn supplementary_ceiling(&self, year: i32) -> f64 {
        self.get(year).map_or(0.0, |r| r.supplementary_ceiling)
    }

    /// Trailing 5-year average MGA divided by 12
    pub fn monthly_average_ceiling(&self, year: i32) -> f64 {
        self.get(year)
            .and_then(|r| r.trailing5_avg_monthly_ceiling)
            .unwrap_or(0.0)
    }

    /// Phase-in percentage of the first supplementary component
    pub fn introduction_fraction_v1(&self, year: i32) -> f64 {
        self.get(year).map_or(0.0, |r| r.introduction_fraction_v1)
    }
}

fn round_down_to_hundred(value: f64) -> f64 {
    (value / 100.0).floor() * 100.0
}

/// Sort, de-duplicate and fill year gaps so the rows are contiguous
fn normalize_rows(rows: &[RawReferenceRow]) -> Vec<RawReferenceRow> {
    let mut sorted: Vec<&RawReferenceRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.year);

    let mut out: Vec<RawReferenceRow> = Vec::with_capacity(sorted.len());
    for row in sorted {
        match out.last() {
            Some(last) if last.year == row.year => {
                log::warn!("duplicate reference year {}, keeping first row", row.year);
            }
            Some(last) => {
                for gap_year in (last.year + 1)..row.year {
                    log::debug!("reference year {} missing, deriving every column", gap_year);
                    out.push(RawReferenceRow::blank(gap_year));
                }
                out.push(row.clone());
            }
            None => out.push(row.clone()),
        }
    }
    out
}
