//! Out-of-domain checks run before any projection work starts

use super::engine::ProjectionConfig;
use crate::error::{ValidationError, Violation};
use crate::profile::{EarningsHistory, PersonProfile, LAST_HISTORY_AGE};
use crate::reference::ReferenceTable;

/// Oldest life expectancy accepted
pub const MAX_LIFE_EXPECTANCY: u32 = 120;

/// Check a projection request, collecting every violation
pub fn validate(
    profile: &PersonProfile,
    history: &EarningsHistory,
    table: &ReferenceTable,
    config: &ProjectionConfig,
) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if !(1..=12).contains(&profile.birth_month) {
        violations.push(Violation::new(
            "birth_month",
            format!("must be between 1 and 12, got {}", profile.birth_month),
        ));
    }

    let claim_age = profile.benefit_claim_age;
    if !config.claim_ages().contains(&claim_age) {
        violations.push(Violation::new(
            "benefit_claim_age",
            format!(
                "must be between {} and {}, got {}",
                config.min_claim_age, config.max_claim_age, claim_age
            ),
        ));
    }

    let start_age = profile.start_age();
    if !(start_age..=LAST_HISTORY_AGE).contains(&profile.retirement_age) {
        violations.push(Violation::new(
            "retirement_age",
            format!(
                "must be between {} and {}, got {}",
                start_age, LAST_HISTORY_AGE, profile.retirement_age
            ),
        ));
    }

    let life_expectancy = profile.life_expectancy_age;
    if life_expectancy <= claim_age || life_expectancy > MAX_LIFE_EXPECTANCY {
        violations.push(Violation::new(
            "life_expectancy_age",
            format!(
                "must be above the claim age ({}) and at most {}, got {}",
                claim_age, MAX_LIFE_EXPECTANCY, life_expectancy
            ),
        ));
    }

    for (field, rate) in [
        ("inflation_rate", profile.inflation_rate),
        ("salary_growth_rate", profile.salary_growth_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            violations.push(Violation::new(field, format!("must be a rate above -100%, got {}", rate)));
        }
    }

    for (field, percent) in [
        ("earnings_replacement_before", profile.earnings_replacement_before),
        ("earnings_replacement_after", profile.earnings_replacement_after),
    ] {
        if !percent.is_finite() || percent < 0.0 {
            violations.push(Violation::new(field, format!("must be a non-negative percentage, got {}", percent)));
        }
    }

    let expected_len = (start_age..=LAST_HISTORY_AGE).count();
    if history.start_age() != Some(start_age) || history.len() != expected_len {
        violations.push(Violation::new(
            "earnings",
            format!(
                "history must cover ages {}..={} ({} years), got {} years starting at {:?}",
                start_age,
                LAST_HISTORY_AGE,
                expected_len,
                history.len(),
                history.start_age()
            ),
        ));
    }

    if table.is_empty() {
        violations.push(Violation::new("reference_table", "has no years"));
    } else if !table.contains(profile.reference_year) {
        violations.push(Violation::new(
            "reference_year",
            format!(
                "{} is outside the reference table ({:?}..={:?})",
                profile.reference_year,
                table.first_year(),
                table.last_year()
            ),
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}
