//! Contributions and the retirement benefit formula

mod contribution;
mod formula;
pub mod ranking;

pub use contribution::{ContributionEngine, ContributionSchedule, ContributionYearRecord};
pub use formula::{
    BenefitFormula, BenefitResult, RawBenefit, SlotDetail, MAX_ADJUSTMENT_FACTOR,
    SUPPLEMENTARY_V1_START_YEAR, SUPPLEMENTARY_V2_START_YEAR,
};
