//! Benefit grid, marginal benefits and the IRR of each contribution year

mod cashflows;
mod engine;
mod irr;
mod validation;

pub use cashflows::{CashFlowSeries, DetailRow, ProjectionResult, ProjectionSummary, YearIrr};
pub use engine::{marginal_benefits, ProjectionConfig, ProjectionEngine};
pub use irr::{initial_guess, npv_and_derivative, npv_at_rate, IrrSolver, NO_SOLUTION};
pub use validation::{validate, MAX_LIFE_EXPECTANCY};
