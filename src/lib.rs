//! RRQ Projection - Quebec Pension Plan retirement benefit and contribution IRR engine
//!
//! This library provides:
//! - MGA reference table construction with extrapolation of future years
//! - Yearly contributions (base plan and both supplementary components)
//! - The retirement benefit formula with drop-out and early/late adjustment
//! - A benefit grid by claim age and contributory years, with the IRR of
//!   every year of contributions
//! - Batch runs over salary growth scenarios

pub mod error;
pub mod reference;
pub mod profile;
pub mod benefits;
pub mod projection;
pub mod scenario;

// Re-export commonly used types
pub use error::{LoadError, ValidationError, Violation};
pub use reference::{ReferenceTable, ReferenceTableCache};
pub use profile::{EarningsHistory, EarningsMode, PersonProfile};
pub use benefits::{BenefitFormula, BenefitResult, ContributionEngine};
pub use projection::{IrrSolver, ProjectionConfig, ProjectionEngine, ProjectionResult};
pub use scenario::ScenarioRunner;
