//! Person profile, earnings history and their loaders

mod data;
mod earnings;
pub mod loader;

pub use data::{PersonProfile, CONTRIBUTORY_SLOTS, LAST_HISTORY_AGE, PROTECTION_AGE};
pub use earnings::{EarningsEntry, EarningsHistory, EarningsMode, ResolvedEarnings};
pub use loader::{load_earnings, load_earnings_from_reader, load_profile};
