//! QPP reference data: MGA table, contribution rates and supplementary plan phase-in

mod table;
mod cache;
pub mod loader;

pub use table::{
    RawReferenceRow, ReferenceTable, ReferenceYearRecord, DEFAULT_BASE_RATE, DEFAULT_EXEMPTION,
    DEFAULT_INTRODUCTION_FRACTION_V1, DEFAULT_SUPPLEMENTARY_RATE_V1, DEFAULT_SUPPLEMENTARY_RATE_V2,
    SUPPLEMENTARY_CEILING_FACTOR,
};
pub use cache::ReferenceTableCache;
pub use loader::{clean_numeric, load_reference_rows, load_reference_rows_from_reader, DEFAULT_REFERENCE_PATH};

use crate::error::LoadError;
use std::path::Path;

impl ReferenceTable {
    /// Build from the reference table compiled into the crate
    pub fn bundled(salary_growth_rate: f64) -> Result<Self, LoadError> {
        let rows = loader::load_bundled_rows()?;
        Ok(Self::build(&rows, salary_growth_rate))
    }

    /// Build from a reference CSV file
    pub fn from_csv_path(path: &Path, salary_growth_rate: f64) -> Result<Self, LoadError> {
        let rows = load_reference_rows(path)?;
        Ok(Self::build(&rows, salary_growth_rate))
    }
}
