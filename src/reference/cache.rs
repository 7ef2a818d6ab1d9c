//! Reference tables cached by salary growth assumption
//!
//! The growth rate drives the extrapolation of every missing future year, so a
//! new rate means a new table. There is no partial invalidation: an entry is
//! either the whole table for that rate or absent.

use super::table::{RawReferenceRow, ReferenceTable};
use std::collections::HashMap;
use std::sync::Arc;

/// Growth-rate keyed cache of fully built reference tables
#[derive(Debug, Default)]
pub struct ReferenceTableCache {
    /// Raw rows every table is built from
    rows: Vec<RawReferenceRow>,

    /// Built tables by growth rate bit pattern
    entries: HashMap<u64, Arc<ReferenceTable>>,

    /// Statistics
    pub cache_hits: u64,
    pub cache_misses: u64,
}

fn cache_key(salary_growth_rate: f64) -> u64 {
    // -0.0 and 0.0 are the same assumption
    if salary_growth_rate == 0.0 {
        0.0_f64.to_bits()
    } else {
        salary_growth_rate.to_bits()
    }
}

impl ReferenceTableCache {
    /// Create an empty cache over the given raw rows
    pub fn new(rows: Vec<RawReferenceRow>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    /// Table for a growth rate, building it on first use
    pub fn get_or_build(&mut self, salary_growth_rate: f64) -> Arc<ReferenceTable> {
        let key = cache_key(salary_growth_rate);

        if let Some(table) = self.entries.get(&key) {
            self.cache_hits += 1;
            log::debug!("reference table cache hit for growth {}%", salary_growth_rate);
            return Arc::clone(table);
        }

        self.cache_misses += 1;
        log::debug!("reference table cache miss for growth {}%", salary_growth_rate);
        let table = Arc::new(ReferenceTable::build(&self.rows, salary_growth_rate));
        self.entries.insert(key, Arc::clone(&table));
        table
    }

    /// Get number of cached tables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every built table (raw rows are kept)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cache_hits = 0;
        self.cache_misses = 0;
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
