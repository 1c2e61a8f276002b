//! Table sources.
//!
//! The grid treats table readers strictly as data sources: a reader turns a
//! grid key into a [`RawTable`] and knows nothing about curves or axes.
//!
//! - `synthetic`: deterministic analytic tables (no files needed)
//! - `crate::io::table_csv`: CSV model directories on disk

use crate::domain::{GridKey, PhotometricSet};
use crate::error::GridResult;

pub mod synthetic;

pub use synthetic::SyntheticReader;

/// Leading header columns of a model table, in order.
///
/// Readers emit this block, then the photometric set's filters, then
/// [`PHASE_COLUMN`].
pub const LEADING_COLUMNS: [&str; 9] = [
    "EEP",
    "log10_isochrone_age_yr",
    "initial_mass",
    "star_mass",
    "log_Teff",
    "log_g",
    "log_L",
    "[Fe/H]_init",
    "[Fe/H]",
];

pub const AGE_COLUMN: &str = "log10_isochrone_age_yr";
pub const MASS_COLUMN: &str = "initial_mass";
pub const PHASE_COLUMN: &str = "phase";

/// Full header for a photometric set.
pub fn header_for(photometry: PhotometricSet) -> Vec<String> {
    LEADING_COLUMNS
        .iter()
        .chain(photometry.filters().iter())
        .chain(std::iter::once(&PHASE_COLUMN))
        .map(|s| s.to_string())
        .collect()
}

/// Rows at a single age, as produced by a reader.
#[derive(Debug, Clone)]
pub struct RawAgeBlock {
    pub log_age: f64,
    /// Initial mass per row, non-decreasing.
    pub initial_mass: Vec<f64>,
    /// Row-major values aligned with [`RawTable::header`].
    pub rows: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub header: Vec<String>,
    /// Age buckets, strictly increasing in `log_age`.
    pub blocks: Vec<RawAgeBlock>,
}

/// External table-reader collaborator.
///
/// Implementations must be shareable across threads: the grid loads all keys
/// in parallel.
pub trait TableReader: Sync {
    fn load_table(&self, key: GridKey, extra_tag: &str, photometry: PhotometricSet) -> GridResult<RawTable>;
}
