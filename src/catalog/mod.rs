//! Column catalog: the named quantities an axis expression may reference.
//!
//! Selectable photometric columns come from a fixed-position slice of a model
//! table header: everything after the leading physical block and before the
//! trailing phase column. The two physical axes used by the HRD view are
//! always available when the header carries them.

use serde::Serialize;

use crate::domain::PhotometricSet;
use crate::error::{GridError, GridResult};

/// Number of leading non-photometric header columns.
pub const PHOTOMETRY_OFFSET: usize = 9;
/// Number of trailing non-photometric header columns.
pub const PHOTOMETRY_TRAILER: usize = 1;

pub const LOG_TEFF: &str = "log_Teff";
pub const LOG_L: &str = "log_L";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ColumnCatalog {
    photometric: Vec<String>,
    physical: Vec<String>,
}

impl ColumnCatalog {
    pub fn new(photometric: Vec<String>, physical: Vec<String>) -> Self {
        Self { photometric, physical }
    }

    /// Catalog implied by a photometric set alone: its filters plus the
    /// physical HRD axes. Used where no table header is at hand.
    pub fn for_photometry(set: PhotometricSet) -> Self {
        Self {
            photometric: set.filters().iter().map(|f| f.to_string()).collect(),
            physical: vec![LOG_TEFF.to_string(), LOG_L.to_string()],
        }
    }

    /// Build the catalog from a table header row.
    pub fn from_header(header: &[String]) -> GridResult<Self> {
        if header.len() <= PHOTOMETRY_OFFSET + PHOTOMETRY_TRAILER {
            return Err(GridError::Configuration(format!(
                "header has {} columns; expected more than {} (no photometric columns)",
                header.len(),
                PHOTOMETRY_OFFSET + PHOTOMETRY_TRAILER
            )));
        }

        let photometric = header[PHOTOMETRY_OFFSET..header.len() - PHOTOMETRY_TRAILER].to_vec();
        let physical = [LOG_TEFF, LOG_L]
            .into_iter()
            .filter(|name| header[..PHOTOMETRY_OFFSET].iter().any(|h| h == name))
            .map(str::to_string)
            .collect();

        Ok(Self { photometric, physical })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.photometric.iter().any(|c| c == name) || self.physical.iter().any(|c| c == name)
    }

    pub fn is_photometric(&self, name: &str) -> bool {
        self.photometric.iter().any(|c| c == name)
    }

    /// Columns offered for `column1`.
    pub fn photometric(&self) -> &[String] {
        &self.photometric
    }

    pub fn physical(&self) -> &[String] {
        &self.physical
    }

    /// Whether both HRD axes can be resolved.
    pub fn has_hrd_axes(&self) -> bool {
        self.contains(LOG_TEFF) && self.contains(LOG_L)
    }

    /// Cycle through the photometric columns starting from `current`.
    pub fn step(&self, current: &str, delta: i32) -> Option<&str> {
        let n = self.photometric.len();
        if n == 0 {
            return None;
        }
        let idx = self.photometric.iter().position(|c| c == current).unwrap_or(0) as i64;
        let next = (idx + delta as i64).rem_euclid(n as i64) as usize;
        Some(&self.photometric[next])
    }

    /// Cycle through the optional second-column choices (`None` + photometric).
    pub fn step_optional(&self, current: Option<&str>, delta: i32) -> Option<&str> {
        let n = self.photometric.len() as i64 + 1;
        let idx = match current {
            None => 0,
            Some(name) => self
                .photometric
                .iter()
                .position(|c| c == name)
                .map_or(0, |p| p as i64 + 1),
        };
        let next = (idx + delta as i64).rem_euclid(n) as usize;
        if next == 0 {
            None
        } else {
            Some(&self.photometric[next - 1])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        [
            "EEP",
            "log10_isochrone_age_yr",
            "initial_mass",
            "star_mass",
            "log_Teff",
            "log_g",
            "log_L",
            "[Fe/H]_init",
            "[Fe/H]",
            "Tycho_B",
            "Tycho_V",
            "phase",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn header_slice_selects_filters() {
        let catalog = ColumnCatalog::from_header(&header()).unwrap();
        assert_eq!(catalog.photometric(), &["Tycho_B".to_string(), "Tycho_V".to_string()]);
        assert!(catalog.has_hrd_axes());
        assert!(!catalog.contains("phase"));
        assert!(!catalog.contains("star_mass"));
    }

    #[test]
    fn photometry_catalog_separates_filters_from_physical_axes() {
        let catalog = ColumnCatalog::for_photometry(PhotometricSet::Tycho);
        assert!(catalog.is_photometric("Tycho_V"));
        assert!(!catalog.is_photometric("log_L"));
        assert!(catalog.has_hrd_axes());
    }

    #[test]
    fn short_header_is_a_configuration_error() {
        let short: Vec<String> = header().into_iter().take(10).collect();
        assert!(matches!(
            ColumnCatalog::from_header(&short),
            Err(GridError::Configuration(_))
        ));
    }

    #[test]
    fn optional_step_passes_through_none() {
        let catalog = ColumnCatalog::from_header(&header()).unwrap();
        assert_eq!(catalog.step_optional(None, 1), Some("Tycho_B"));
        assert_eq!(catalog.step_optional(Some("Tycho_V"), 1), None);
        assert_eq!(catalog.step_optional(None, -1), Some("Tycho_V"));
        assert_eq!(catalog.step("Tycho_V", 1), Some("Tycho_B"));
    }
}
