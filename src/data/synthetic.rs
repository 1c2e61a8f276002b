//! Deterministic analytic isochrone tables.
//!
//! Used when no model directory is configured. The shapes are schematic, not
//! physical: a main sequence from simple mass-luminosity and mass-temperature
//! power laws, a turnoff set by a lifetime scaling, and a short post-turnoff
//! branch. Metallicity, rotation, and inclination perturb the curves enough to
//! make every grid key distinguishable.

use crate::data::{header_for, RawAgeBlock, RawTable, TableReader};
use crate::domain::{GridKey, PhotometricSet};
use crate::error::{GridError, GridResult};
use crate::grid::linear_steps;

/// Lowest initial mass in every bucket (solar masses).
const MASS_MIN: f64 = 0.1;
/// Upper cap on initial mass.
const MASS_CAP: f64 = 150.0;
/// Rows per age bucket.
const ROWS_PER_AGE: usize = 120;
/// Width of the post-turnoff branch, as a fraction of the turnoff mass.
const BRANCH_WIDTH: f64 = 0.08;
/// Solar log10(Teff).
const LOG_TEFF_SUN: f64 = 3.7617;
/// Solar bolometric magnitude.
const MBOL_SUN: f64 = 4.74;

#[derive(Debug, Clone)]
pub struct SyntheticReader {
    ages: Vec<f64>,
}

impl SyntheticReader {
    /// Ages from `age_min` to `age_max` (inclusive) every `age_step` dex.
    pub fn new(age_min: f64, age_max: f64, age_step: f64) -> GridResult<Self> {
        let ages = linear_steps(age_min, age_max, age_step);
        if ages.is_empty() {
            return Err(GridError::Configuration(format!(
                "invalid synthetic age range {age_min}..{age_max} step {age_step}"
            )));
        }
        Ok(Self { ages })
    }

    pub fn ages(&self) -> &[f64] {
        &self.ages
    }
}

impl TableReader for SyntheticReader {
    fn load_table(&self, key: GridKey, _extra_tag: &str, photometry: PhotometricSet) -> GridResult<RawTable> {
        let header = header_for(photometry);
        let filters = photometry.filters();
        let blocks = self
            .ages
            .iter()
            .map(|&age| synth_block(key, age, filters))
            .collect();
        Ok(RawTable { header, blocks })
    }
}

fn synth_block(key: GridKey, log_age: f64, filters: &[&str]) -> RawAgeBlock {
    let feh = key.metallicity();
    let vvc = key.rotation();
    let cos_i = key.inclination().to_radians().cos();

    // Main-sequence lifetime ~ 1e10 yr * M^-2.5; rotation mixes in fresh fuel.
    let m_turnoff = 10f64.powf((10.0 - log_age) / 2.5) * (1.0 + 0.1 * vvc) * (1.0 + 0.05 * feh);
    let m_max = (m_turnoff * (1.0 + BRANCH_WIDTH)).min(MASS_CAP).max(MASS_MIN * 1.01);

    let ln_lo = MASS_MIN.ln();
    let ln_hi = m_max.ln();

    let mut initial_mass = Vec::with_capacity(ROWS_PER_AGE);
    let mut rows = Vec::with_capacity(ROWS_PER_AGE);

    for i in 0..ROWS_PER_AGE {
        let u = i as f64 / (ROWS_PER_AGE as f64 - 1.0);
        let m = (ln_lo + u * (ln_hi - ln_lo)).exp();
        let log_m = m.log10();

        let mut log_l = if m > 0.43 { 4.0 * log_m } else { 2.3 * log_m - 0.37 };
        let mut log_t = LOG_TEFF_SUN + if m > 1.0 { 0.55 * log_m } else { 0.6 * log_m };

        // Brighten toward the turnoff, then peel off onto the branch.
        log_l += 0.25 * (m / m_turnoff).min(1.0).powi(2);
        let branch = ((m - m_turnoff) / (BRANCH_WIDTH * m_turnoff)).clamp(0.0, 1.0);
        log_t -= 0.35 * branch;
        log_l += 1.2 * branch;

        log_t -= 0.04 * feh + 0.01 * vvc;
        log_l -= 0.05 * feh;

        // Gravity darkening: pole-on looks hotter and brighter than equator-on.
        log_t += 0.03 * vvc * (cos_i - 0.5);
        log_l += 0.1 * vvc * (cos_i - 0.5);

        let star_mass = m * (1.0 - 0.02 * branch);
        let log_g = star_mass.log10() + 4.0 * log_t - log_l - 10.6088;
        let phase = if branch > 0.0 { 2.0 } else { 0.0 };
        let m_bol = MBOL_SUN - 2.5 * log_l;

        let mut row = Vec::with_capacity(9 + filters.len() + 1);
        row.extend_from_slice(&[
            i as f64 + 1.0,
            log_age,
            m,
            star_mass,
            log_t,
            log_g,
            log_l,
            feh,
            feh - 0.02 * branch,
        ]);
        row.extend(filters.iter().map(|f| filter_magnitude(f, m_bol, log_t)));
        row.push(phase);

        initial_mass.push(m);
        rows.push(row);
    }

    RawAgeBlock {
        log_age,
        initial_mass,
        rows,
    }
}

/// Absolute magnitude in a filter from a linear color-temperature relation.
///
/// Bluer filters (shorter effective wavelength) brighten faster with Teff.
fn filter_magnitude(filter: &str, m_bol: f64, log_t: f64) -> f64 {
    let ratio = 0.55 / effective_wavelength_um(filter);
    let zero_point = 0.09 + 2.6 * (ratio - 1.0);
    let slope = 1.5 + 6.0 * (ratio - 1.0);
    m_bol + zero_point + slope * 10.0 * (LOG_TEFF_SUN - log_t)
}

fn effective_wavelength_um(filter: &str) -> f64 {
    match filter {
        "Bessell_U" => 0.36,
        "Bessell_B" | "Tycho_B" => 0.44,
        "Gaia_BP_DR2Rev" => 0.51,
        "Hipparcos_Hp" => 0.52,
        "Tycho_V" | "Bessell_V" | "Kepler_D51" => 0.55,
        "Gaia_G_DR2Rev" => 0.62,
        "Kepler_Kp" => 0.64,
        "Bessell_R" => 0.66,
        "Gaia_RP_DR2Rev" => 0.78,
        "TESS" => 0.80,
        "Bessell_I" => 0.81,
        "2MASS_J" => 1.24,
        "2MASS_H" => 1.66,
        "2MASS_Ks" => 2.16,
        _ => 0.55,
    }
}
