//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between the grid, the controller, and the front-ends
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::expr::AxisExpr;
use crate::grid::Discretization;

/// Fixed-point scale for metallicity (0.01 dex).
pub const METALLICITY_SCALE: f64 = 100.0;
/// Fixed-point scale for rotation rate v/vcrit (0.1).
pub const ROTATION_SCALE: f64 = 10.0;
/// Fixed-point scale for inclination in degrees (0.1 deg).
pub const INCLINATION_SCALE: f64 = 10.0;

/// Discretized (metallicity, rotation, inclination) triple identifying one table.
///
/// Components are stored as integers in units of the declared precision, so
/// lookups never compare floats. Snapping happens once, in [`GridKey::snap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridKey {
    feh_centi: i32,
    vvc_deci: i32,
    incl_deci: i32,
}

impl GridKey {
    /// Snap raw (possibly slider-derived) values onto the key precision.
    ///
    /// Returns `None` for non-finite inputs.
    pub fn snap(metallicity: f64, rotation: f64, inclination: f64) -> Option<Self> {
        Some(Self {
            feh_centi: to_fixed(metallicity, METALLICITY_SCALE)?,
            vvc_deci: to_fixed(rotation, ROTATION_SCALE)?,
            incl_deci: to_fixed(inclination, INCLINATION_SCALE)?,
        })
    }

    pub fn metallicity(&self) -> f64 {
        self.feh_centi as f64 / METALLICITY_SCALE
    }

    pub fn rotation(&self) -> f64 {
        self.vvc_deci as f64 / ROTATION_SCALE
    }

    pub fn inclination(&self) -> f64 {
        self.incl_deci as f64 / INCLINATION_SCALE
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Fe/H]={:+.2} v/vc={:.1} i={:.1}",
            self.metallicity(),
            self.rotation(),
            self.inclination()
        )
    }
}

fn to_fixed(value: f64, scale: f64) -> Option<i32> {
    if !value.is_finite() {
        return None;
    }
    let scaled = (value * scale).round();
    if scaled.abs() > i32::MAX as f64 {
        return None;
    }
    Some(scaled as i32)
}

/// Round `value` to the nearest multiple of `step`.
///
/// The result is additionally rounded to 1e-9 so repeated snapping is stable
/// (e.g. `8.52` stays `8.52` rather than drifting to `8.520000000000001`).
pub fn snap_to_step(value: f64, step: f64) -> f64 {
    if !(step.is_finite() && step > 0.0) {
        return value;
    }
    let snapped = (value / step).round() * step;
    (snapped * 1e9).round() / 1e9
}

/// Inclusive initial-mass window, in solar masses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassRange {
    pub lo: f64,
    pub hi: f64,
}

impl MassRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, mass: f64) -> bool {
        mass >= self.lo && mass <= self.hi
    }
}

/// One immutable curve query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRequest {
    pub key: GridKey,
    /// log10(age / yr).
    pub age: f64,
    pub x: AxisExpr,
    pub y: AxisExpr,
    /// Additive shift applied to the y sequence.
    pub dmod: f64,
    pub mass_range: Option<MassRange>,
}

/// Two derived sequences plus their resolved labels.
///
/// Non-finite entries are kept in place; renderers skip them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveResult {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub x_label: String,
    pub y_label: String,
}

impl CurveResult {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Points where both coordinates are finite.
    pub fn finite_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| (x, y))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    }
}

/// Logical curve roles refreshed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurveRole {
    Primary,
    Reference,
    /// Primary table selection, restricted to the shared mass range.
    MassHighlight,
    /// Physical log_Teff vs log_L curve for the primary selection.
    Hrd,
}

impl CurveRole {
    pub const ALL: [CurveRole; 4] = [
        CurveRole::Primary,
        CurveRole::Reference,
        CurveRole::MassHighlight,
        CurveRole::Hrd,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            CurveRole::Primary => "primary",
            CurveRole::Reference => "reference",
            CurveRole::MassHighlight => "mass highlight",
            CurveRole::Hrd => "HRD",
        }
    }
}

/// Per-role table selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    /// log10(age / yr).
    pub age: f64,
    pub metallicity: f64,
    pub rotation: f64,
    pub inclination: f64,
    pub dmod: f64,
}

impl ParameterState {
    pub fn new(age: f64, metallicity: f64, rotation: f64, inclination: f64) -> Self {
        Self {
            age,
            metallicity,
            rotation,
            inclination,
            dmod: 0.0,
        }
    }
}

/// Whether the secondary (HRD) curve role is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    Cmd,
    CmdWithHrd,
}

/// Selectable photometric systems.
///
/// Each set fixes which filter columns sit between the leading physical
/// columns and the trailing `phase` column of a model table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum PhotometricSet {
    #[value(name = "UBVRIplus", alias = "ubvriplus")]
    #[serde(rename = "UBVRIplus")]
    UbvriPlus,
    #[value(name = "Tycho", alias = "tycho")]
    #[serde(rename = "Tycho")]
    Tycho,
    #[value(name = "Gaia", alias = "gaia")]
    #[serde(rename = "Gaia")]
    Gaia,
}

impl PhotometricSet {
    pub fn tag(self) -> &'static str {
        match self {
            PhotometricSet::UbvriPlus => "UBVRIplus",
            PhotometricSet::Tycho => "Tycho",
            PhotometricSet::Gaia => "Gaia",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(tag.trim(), true).ok()
    }

    /// Filter columns carried by tables of this set, in header order.
    pub fn filters(self) -> &'static [&'static str] {
        match self {
            PhotometricSet::UbvriPlus => &[
                "Bessell_U",
                "Bessell_B",
                "Bessell_V",
                "Bessell_R",
                "Bessell_I",
                "2MASS_J",
                "2MASS_H",
                "2MASS_Ks",
                "Kepler_Kp",
                "Kepler_D51",
                "Hipparcos_Hp",
                "Tycho_B",
                "Tycho_V",
                "Gaia_G_DR2Rev",
                "Gaia_BP_DR2Rev",
                "Gaia_RP_DR2Rev",
                "TESS",
            ],
            PhotometricSet::Tycho => &["Hipparcos_Hp", "Tycho_B", "Tycho_V"],
            PhotometricSet::Gaia => &["Gaia_G_DR2Rev", "Gaia_BP_DR2Rev", "Gaia_RP_DR2Rev"],
        }
    }

    /// Startup axes: a color index against a single magnitude.
    pub fn default_axes(self) -> (AxisExpr, AxisExpr) {
        match self {
            PhotometricSet::UbvriPlus | PhotometricSet::Tycho => (
                AxisExpr::combined("Tycho_B", crate::expr::AxisOp::Subtract, "Tycho_V"),
                AxisExpr::column("Tycho_V"),
            ),
            PhotometricSet::Gaia => (
                AxisExpr::combined("Gaia_BP_DR2Rev", crate::expr::AxisOp::Subtract, "Gaia_RP_DR2Rev"),
                AxisExpr::column("Gaia_G_DR2Rev"),
            ),
        }
    }
}

impl fmt::Display for PhotometricSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Immutable startup configuration, resolved before the grid load begins.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub photometry: PhotometricSet,
    /// Directory of CSV model tables. Synthetic tables are generated when absent.
    pub models_dir: Option<PathBuf>,
    /// Optional two-column observational overlay file.
    pub overlay: Option<PathBuf>,
    pub discretization: Discretization,
    /// Declared log-age precision of every table.
    pub age_step: f64,
    pub default_age: f64,
    /// Reference-curve starting age.
    pub reference_age: f64,
    /// Slider bounds for log-age.
    pub age_min: f64,
    pub age_max: f64,
    /// Table variant tag (e.g. `TP` for thermally-pulsing AGB tracks).
    pub extra_tag: String,
}

impl ExplorerConfig {
    pub fn new(photometry: PhotometricSet) -> Self {
        Self {
            photometry,
            models_dir: None,
            overlay: None,
            discretization: Discretization::reference(),
            age_step: DEFAULT_AGE_STEP,
            default_age: DEFAULT_AGE,
            reference_age: DEFAULT_REFERENCE_AGE,
            age_min: AGE_MIN,
            age_max: AGE_MAX,
            extra_tag: DEFAULT_EXTRA_TAG.to_string(),
        }
    }
}

pub const DEFAULT_AGE_STEP: f64 = 0.5;
pub const DEFAULT_AGE: f64 = 8.5;
pub const DEFAULT_REFERENCE_AGE: f64 = 8.0;
pub const AGE_MIN: f64 = 7.5;
pub const AGE_MAX: f64 = 10.0;
pub const DEFAULT_EXTRA_TAG: &str = "TP";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_key_snaps_slider_drift() {
        let a = GridKey::snap(0.15000000000000002, 0.30000000000000004, 45.0).unwrap();
        let b = GridKey::snap(0.15, 0.3, 45.0).unwrap();
        assert_eq!(a, b);
        assert!((a.metallicity() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn grid_key_rejects_non_finite() {
        assert!(GridKey::snap(f64::NAN, 0.0, 0.0).is_none());
    }

    #[test]
    fn snap_to_step_is_stable() {
        assert_eq!(snap_to_step(8.519999, 0.02), 8.52);
        assert_eq!(snap_to_step(8.52, 0.02), 8.52);
        assert_eq!(snap_to_step(8.6, 0.5), 8.5);
        assert_eq!(snap_to_step(8.8, 0.5), 9.0);
    }

    #[test]
    fn photometric_tags_round_trip() {
        for set in [PhotometricSet::UbvriPlus, PhotometricSet::Tycho, PhotometricSet::Gaia] {
            assert_eq!(PhotometricSet::from_tag(set.tag()), Some(set));
        }
        assert_eq!(PhotometricSet::from_tag("nope"), None);
    }

    #[test]
    fn default_axes_use_set_filters() {
        for set in [PhotometricSet::UbvriPlus, PhotometricSet::Tycho, PhotometricSet::Gaia] {
            let (x, y) = set.default_axes();
            assert!(set.filters().contains(&x.column1.as_str()));
            assert!(set.filters().contains(&y.column1.as_str()));
        }
    }
}
