//! Shared grid/curve pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! config -> table reader -> parallel grid load -> curve request -> curve result
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use tracing::info;

use crate::data::{SyntheticReader, TableReader};
use crate::domain::{CurveRequest, CurveResult, ExplorerConfig, GridKey, MassRange};
use crate::error::{AppError, GridError};
use crate::expr::{distance_shift, AxisExpr};
use crate::grid::{LoadOptions, ModelGrid};
use crate::io::{read_overlay, CsvTableReader, Overlay};

/// Grid load options derived from the startup configuration.
pub fn load_options(config: &ExplorerConfig) -> LoadOptions {
    LoadOptions {
        extra_tag: config.extra_tag.clone(),
        age_step: config.age_step,
        default_age: config.default_age,
        ..LoadOptions::new(config.photometry)
    }
}

/// Pick the table reader for a configuration: the CSV directory when one is
/// configured, synthetic tables otherwise.
pub fn table_reader(config: &ExplorerConfig) -> Result<Box<dyn TableReader>, AppError> {
    match &config.models_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "reading model tables from disk");
            Ok(Box::new(CsvTableReader::new(dir)?))
        }
        None => {
            info!("no model directory configured; using synthetic tables");
            Ok(Box::new(SyntheticReader::new(
                config.age_min,
                config.age_max,
                config.age_step,
            )?))
        }
    }
}

/// Load every table of the configured discretization.
pub fn build_grid(config: &ExplorerConfig) -> Result<ModelGrid, AppError> {
    let reader = table_reader(config)?;
    let grid = ModelGrid::load_all(
        reader.as_ref(),
        config.discretization.clone(),
        load_options(config),
    )?;
    Ok(grid)
}

pub fn load_overlay(config: &ExplorerConfig) -> Result<Option<Overlay>, AppError> {
    config.overlay.as_deref().map(read_overlay).transpose()
}

/// Parameters of a one-shot curve query, before validation.
#[derive(Debug, Clone)]
pub struct CurveQuery {
    pub age: f64,
    pub metallicity: f64,
    pub rotation: f64,
    pub inclination: f64,
    pub dmod: f64,
    pub x: Option<AxisExpr>,
    pub y: Option<AxisExpr>,
    pub mass_range: Option<MassRange>,
}

/// Build a request from a query, filling unset axes from the grid defaults.
///
/// The distance modulus is kept only when the y axis is a single magnitude.
pub fn build_request(grid: &ModelGrid, query: &CurveQuery) -> Result<CurveRequest, AppError> {
    let key = GridKey::snap(query.metallicity, query.rotation, query.inclination).ok_or_else(|| {
        GridError::InvalidParameter(format!(
            "cannot snap ([Fe/H]={}, v/vc={}, i={})",
            query.metallicity, query.rotation, query.inclination
        ))
    })?;
    let options = grid.options();
    let y = query.y.clone().unwrap_or_else(|| options.default_y.clone());
    Ok(CurveRequest {
        key,
        age: query.age,
        x: query.x.clone().unwrap_or_else(|| options.default_x.clone()),
        dmod: distance_shift(&y, grid.catalog(), query.dmod),
        y,
        mass_range: query.mass_range,
    })
}

pub fn run_curve(grid: &ModelGrid, request: &CurveRequest) -> Result<CurveResult, AppError> {
    let result = grid.curve(request)?;
    info!(
        key = %request.key,
        age = request.age,
        points = result.len(),
        "curve computed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PhotometricSet;
    use crate::expr::AxisOp;
    use crate::grid::Discretization;

    fn small_config() -> ExplorerConfig {
        let mut config = ExplorerConfig::new(PhotometricSet::Tycho);
        config.discretization = Discretization {
            metallicity: vec![0.0, 0.15],
            rotation: vec![0.0],
            inclination: vec![0.0],
        };
        config
    }

    fn query() -> CurveQuery {
        CurveQuery {
            age: 9.0,
            metallicity: 0.15,
            rotation: 0.0,
            inclination: 0.0,
            dmod: 0.0,
            x: None,
            y: None,
            mass_range: None,
        }
    }

    #[test]
    fn synthetic_grid_covers_discretization() {
        let grid = build_grid(&small_config()).unwrap();
        assert_eq!(grid.len(), 2);
        assert!(grid.catalog().has_hrd_axes());
    }

    #[test]
    fn missing_models_dir_is_usage_error() {
        let mut config = small_config();
        config.models_dir = Some("/definitely/not/here".into());
        let err = build_grid(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn request_defaults_to_grid_axes() {
        let grid = build_grid(&small_config()).unwrap();
        let request = build_request(&grid, &query()).unwrap();
        assert_eq!(request.x.label(), "Tycho_B-Tycho_V");
        assert_eq!(request.y.label(), "Tycho_V");
        let curve = run_curve(&grid, &request).unwrap();
        assert!(!curve.is_empty());
    }

    #[test]
    fn unloaded_key_maps_to_not_found_exit_code() {
        let grid = build_grid(&small_config()).unwrap();
        let mut q = query();
        q.metallicity = -0.3;
        let request = build_request(&grid, &q).unwrap();
        let err = run_curve(&grid, &request).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn distance_modulus_shifts_magnitudes_only() {
        let grid = build_grid(&small_config()).unwrap();

        // Default y is the single magnitude Tycho_V.
        let base = run_curve(&grid, &build_request(&grid, &query()).unwrap()).unwrap();
        let far = build_request(&grid, &CurveQuery { dmod: 5.0, ..query() }).unwrap();
        assert_eq!(far.dmod, 5.0);
        let shifted = run_curve(&grid, &far).unwrap();
        for (s, b) in shifted.y.iter().zip(base.y.iter()) {
            assert!((s - b - 5.0).abs() < 1e-12);
        }

        // Physical and color y axes are distance independent.
        for y in [
            AxisExpr::column("log_L"),
            AxisExpr::column("log_Teff"),
            AxisExpr::combined("Tycho_B", AxisOp::Subtract, "Tycho_V"),
        ] {
            let near = CurveQuery {
                x: Some(AxisExpr::column("log_Teff")),
                y: Some(y.clone()),
                ..query()
            };
            let far = CurveQuery { dmod: 10.0, ..near.clone() };
            let request = build_request(&grid, &far).unwrap();
            assert_eq!(request.dmod, 0.0, "{}", y.label());
            let base = run_curve(&grid, &build_request(&grid, &near).unwrap()).unwrap();
            let shifted = run_curve(&grid, &request).unwrap();
            assert_eq!(base.y, shifted.y, "{}", y.label());
        }
    }
}
