//! Read/write curve JSON files.
//!
//! Curve JSON is the portable form of one computed isochrone:
//! - the request that produced it (key, age, axes, distance modulus, mass window)
//! - the photometric set and a creation timestamp
//! - the two sequences, with non-finite entries stored as `null`
//!
//! `isox plot --curve <file>` renders a saved file without loading any grid.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CurveRequest, CurveResult, PhotometricSet};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub photometry: PhotometricSet,
    pub request: CurveRequest,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<Option<f64>>,
    pub y: Vec<Option<f64>>,
}

impl CurveFile {
    pub fn new(photometry: PhotometricSet, request: CurveRequest, curve: &CurveResult) -> Self {
        Self {
            tool: "isox".to_string(),
            created_at: Utc::now(),
            photometry,
            request,
            x_label: curve.x_label.clone(),
            y_label: curve.y_label.clone(),
            x: curve.x.iter().map(|&v| v.is_finite().then_some(v)).collect(),
            y: curve.y.iter().map(|&v| v.is_finite().then_some(v)).collect(),
        }
    }

    /// Back to a plottable curve; `null` entries become NaN.
    pub fn to_curve(&self) -> CurveResult {
        CurveResult {
            x: self.x.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
            y: self.y.iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
            x_label: self.x_label.clone(),
            y_label: self.y_label.clone(),
        }
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(
    path: &Path,
    photometry: PhotometricSet,
    request: &CurveRequest,
    curve: &CurveResult,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create curve JSON '{}': {e}", path.display())))?;

    let doc = CurveFile::new(photometry, request.clone(), curve);
    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::new(4, format!("Failed to write curve JSON: {e}")))?;

    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid curve JSON: {e}")))?;
    if curve.x.len() != curve.y.len() {
        return Err(AppError::new(
            2,
            format!("Invalid curve JSON: {} x values but {} y values", curve.x.len(), curve.y.len()),
        ));
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GridKey;
    use crate::expr::{AxisExpr, AxisOp};

    #[test]
    fn non_finite_values_survive_as_null() {
        let (x, y) = PhotometricSet::Tycho.default_axes();
        let request = CurveRequest {
            key: GridKey::snap(0.15, 0.2, 45.0).unwrap(),
            age: 9.0,
            x,
            y: AxisExpr::new("Tycho_V", AxisOp::Divide, Some("Tycho_B")),
            dmod: 1.5,
            mass_range: None,
        };
        let curve = CurveResult {
            x: vec![0.4, 0.6],
            y: vec![f64::INFINITY, 1.1],
            x_label: "Tycho_B-Tycho_V".to_string(),
            y_label: "Tycho_V/Tycho_B".to_string(),
        };

        let path = std::env::temp_dir().join(format!("isox-curve-{}.json", std::process::id()));
        write_curve_json(&path, PhotometricSet::Tycho, &request, &curve).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("null"));

        let back = read_curve_json(&path).unwrap();
        assert_eq!(back.request, request);
        assert_eq!(back.photometry, PhotometricSet::Tycho);
        let restored = back.to_curve();
        assert!(restored.y[0].is_nan());
        assert_eq!(restored.y[1], 1.1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let path = std::env::temp_dir().join(format!("isox-badcurve-{}.json", std::process::id()));
        let (x, y) = PhotometricSet::Gaia.default_axes();
        let mut doc = CurveFile::new(
            PhotometricSet::Gaia,
            CurveRequest {
                key: GridKey::snap(0.0, 0.0, 0.0).unwrap(),
                age: 8.5,
                x,
                y,
                dmod: 0.0,
                mass_range: None,
            },
            &CurveResult::default(),
        );
        doc.x.push(Some(1.0));
        std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
        let err = read_curve_json(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
