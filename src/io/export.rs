//! Export a curve to CSV.
//!
//! Two columns named after the resolved axis labels, one row per table row.
//! Non-finite values are written as `nan`/`inf` so row alignment with the
//! source table survives.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::CurveResult;
use crate::error::AppError;

pub fn write_curve_csv(path: &Path, curve: &CurveResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_curve_rows(file, curve)
}

fn write_curve_rows<W: Write>(out: W, curve: &CurveResult) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record([curve.x_label.as_str(), curve.y_label.as_str()])
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;

    for (x, y) in curve.x.iter().zip(curve.y.iter()) {
        writer
            .write_record([format_value(*x), format_value(*y)])
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{v:.6}")
    }
}
