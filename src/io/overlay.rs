//! Observational overlay reader.
//!
//! An overlay file is a CSV with a header row and two magnitude columns
//! (`band1`, `band2`). It becomes the point set `(band1 - band2, band2)`,
//! which lands on the same axes as the default color-magnitude view.
//! Lines starting with `#` are ignored.

use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::error::AppError;

/// Parsed overlay points, ready for an overlay sink.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    /// Header names of the two source bands.
    pub bands: (String, String),
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Overlay {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

pub fn read_overlay(path: &Path) -> Result<Overlay, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open overlay '{}': {e}", path.display())))?;
    let overlay = parse_overlay(file).map_err(|msg| AppError::new(2, format!("{}: {msg}", path.display())))?;
    info!(path = %path.display(), points = overlay.len(), "overlay loaded");
    Ok(overlay)
}

fn parse_overlay<R: std::io::Read>(input: R) -> Result<Overlay, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers().map_err(|e| format!("failed to read header: {e}"))?;
    if headers.len() < 2 {
        return Err("expected two band columns".to_string());
    }
    let bands = (headers[0].to_string(), headers[1].to_string());

    let mut overlay = Overlay {
        bands,
        ..Overlay::default()
    };
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        let record = record.map_err(|e| format!("line {line}: {e}"))?;
        let band = |i: usize| -> Result<f64, String> {
            let raw = record.get(i).ok_or_else(|| format!("line {line}: missing column {}", i + 1))?;
            raw.parse::<f64>()
                .map_err(|_| format!("line {line}: invalid number '{raw}'"))
        };
        let b1 = band(0)?;
        let b2 = band(1)?;
        overlay.x.push(b1 - b2);
        overlay.y.push(b2);
    }

    Ok(overlay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_become_color_and_magnitude() {
        let input = "Tycho_B,Tycho_V\n# cluster members\n10.5,10.0\n12.0,11.25\n";
        let overlay = parse_overlay(input.as_bytes()).unwrap();
        assert_eq!(overlay.bands, ("Tycho_B".to_string(), "Tycho_V".to_string()));
        assert_eq!(overlay.x, vec![0.5, 0.75]);
        assert_eq!(overlay.y, vec![10.0, 11.25]);
    }

    #[test]
    fn bad_number_reports_line() {
        let input = "B,V\n1.0,2.0\n1.0,abc\n";
        let err = parse_overlay(input.as_bytes()).unwrap_err();
        assert!(err.contains("line 3"), "{err}");
    }

    #[test]
    fn single_column_is_rejected() {
        let err = parse_overlay("V\n1.0\n".as_bytes()).unwrap_err();
        assert!(err.contains("two band columns"));
    }
}
