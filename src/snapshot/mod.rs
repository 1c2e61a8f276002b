//! Snapshot bundle writer: a markdown dump of the explorer state and every
//! sink's current contents.

use std::fmt::Write as _;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::controller::{BufferBoard, ReactiveController, Series};
use crate::domain::{CurveRole, ParameterState};
use crate::error::AppError;

/// Write a snapshot under `dir` and return its path.
pub fn write_snapshot(dir: &Path, controller: &ReactiveController, board: &BufferBoard) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create snapshot dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("isox_snapshot_{ts}.md"));

    let text = render_snapshot(controller, board);
    let mut file =
        File::create(&path).map_err(|e| AppError::new(4, format!("Failed to create snapshot file: {e}")))?;
    file.write_all(text.as_bytes())
        .map_err(|e| AppError::new(4, format!("Failed to write snapshot: {e}")))?;

    Ok(path)
}

pub fn render_snapshot(controller: &ReactiveController, board: &BufferBoard) -> String {
    let state = controller.state();
    let grid = controller.grid();
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "# isox snapshot");
    let _ = writeln!(out, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(out, "- photometry: {}", grid.options().photometry);
    let _ = writeln!(out, "- tables: {}", grid.len());
    let _ = writeln!(out, "- x axis: {}", state.x.label());
    let _ = writeln!(out, "- y axis: {}", state.y.label());
    let _ = writeln!(
        out,
        "- mass range: {:.2}..{:.2} Msun",
        state.mass_range.lo, state.mass_range.hi
    );
    let _ = writeln!(out, "- display mode: {:?}", state.mode);
    let _ = writeln!(out, "- diagnostic: {}", controller.diagnostic().unwrap_or("-"));

    let _ = writeln!(out, "\n## Parameters");
    let _ = writeln!(out, "| role | log(age) | [Fe/H] | v/vc | i | m-M |");
    let _ = writeln!(out, "| - | - | - | - | - | - |");
    param_row(&mut out, "primary", &state.primary);
    param_row(&mut out, "reference", &state.reference);

    let _ = writeln!(out, "\n## Displayed requests");
    let shown = controller.shown_requests();
    if shown.is_empty() {
        let _ = writeln!(out, "(none)");
    }
    for (role, req) in shown {
        let _ = writeln!(
            out,
            "- {}: key {} age {:.2} x `{}` y `{}` dmod {:.2}{}",
            role.display_name(),
            req.key,
            req.age,
            req.x,
            req.y,
            req.dmod,
            req.mass_range
                .map(|r| format!(" mass {:.2}..{:.2}", r.lo, r.hi))
                .unwrap_or_default()
        );
    }

    for role in CurveRole::ALL {
        series_table(&mut out, role.display_name(), &board.curve(role).snapshot());
    }
    series_table(&mut out, "overlay", &board.overlay.snapshot());

    out
}

fn param_row(out: &mut String, name: &str, p: &ParameterState) {
    let _ = writeln!(
        out,
        "| {name} | {:.2} | {:+.2} | {:.1} | {:.1} | {:.2} |",
        p.age, p.metallicity, p.rotation, p.inclination, p.dmod
    );
}

fn series_table(out: &mut String, name: &str, series: &Series) {
    let _ = writeln!(out, "\n## Sink: {name} ({} points, {} writes)", series.len(), series.writes);
    if series.is_empty() {
        return;
    }
    let _ = writeln!(out, "| x | y |");
    let _ = writeln!(out, "| - | - |");
    for (x, y) in series.x.iter().zip(series.y.iter()) {
        let _ = writeln!(out, "| {} | {} |", fmt_value(*x), fmt_value(*y));
    }
}

fn fmt_value(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.4}")
    } else {
        "-".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::controller::ExplorerState;
    use crate::data::SyntheticReader;
    use crate::domain::{ExplorerConfig, PhotometricSet};
    use crate::grid::{Discretization, LoadOptions, ModelGrid};

    fn controller() -> (ReactiveController, BufferBoard) {
        let config = ExplorerConfig::new(PhotometricSet::Tycho);
        let reader = SyntheticReader::new(config.age_min, config.age_max, config.age_step).unwrap();
        let disc = Discretization {
            metallicity: vec![0.0],
            rotation: vec![0.0],
            inclination: vec![0.0],
        };
        let grid = Arc::new(ModelGrid::load_all(&reader, disc, LoadOptions::new(PhotometricSet::Tycho)).unwrap());
        let board = BufferBoard::new();
        let state = ExplorerState::initial(&config, &grid);
        let mut ctrl = ReactiveController::new(grid, state, board.sinks());
        ctrl.refresh();
        (ctrl, board)
    }

    #[test]
    fn snapshot_lists_parameters_and_sinks() {
        let (ctrl, board) = controller();
        let text = render_snapshot(&ctrl, &board);
        assert!(text.starts_with("# isox snapshot"));
        assert!(text.contains("| primary | 8.50 | +0.00 | 0.0 | 0.0 | 0.00 |"));
        assert!(text.contains("| reference | 8.00 |"));
        assert!(text.contains("- x axis: Tycho_B-Tycho_V"));
        assert!(text.contains("## Sink: primary (120 points, 1 writes)"));
        assert!(text.contains("## Sink: overlay (0 points, 0 writes)"));
    }

    #[test]
    fn snapshot_file_is_written() {
        let (ctrl, board) = controller();
        let dir = std::env::temp_dir().join(format!("isox-snap-{}", std::process::id()));
        let path = write_snapshot(&dir, &ctrl, &board).unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
