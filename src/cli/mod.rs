//! Command-line parsing for the isochrone explorer.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! grid, controller, and rendering code. `app` turns these into an
//! [`ExplorerConfig`](crate::domain::ExplorerConfig).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{PhotometricSet, DEFAULT_AGE, DEFAULT_AGE_STEP, DEFAULT_EXTRA_TAG};
use crate::expr::AxisOp;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "isox", version, about = "Interactive MIST isochrone explorer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive TUI (default).
    Tui(TuiArgs),
    /// Compute one curve, print it (table or ASCII plot), and optionally export it.
    Curve(CurveArgs),
    /// Plot a previously exported curve JSON.
    Plot(PlotArgs),
    /// List the column catalog (filters and physical columns).
    Columns(GridArgs),
    /// List the loaded grid keys.
    Keys(GridArgs),
}

/// Options shared by every command that loads a grid.
#[derive(Debug, Args, Clone)]
pub struct GridArgs {
    /// Photometric system of the tables (UBVRIplus, Tycho, Gaia).
    #[arg(short = 'p', long, value_enum, env = "ISOX_PHOTOMETRY", default_value_t = PhotometricSet::UbvriPlus)]
    pub photometry: PhotometricSet,

    /// Directory of CSV model tables. Synthetic tables are used when absent.
    #[arg(short = 'm', long, env = "ISOX_MODELS", value_name = "DIR")]
    pub models: Option<PathBuf>,

    /// Two-column observational overlay CSV (band1, band2).
    #[arg(long, env = "ISOX_OVERLAY", value_name = "CSV")]
    pub overlay: Option<PathBuf>,

    /// Declared log-age precision of the tables.
    ///
    /// The age control moves one step at a time, so the default of 0.5 gives
    /// only a handful of ages. Full MIST grids are sampled every 0.05 (or 0.02)
    /// in log age; pass that value to reach every bucket.
    #[arg(long, default_value_t = DEFAULT_AGE_STEP)]
    pub age_step: f64,

    /// Age used for each table's default view.
    #[arg(long, default_value_t = DEFAULT_AGE)]
    pub default_age: f64,

    /// Table variant tag in file names.
    #[arg(long, default_value = DEFAULT_EXTRA_TAG)]
    pub extra_tag: String,

    /// Write logs to this file (the TUI never logs to the terminal).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub grid: GridArgs,

    /// Directory for snapshot bundles and exports written from the TUI.
    #[arg(long, default_value = "snapshots", value_name = "DIR")]
    pub out_dir: PathBuf,
}

/// One axis given as `column1 [op column2]`.
#[derive(Debug, Args, Clone, Default)]
pub struct AxisArgs {
    /// First x column (defaults to the photometric set's color index).
    #[arg(long = "x1", value_name = "COLUMN")]
    pub x1: Option<String>,

    /// x operator.
    #[arg(long = "x-op", value_parser = parse_op, value_name = "OP")]
    pub x_op: Option<AxisOp>,

    /// Second x column, or `None`.
    #[arg(long = "x2", value_name = "COLUMN")]
    pub x2: Option<String>,

    /// First y column (defaults to the photometric set's magnitude).
    #[arg(long = "y1", value_name = "COLUMN")]
    pub y1: Option<String>,

    /// y operator.
    #[arg(long = "y-op", value_parser = parse_op, value_name = "OP")]
    pub y_op: Option<AxisOp>,

    /// Second y column, or `None`.
    #[arg(long = "y2", value_name = "COLUMN")]
    pub y2: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct CurveArgs {
    #[command(flatten)]
    pub grid: GridArgs,

    #[command(flatten)]
    pub axes: AxisArgs,

    /// log10(age / yr).
    #[arg(short = 'a', long, default_value_t = DEFAULT_AGE)]
    pub age: f64,

    /// [Fe/H].
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub feh: f64,

    /// Rotation rate v/vcrit.
    #[arg(long, default_value_t = 0.0)]
    pub vvc: f64,

    /// Inclination (degrees).
    #[arg(long, default_value_t = 0.0)]
    pub incl: f64,

    /// Distance modulus added to a single-magnitude y axis.
    #[arg(long, default_value_t = 0.0)]
    pub dmod: f64,

    /// Lower initial-mass bound (solar masses).
    #[arg(long, requires = "mass_max")]
    pub mass_min: Option<f64>,

    /// Upper initial-mass bound (solar masses).
    #[arg(long, requires = "mass_min")]
    pub mass_max: Option<f64>,

    /// Render an ASCII plot instead of a value table.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 30)]
    pub height: usize,

    /// Export the curve to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the curve and its request to JSON.
    #[arg(long = "export-curve")]
    pub export_curve: Option<PathBuf>,
}

/// Options for plotting a saved curve.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Curve JSON file produced by `isox curve --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 30)]
    pub height: usize,
}

/// Accepts widget symbols (`-`, `+`, `*`, `/`, `None`) or names
/// (`sub`, `add`, `mul`, `div`, `none`).
fn parse_op(raw: &str) -> Result<AxisOp, String> {
    let op = match raw.trim().to_ascii_lowercase().as_str() {
        "none" => AxisOp::None,
        "-" | "sub" | "subtract" => AxisOp::Subtract,
        "+" | "add" => AxisOp::Add,
        "*" | "mul" | "multiply" => AxisOp::Multiply,
        "/" | "div" | "divide" => AxisOp::Divide,
        other => return Err(format!("unknown operator '{other}' (expected None, -, +, *, /)")),
    };
    Ok(op)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn age_step_help_names_full_grid_steps() {
        let cmd = Cli::command();
        let keys = cmd.find_subcommand("keys").unwrap();
        let arg = keys.get_arguments().find(|a| a.get_id() == "age_step").unwrap();
        let help = arg.get_long_help().or_else(|| arg.get_help()).unwrap().to_string();
        assert!(help.contains("0.05"));
    }

    #[test]
    fn operator_parsing_accepts_symbols_and_names() {
        assert_eq!(parse_op("-").unwrap(), AxisOp::Subtract);
        assert_eq!(parse_op("None").unwrap(), AxisOp::None);
        assert_eq!(parse_op("div").unwrap(), AxisOp::Divide);
        assert!(parse_op("%").is_err());
    }

    #[test]
    fn curve_command_parses_axes_and_key() {
        let cli = Cli::parse_from([
            "isox", "curve", "--feh", "-0.15", "--vvc", "0.4", "--x1", "Tycho_B", "--x-op", "sub", "--x2",
            "Tycho_V", "--plot",
        ]);
        let Command::Curve(args) = cli.command else {
            panic!("expected curve command");
        };
        assert_eq!(args.feh, -0.15);
        assert_eq!(args.vvc, 0.4);
        assert_eq!(args.axes.x_op, Some(AxisOp::Subtract));
        assert!(args.plot);
        assert_eq!(args.grid.extra_tag, "TP");
    }

    #[test]
    fn photometry_accepts_lowercase_alias() {
        let cli = Cli::parse_from(["isox", "columns", "--photometry", "gaia"]);
        let Command::Columns(args) = cli.command else {
            panic!("expected columns command");
        };
        assert_eq!(args.photometry, PhotometricSet::Gaia);
    }
}
