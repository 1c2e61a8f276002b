//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (after loading `.env`)
//! - resolves an immutable `ExplorerConfig`
//! - initialises logging
//! - loads the model grid
//! - dispatches to the TUI or a one-shot command

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::catalog::ColumnCatalog;
use crate::cli::{AxisArgs, Command, CurveArgs, GridArgs, PlotArgs, TuiArgs};
use crate::domain::{CurveResult, ExplorerConfig, MassRange};
use crate::error::{AppError, GridError};
use crate::expr::{is_magnitude, AxisExpr, AxisOp};
use crate::plot::{render_ascii_plot, PlotLayer, PlotOptions};

pub mod pipeline;

/// Entry point for the `isox` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` feeds the ISOX_* fallbacks clap reads below.
    dotenvy::dotenv().ok();

    // We want `isox` and `isox -p Gaia` to behave like `isox tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Tui(args) => handle_tui(args),
        Command::Curve(args) => handle_curve(args),
        Command::Plot(args) => handle_plot(args),
        Command::Columns(args) => handle_columns(args),
        Command::Keys(args) => handle_keys(args),
    }
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    init_logging(args.grid.log_file.as_deref(), LogTarget::FileOnly)?;
    let config = config_from_args(&args.grid)?;
    crate::tui::run(config, args.out_dir)
}

fn handle_curve(args: CurveArgs) -> Result<(), AppError> {
    init_logging(args.grid.log_file.as_deref(), LogTarget::Stderr)?;
    let config = config_from_args(&args.grid)?;
    let grid = pipeline::build_grid(&config)?;

    let (x, y) = axes_from_args(&args.axes);
    let mass_range = match (args.mass_min, args.mass_max) {
        (Some(lo), Some(hi)) => Some(MassRange::new(lo, hi)),
        _ => None,
    };
    let query = pipeline::CurveQuery {
        age: args.age,
        metallicity: args.feh,
        rotation: args.vvc,
        inclination: args.incl,
        dmod: args.dmod,
        x,
        y,
        mass_range,
    };
    let request = pipeline::build_request(&grid, &query)?;
    let curve = pipeline::run_curve(&grid, &request)?;

    if args.plot {
        let overlay = pipeline::load_overlay(&config)?;
        let mut layers = vec![PlotLayer::curve(&curve, '*')];
        if let Some(o) = &overlay {
            layers.push(PlotLayer::points(&o.x, &o.y, 'o'));
        }
        let opts = PlotOptions {
            width: args.width,
            height: args.height,
            invert_y: is_magnitude(&request.y, grid.catalog()),
        };
        println!("{}", render_ascii_plot(&layers, &curve.x_label, &curve.y_label, opts));
    } else {
        println!("{}", format_curve_table(&curve));
    }

    if let Some(path) = &args.export {
        crate::io::write_curve_csv(path, &curve)?;
    }
    if let Some(path) = &args.export_curve {
        crate::io::write_curve_json(path, config.photometry, &request, &curve)?;
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    init_logging(None, LogTarget::Stderr)?;
    let file = crate::io::read_curve_json(&args.curve)?;
    let curve = file.to_curve();
    let catalog = ColumnCatalog::for_photometry(file.photometry);
    let invert_y = is_magnitude(&file.request.y, &catalog);

    let opts = PlotOptions {
        width: args.width,
        height: args.height,
        invert_y,
    };
    println!(
        "{}",
        render_ascii_plot(&[PlotLayer::curve(&curve, '*')], &curve.x_label, &curve.y_label, opts)
    );
    Ok(())
}

fn handle_columns(args: GridArgs) -> Result<(), AppError> {
    init_logging(args.log_file.as_deref(), LogTarget::Stderr)?;
    let config = config_from_args(&args)?;
    let grid = pipeline::build_grid(&config)?;
    let catalog = grid.catalog();

    println!("photometric ({}):", catalog.photometric().len());
    for name in catalog.photometric() {
        println!("  {name}");
    }
    println!("physical ({}):", catalog.physical().len());
    for name in catalog.physical() {
        println!("  {name}");
    }
    Ok(())
}

fn handle_keys(args: GridArgs) -> Result<(), AppError> {
    init_logging(args.log_file.as_deref(), LogTarget::Stderr)?;
    let config = config_from_args(&args)?;
    let grid = pipeline::build_grid(&config)?;

    println!("{:>7} {:>6} {:>6} {:>5}", "[Fe/H]", "v/vc", "i", "ages");
    for key in grid.keys() {
        let ages = grid.lookup(key).map(|t| t.ages().len())?;
        println!(
            "{:>+7.2} {:>6.1} {:>6.1} {:>5}",
            key.metallicity(),
            key.rotation(),
            key.inclination(),
            ages
        );
    }
    Ok(())
}

/// Resolve CLI options into the startup configuration.
pub fn config_from_args(args: &GridArgs) -> Result<ExplorerConfig, AppError> {
    if !(args.age_step.is_finite() && args.age_step > 0.0) {
        return Err(GridError::Configuration(format!("age step must be positive (got {})", args.age_step)).into());
    }
    if !args.default_age.is_finite() {
        return Err(GridError::Configuration("default age must be finite".to_string()).into());
    }

    let mut config = ExplorerConfig::new(args.photometry);
    config.models_dir = args.models.clone();
    config.overlay = args.overlay.clone();
    config.age_step = args.age_step;
    config.default_age = args.default_age;
    config.extra_tag = args.extra_tag.clone();
    Ok(config)
}

/// Axis overrides from the CLI. An axis with no first column keeps the grid
/// default.
fn axes_from_args(args: &AxisArgs) -> (Option<AxisExpr>, Option<AxisExpr>) {
    let build = |c1: &Option<String>, op: Option<AxisOp>, c2: &Option<String>| {
        c1.as_ref().map(|c1| {
            // A second column without an operator means a difference (color index).
            let op = op.unwrap_or(if c2.is_some() { AxisOp::Subtract } else { AxisOp::None });
            AxisExpr::new(c1.as_str(), op, c2.as_deref())
        })
    };
    (
        build(&args.x1, args.x_op, &args.x2),
        build(&args.y1, args.y_op, &args.y2),
    )
}

fn format_curve_table(curve: &CurveResult) -> String {
    let mut out = format!("{:>14} {:>14}\n", curve.x_label, curve.y_label);
    for (x, y) in curve.x.iter().zip(curve.y.iter()) {
        out.push_str(&format!("{x:>14.5} {y:>14.5}\n"));
    }
    out.push_str(&format!("({} rows)", curve.len()));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogTarget {
    Stderr,
    /// Terminal output would corrupt the alternate screen.
    FileOnly,
}

fn init_logging(log_file: Option<&Path>, target: LogTarget) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iso_explorer=info"));

    let result = match (log_file, target) {
        (Some(path), _) => {
            let file = File::create(path)
                .map_err(|e| AppError::new(4, format!("Failed to create log file '{}': {e}", path.display())))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        (None, LogTarget::Stderr) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
        (None, LogTarget::FileOnly) => return Ok(()),
    };

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = result;
    Ok(())
}

/// Rewrite argv so `isox` defaults to `isox tui`.
///
/// Rules:
/// - `isox`                      -> `isox tui`
/// - `isox -p Gaia ...`          -> `isox tui -p Gaia ...`
/// - `isox --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "curve" | "plot" | "columns" | "keys");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}
