//! `iso-explorer` library crate.
//!
//! The binary (`isox`) is a thin wrapper around this library so that:
//!
//! - the grid, evaluator, and controller are testable without a terminal
//! - front-ends (TUI, one-shot CLI commands) share one pipeline
//! - table readers can be swapped (CSV directories, synthetic tables)

pub mod app;
pub mod catalog;
pub mod cli;
pub mod controller;
pub mod data;
pub mod domain;
pub mod error;
pub mod expr;
pub mod grid;
pub mod io;
pub mod plot;
pub mod snapshot;
pub mod tui;
