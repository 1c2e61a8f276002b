//! Domain types used throughout the explorer.
//!
//! This module defines:
//!
//! - the discretized table key (`GridKey`)
//! - curve query/result value objects (`CurveRequest`, `CurveResult`)
//! - per-role parameter state and startup configuration

pub mod types;

pub use types::*;
