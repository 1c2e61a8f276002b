//! Axis expressions: structure (`axis`) and evaluation (`eval`).

pub mod axis;
pub mod eval;

pub use axis::*;
pub use eval::*;
