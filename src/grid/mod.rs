//! Model grid: discretization, per-key tables, and the keyed collection.
//!
//! Responsibilities:
//!
//! - declare and validate the allowed (metallicity, rotation, inclination) sets
//! - slice curves out of a table by age bucket and mass window
//! - bulk-load and look up tables by exact key

pub mod discretize;
pub mod model_grid;
pub mod table;

pub use discretize::*;
pub use model_grid::*;
pub use table::*;
