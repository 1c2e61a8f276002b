//! Input/output helpers.
//!
//! - CSV model-table directories (`table_csv`)
//! - observational overlay files (`overlay`)
//! - curve exports: CSV (`export`) and JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod overlay;
pub mod table_csv;

pub use curve::*;
pub use export::*;
pub use overlay::*;
pub use table_csv::*;
