//! Terminal plotting for the non-interactive commands.

pub mod ascii;

pub use ascii::*;
