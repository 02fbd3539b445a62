//! Placement entry model: typestate lifecycle, intake validation, windows.

mod transitions;
mod types;

pub use types::*;
