//! Capture acquisition: owned stream handles and source selection.

pub mod acquisition;
pub mod handle;
