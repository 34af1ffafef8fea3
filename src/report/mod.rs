//! Console rendering of pipeline runs.

pub mod generator;

pub use generator::*;
