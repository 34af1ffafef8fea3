//! Analysis modules.
//!
//! The aggregator is a pure function over a table snapshot; reading and
//! writing the workbook happens in the pipeline.

pub mod aggregator;

pub use aggregator::*;
