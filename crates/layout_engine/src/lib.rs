//! Layout Engine - Line breaking for typeset math
//!
//! This crate breaks a finalized math list into lines that fit a width,
//! typesets each line and stacks the lines without overlap.

mod error;
mod line_breaker;
mod segment;

pub use error::*;
pub use line_breaker::*;
pub use segment::*;
