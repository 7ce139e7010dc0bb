//! Math Font - metric tables for math typesetting
//!
//! This crate is the read-only font boundary of the math layout system. It
//! does not parse font files; it holds the metrics a math typesetter needs
//! and answers queries about them in points.
//!
//! # Modules
//!
//! - `constants`: typed names for the OpenType MATH constants
//! - `table`: the immutable metric table and the built-in Latin-Modern-like table
//! - `metrics`: point-size queries, variants, and glyph assembly
//! - `cache`: lazily-populated shared table cache

mod cache;
mod constants;
mod error;
mod metrics;
mod table;

pub use cache::*;
pub use constants::*;
pub use error::*;
pub use metrics::*;
pub use table::*;
