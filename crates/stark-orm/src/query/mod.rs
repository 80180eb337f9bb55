//! Query building types.
//!
//! This module provides Q objects for filtering plus the loose value
//! comparisons storage backends use when evaluating them.

mod filter;

pub use filter::{CompareOp, FilterExpr, Q, TextOp, loose_cmp, loose_eq, split_lookup};
