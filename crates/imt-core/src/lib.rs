//! Interactive machine translation core.
//!
//! Prefix-driven constrained beam search over a pluggable scoring model,
//! the reconciliation logic that turns a user's correction into search
//! constraints, and the active-learning ranking family that decides which
//! sentences are worth a human's attention.

pub mod assemble;
pub mod constraints;
pub mod model;
pub mod prefix;
pub mod sampling;
pub mod search;
pub mod settings;
pub mod text;
pub mod vocab;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use vocab::{TokenId, Vocabulary};
