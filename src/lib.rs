//! Self-play parameter optimisation for craft documents.
//!
//! Each generation perturbs the current seed document into a batch of
//! opposed-pair variants, runs them against the unmodified reference in an
//! external trial, and moves the seed toward the score-weighted centroid of
//! the variants that beat the reference.

pub mod config;
pub mod document;
pub mod engines;
pub mod error;
pub mod services;
pub mod types;

pub use error::{EvolutionError, Result};
