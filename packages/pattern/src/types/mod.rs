//! Data types shared across the matching pipeline.

pub mod config;
pub mod matching;
