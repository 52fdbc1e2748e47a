//! Command implementations

pub mod cache;
pub mod geocode;
pub mod matching;
pub mod run;
