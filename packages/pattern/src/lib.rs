//! # Pattern
//!
//! Learn a structural rule from a few example elements of a web page and find
//! every other element that looks like them.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use pattern::{HtmlPage, MatchPipeline, MatchConfig};
//!
//! let page = HtmlPage::parse(&html);
//! let snapshot = page.snapshot();
//! let samples = snapshot.find(".listing")?;
//!
//! let result = MatchPipeline::new(MatchConfig::default()).run(&snapshot, &samples[..2])?;
//! println!("{:?} matched {} elements", result.selector, result.matches.len());
//! ```
//!
//! ## Modules
//!
//! - [`page`]: the [`Page`] capability and an HTML implementation
//! - [`fingerprint`]: structural fingerprints and similarity
//! - [`synth`]: selector synthesis from samples
//! - [`pipeline`]: the ordered match strategies
//! - [`selection`]: samples, matches, exclusions and refinement
//! - [`text`]: location strings and textual similarity

pub mod error;
pub mod fingerprint;
pub mod page;
pub mod pipeline;
pub mod selection;
pub mod synth;
pub mod text;
pub mod types;

pub use error::{PatternError, Result};
pub use fingerprint::{similarity, ElementFingerprint, FingerprintArena};
pub use page::{ElementKey, ElementPath, HtmlPage, HtmlSnapshot, Page, PathSegment};
pub use pipeline::MatchPipeline;
pub use selection::{refine, Mark, Selection};
pub use synth::{synthesize, Synthesis};
pub use text::{location_strings, text_similarity};
pub use types::config::{AutoExcludeConfig, MatchConfig, DEFAULT_RESERVED_PREFIX};
pub use types::matching::{CandidateSelector, Confidence, MatchResult, Strategy};
