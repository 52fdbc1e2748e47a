pub mod query;
pub mod result;

pub use query::QueryItem;
pub use result::{FailureKind, GeocodeResult, Location, MatchQuality};
