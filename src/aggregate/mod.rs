//! Merging of per-region extraction results into running totals.

mod results;

pub use results::{merge, AggregateResults, ExtractionResult, ProfileValue, ResultAggregator};
