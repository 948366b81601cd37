//! Yahoo Finance data source.

pub mod history;
pub mod snapshot;

pub use history::YahooQuoteProvider;
pub use snapshot::{KeyRatios, Quote};
