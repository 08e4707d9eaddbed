mod error;
mod memory;
mod price_source;
mod yahoo;

pub use error::SourceError;
pub use memory::{InMemorySource, synthetic_closes};
pub use price_source::{PricePoint, PriceSource};
pub use yahoo::YahooSource;
