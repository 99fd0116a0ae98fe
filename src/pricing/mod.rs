//! Reference pricing and volume attribution.
//!
//! - [`engine`] - native/USD price and one-hop whitelist derivation
//! - [`attribution`] - tracked USD volume and liquidity
//! - [`resolver`] - pair lookup abstraction over the factory's `getPair`

mod attribution;
mod engine;
mod resolver;

#[cfg(test)]
pub(crate) mod fixtures;

pub use attribution::VolumeTracker;
pub use engine::PriceEngine;
pub use resolver::{PairLookup, PairLookupTable, PairRegistry, PairResolver};
