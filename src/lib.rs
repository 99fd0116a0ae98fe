pub mod abis;
pub mod config;
pub mod db;
pub mod pricing;
pub mod utils;
pub mod worker;

pub use config::{DeploymentProfile, Settings};
pub use db::{MemoryStore, ReferenceStore, Snapshot};
pub use pricing::{PairLookup, PairResolver, PriceEngine, VolumeTracker};
pub use worker::{ChainWorker, ExchangeIndexer};
