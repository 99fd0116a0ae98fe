mod config;
mod presets;
mod profile;

pub use self::config::{DeploymentSettings, IndexerSettings, Settings, StablePoolSettings};
pub use self::presets::{preset, NETWORKS};
pub use self::profile::{DeploymentProfile, PoolSide, StablePool, Whitelist};
