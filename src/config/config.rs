use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

use super::{preset, DeploymentProfile, PoolSide};

/// Log replay and runtime configuration.
///
/// `rpc_url` is optional: without it the binary only re-prices the
/// snapshot found at `snapshot_path` and exits.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexerSettings {
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Name of a built-in deployment preset (core, xdc, bitgert, lightlink).
    /// Ignored when a `deployment` block is present.
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Number of blocks fetched per `eth_getLogs` request
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_tip_poll_interval")]
    pub tip_poll_interval_milliseconds: u64,
    /// Resolve whitelist pairs through `factory.getPair` (Multicall3) instead of
    /// the pairs observed during replay.
    #[serde(default)]
    pub resolve_pairs_onchain: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_snapshot_path() -> String {
    "pricebook-snapshot.json".to_string()
}

fn default_batch_size() -> u64 {
    2_000
}

fn default_tip_poll_interval() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One canonical native/stablecoin pool.
///
/// `stable_side` names the side of the pair holding the stablecoin; pair
/// token ordering is by address on-chain, so it has to be configured.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StablePoolSettings {
    pub address: String,
    pub stable_side: PoolSide,
}

/// Per-chain constants, as written in configuration.
///
/// Addresses may use any casing; they are validated and lowercased when
/// turned into a [`DeploymentProfile`].
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DeploymentSettings {
    pub network: String,
    pub native_wrapped_address: String,
    #[serde(default)]
    pub factory_address: Option<String>,
    #[serde(default)]
    pub start_block: u64,
    pub stable_pools: Vec<StablePoolSettings>,
    pub whitelist: Vec<String>,
    /// Decimal string, in native-asset units
    pub min_liquidity_native: String,
}

/// Root application configuration.
///
/// Loaded from `config.yaml` (or `.toml` / `.json`) at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub indexer: IndexerSettings,
    #[serde(default)]
    pub deployment: Option<DeploymentSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        s.try_deserialize()
    }

    /// Parse settings from an in-memory document.
    pub fn from_document(content: &str, format: FileFormat) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(content, format))
            .build()?;

        s.try_deserialize()
    }

    /// Resolve the deployment profile: an explicit `deployment` block wins,
    /// otherwise the preset named by `indexer.network`.
    pub fn deployment_profile(&self) -> anyhow::Result<DeploymentProfile> {
        if let Some(deployment) = &self.deployment {
            return DeploymentProfile::from_settings(deployment);
        }

        let network = self
            .indexer
            .network
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Either indexer.network or a deployment block is required"))?;

        let settings = preset(network)
            .ok_or_else(|| anyhow::anyhow!("Unknown network preset: {network}"))?;

        DeploymentProfile::from_settings(&settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_yaml_with_preset() {
        let yaml = r#"
indexer:
  network: bitgert
  rpc_url: "http://localhost:8545"
"#;
        let settings = Settings::from_document(yaml, FileFormat::Yaml).unwrap();
        assert_eq!(settings.indexer.batch_size, 2_000);
        assert_eq!(settings.indexer.snapshot_path, "pricebook-snapshot.json");
        assert!(!settings.indexer.resolve_pairs_onchain);

        let profile = settings.deployment_profile().unwrap();
        assert_eq!(profile.network, "bitgert");
        assert_eq!(profile.canonical_stable_pools.len(), 4);
    }

    #[test]
    fn test_settings_deployment_block_overrides_preset() {
        let yaml = r#"
indexer:
  network: core
deployment:
  network: devnet
  native_wrapped_address: "0x00000000000000000000000000000000000000AA"
  factory_address: "0x00000000000000000000000000000000000000FF"
  start_block: 12
  stable_pools:
    - address: "0x0000000000000000000000000000000000000001"
      stable_side: token1
    - address: "0x0000000000000000000000000000000000000000"
      stable_side: token0
  whitelist:
    - "0x00000000000000000000000000000000000000AA"
    - "0x00000000000000000000000000000000000000BB"
  min_liquidity_native: "2.5"
"#;
        let settings = Settings::from_document(yaml, FileFormat::Yaml).unwrap();
        let profile = settings.deployment_profile().unwrap();

        assert_eq!(profile.network, "devnet");
        assert_eq!(profile.start_block, 12);
        assert_eq!(
            profile.native_wrapped_address,
            "0x00000000000000000000000000000000000000aa"
        );
        // Null address slot is dropped
        assert_eq!(profile.canonical_stable_pools.len(), 1);
        assert_eq!(profile.canonical_stable_pools[0].stable_side, PoolSide::Token1);
        assert!(profile.is_whitelisted("0x00000000000000000000000000000000000000bb"));
    }

    #[test]
    fn test_settings_without_network_or_deployment_fails() {
        let yaml = "indexer:\n  log_level: debug\n";
        let settings = Settings::from_document(yaml, FileFormat::Yaml).unwrap();
        assert!(settings.deployment_profile().is_err());
    }

    #[test]
    fn test_settings_unknown_preset_fails() {
        let yaml = "indexer:\n  network: nowhere\n";
        let settings = Settings::from_document(yaml, FileFormat::Yaml).unwrap();
        assert!(settings.deployment_profile().is_err());
    }
}
