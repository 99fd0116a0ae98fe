use std::str::FromStr;

use anyhow::{bail, Context, Result};
use bigdecimal::BigDecimal;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::DeploymentSettings;
use crate::utils::{normalize_address, ZERO_ADDRESS};

/// Side of a pair, in on-chain token order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSide {
    Token0,
    Token1,
}

impl PoolSide {
    pub fn opposite(self) -> Self {
        match self {
            PoolSide::Token0 => PoolSide::Token1,
            PoolSide::Token1 => PoolSide::Token0,
        }
    }
}

/// Canonical native/stablecoin pool used as the ground-truth USD source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StablePool {
    pub address: String,
    pub stable_side: PoolSide,
}

/// Ordered whitelist with a set view for membership tests.
///
/// Order matters for anchor search (first qualifying anchor wins),
/// membership is all volume attribution needs.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    ordered: Vec<String>,
    members: FxHashSet<String>,
}

impl Whitelist {
    /// Build from normalized ids. Duplicates keep their first position.
    pub fn new(addresses: impl IntoIterator<Item = String>) -> Self {
        let mut ordered = Vec::new();
        let mut members = FxHashSet::default();

        for address in addresses {
            if members.insert(address.clone()) {
                ordered.push(address);
            }
        }

        Self { ordered, members }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.members.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Per-chain pricing constants, validated and normalized.
///
/// Immutable for the lifetime of the process; one instance per deployment.
#[derive(Debug, Clone)]
pub struct DeploymentProfile {
    pub network: String,
    pub native_wrapped_address: String,
    pub factory_address: Option<String>,
    pub start_block: u64,
    pub canonical_stable_pools: Vec<StablePool>,
    pub whitelist: Whitelist,
    pub min_liquidity_native: BigDecimal,
}

impl DeploymentProfile {
    pub fn from_settings(settings: &DeploymentSettings) -> Result<Self> {
        let native_wrapped_address = normalize_address(&settings.native_wrapped_address)
            .context("native_wrapped_address")?;

        let factory_address = settings
            .factory_address
            .as_deref()
            .map(normalize_address)
            .transpose()
            .context("factory_address")?;

        let mut canonical_stable_pools = Vec::with_capacity(settings.stable_pools.len());
        for pool in &settings.stable_pools {
            let address = normalize_address(&pool.address).context("stable_pools")?;
            // Zero address marks an unused slot
            if address == ZERO_ADDRESS {
                continue;
            }
            canonical_stable_pools.push(StablePool {
                address,
                stable_side: pool.stable_side,
            });
        }

        if canonical_stable_pools.is_empty() {
            bail!(
                "Deployment {} needs at least one canonical stable pool",
                settings.network
            );
        }

        let whitelist = settings
            .whitelist
            .iter()
            .map(|address| normalize_address(address))
            .collect::<Result<Vec<_>>>()
            .context("whitelist")?;

        let min_liquidity_native = BigDecimal::from_str(settings.min_liquidity_native.trim())
            .with_context(|| {
                format!(
                    "Invalid min_liquidity_native: {}",
                    settings.min_liquidity_native
                )
            })?;

        Ok(Self {
            network: settings.network.clone(),
            native_wrapped_address,
            factory_address,
            start_block: settings.start_block,
            canonical_stable_pools,
            whitelist: Whitelist::new(whitelist),
            min_liquidity_native,
        })
    }

    pub fn is_native(&self, token: &str) -> bool {
        self.native_wrapped_address == token
    }

    pub fn is_whitelisted(&self, token: &str) -> bool {
        self.whitelist.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StablePoolSettings;

    fn settings() -> DeploymentSettings {
        DeploymentSettings {
            network: "test".to_string(),
            native_wrapped_address: "0x000000000000000000000000000000000000000A".to_string(),
            factory_address: None,
            start_block: 0,
            stable_pools: vec![StablePoolSettings {
                address: "0x0000000000000000000000000000000000000C01".to_string(),
                stable_side: PoolSide::Token1,
            }],
            whitelist: vec![
                "0x000000000000000000000000000000000000000A".to_string(),
                "0x000000000000000000000000000000000000000B".to_string(),
                "0x000000000000000000000000000000000000000a".to_string(),
            ],
            min_liquidity_native: "10".to_string(),
        }
    }

    #[test]
    fn test_whitelist_keeps_first_position_of_duplicates() {
        let profile = DeploymentProfile::from_settings(&settings()).unwrap();
        let order: Vec<&str> = profile.whitelist.iter().collect();
        assert_eq!(
            order,
            vec![
                "0x000000000000000000000000000000000000000a",
                "0x000000000000000000000000000000000000000b",
            ]
        );
        assert_eq!(profile.whitelist.len(), 2);
    }

    #[test]
    fn test_profile_normalizes_addresses() {
        let profile = DeploymentProfile::from_settings(&settings()).unwrap();
        assert!(profile.is_native("0x000000000000000000000000000000000000000a"));
        assert_eq!(
            profile.canonical_stable_pools[0].address,
            "0x0000000000000000000000000000000000000c01"
        );
        assert_eq!(profile.min_liquidity_native, BigDecimal::from(10));
    }

    #[test]
    fn test_profile_requires_a_stable_pool() {
        let mut s = settings();
        s.stable_pools[0].address = ZERO_ADDRESS.to_string();
        assert!(DeploymentProfile::from_settings(&s).is_err());
    }

    #[test]
    fn test_profile_rejects_bad_threshold() {
        let mut s = settings();
        s.min_liquidity_native = "ten".to_string();
        assert!(DeploymentProfile::from_settings(&s).is_err());
    }

    #[test]
    fn test_profile_rejects_bad_whitelist_entry() {
        let mut s = settings();
        s.whitelist.push("0xnope".to_string());
        assert!(DeploymentProfile::from_settings(&s).is_err());
    }
}
