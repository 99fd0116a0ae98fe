//! Shared test fixtures: a small deployment with two canonical pools and a
//! three-token whitelist.

use std::str::FromStr;

use bigdecimal::BigDecimal;

use crate::{
    config::{DeploymentProfile, DeploymentSettings, PoolSide, StablePoolSettings},
    db::{
        models::{Pair, Token},
        MemoryStore, ReferenceStore,
    },
};

pub const WNATIVE: &str = "0x00000000000000000000000000000000000000a1";
pub const USDC: &str = "0x00000000000000000000000000000000000000b2";
pub const ICE: &str = "0x00000000000000000000000000000000000000c3";
pub const MEME: &str = "0x00000000000000000000000000000000000000d4";
pub const DUST: &str = "0x00000000000000000000000000000000000000e5";

/// WNATIVE/USDC, stablecoin is token1
pub const STABLE_POOL_A: &str = "0x0000000000000000000000000000000000005a01";
/// USDC/WNATIVE, stablecoin is token0
pub const STABLE_POOL_B: &str = "0x0000000000000000000000000000000000005b02";

pub fn bd(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

pub fn settings() -> DeploymentSettings {
    DeploymentSettings {
        network: "testnet".to_string(),
        native_wrapped_address: WNATIVE.to_string(),
        factory_address: Some("0x00000000000000000000000000000000000000ff".to_string()),
        start_block: 0,
        stable_pools: vec![
            StablePoolSettings {
                address: STABLE_POOL_A.to_string(),
                stable_side: PoolSide::Token1,
            },
            StablePoolSettings {
                address: STABLE_POOL_B.to_string(),
                stable_side: PoolSide::Token0,
            },
        ],
        whitelist: vec![WNATIVE.to_string(), USDC.to_string(), ICE.to_string()],
        min_liquidity_native: "10".to_string(),
    }
}

pub fn profile() -> DeploymentProfile {
    DeploymentProfile::from_settings(&settings()).unwrap()
}

pub fn token(id: &str, derived_native: Option<&str>) -> Token {
    let mut token = Token::new(id.to_string(), String::new(), String::new(), 18);
    token.derived_native = derived_native.map(bd);
    token
}

pub fn pair(id: &str, token0: &str, token1: &str, reserve0: &str, reserve1: &str, reserve_native: &str) -> Pair {
    let mut pair = Pair::new(id.to_string(), token0.to_string(), token1.to_string(), 1);
    pair.update_reserves(bd(reserve0), bd(reserve1), 1);
    pair.reserve_native = bd(reserve_native);
    pair
}

/// Store seeded with the whitelist tokens and their derived prices.
pub fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.save_token(token(WNATIVE, Some("1")));
    store.save_token(token(USDC, Some("0.0005")));
    store.save_token(token(ICE, Some("0.25")));
    store
}
