//! Built-in deployment constants for the chains the exchange is live on.
//!
//! Addresses are kept exactly as published; [`DeploymentProfile`] normalizes
//! them. Factories are only listed where known, replaying logs for the other
//! networks needs `deployment.factory_address` in configuration.
//!
//! [`DeploymentProfile`]: super::DeploymentProfile

use super::{DeploymentSettings, PoolSide, StablePoolSettings};

/// Networks with a built-in preset.
pub const NETWORKS: &[&str] = &["core", "xdc", "bitgert", "lightlink"];

/// Look up a preset by network name (case-insensitive).
pub fn preset(network: &str) -> Option<DeploymentSettings> {
    match network.to_lowercase().as_str() {
        "core" => Some(core()),
        "xdc" => Some(xdc()),
        "bitgert" => Some(bitgert()),
        "lightlink" => Some(lightlink()),
        _ => None,
    }
}

fn pool(address: &str, stable_side: PoolSide) -> StablePoolSettings {
    StablePoolSettings {
        address: address.to_string(),
        stable_side,
    }
}

fn addresses(list: &[&str]) -> Vec<String> {
    list.iter().map(|a| a.to_string()).collect()
}

fn core() -> DeploymentSettings {
    DeploymentSettings {
        network: "core".to_string(),
        native_wrapped_address: "0x40375c92d9faf44d2f9db9bd9ba41a3317a2404f".to_string(),
        factory_address: None,
        start_block: 0,
        // USDT/WCORE
        stable_pools: vec![pool("0x5ebae3a840ff34b107d637c8ed07c3d1d2017178", PoolSide::Token1)],
        whitelist: addresses(&[
            "0x40375c92d9faf44d2f9db9bd9ba41a3317a2404f", // WCORE
            "0xa20b3b97df3a02f9185175760300a06b4e0a2c05", // SCORE
            "0xc0e49f8c615d3d4c245970f6dc528e4a47d69a44", // ICE
            "0x81bcea03678d1cef4830942227720d542aa15817", // USDT (IceCreamSwap Bridge)
            "0xd2683b22287e63d22928cbe4514003a92507f474", // USDC (IceCreamSwap Bridge)
            "0x8687cd1d02a28098571067ddb18f33fef667c929", // BUSD (IceCreamSwap Bridge)
            "0x1f82d787a1186c67360e62869c46eadbc192846a", // DAI (IceCreamSwap Bridge)
            "0x12aa82525deff84777fa78578a68ceb854a85f43", // BNB (IceCreamSwap Bridge)
            "0xef6b7bc74c9354bcf2e3f2a068e4b0b5cdf08f29", // ETH (IceCreamSwap Bridge)
        ]),
        min_liquidity_native: "10".to_string(),
    }
}

fn xdc() -> DeploymentSettings {
    DeploymentSettings {
        network: "xdc".to_string(),
        native_wrapped_address: "0x40375C92d9FAf44d2f9db9Bd9ba41a3317a2404f".to_string(),
        factory_address: None,
        start_block: 0,
        // USDT/WXDC
        stable_pools: vec![pool("0xe9450d66a493c3ae6ebc3bb0b2b01a5107ea8bdb", PoolSide::Token1)],
        whitelist: addresses(&[
            "0x40375C92d9FAf44d2f9db9Bd9ba41a3317a2404f", // WXDC
            "0x54051d9dbe99687867090d95fe15c3d3e35512ba", // ICE
            "0xc57f0eb99363e747d637b17bbdb4e1ab85e60631", // USDT (IceCreamSwap Bridge)
            "0xb25cb6a275a8d6a613228fb161eb3627b50eb696", // USDC (IceCreamSwap Bridge)
        ]),
        min_liquidity_native: "10".to_string(),
    }
}

fn bitgert() -> DeploymentSettings {
    DeploymentSettings {
        network: "bitgert".to_string(),
        native_wrapped_address: "0x0eb9036cbe0f052386f36170c6b07ef0a0e3f710".to_string(),
        factory_address: None,
        start_block: 0,
        stable_pools: vec![
            pool("0x9c597044bb020a4862d7d74052a8f545cdc1b8d1", PoolSide::Token1), // USDC/WBRISE (old)
            pool("0x8c243d7b04e0f8f78dc87c8c2297581310468129", PoolSide::Token1), // USDT/WBRISE (old)
            pool("0x8e7dd0d762f60942e0bd05b1114d6cedf4435a18", PoolSide::Token1), // USDT/WBRISE
            pool("0x7b970fba17679054d4865b2c6181baf12080b6a3", PoolSide::Token1), // USDC/WBRISE
        ],
        whitelist: addresses(&[
            "0x0eb9036cbe0f052386f36170c6b07ef0a0e3f710", // WBRISE
            "0xb999ea90607a826a3e6e6646b404c3c7d11fa39d", // ICE
            "0xc7e6d7e08a89209f02af47965337714153c529f0", // USDTi
            "0xaedd3ff7b9fc5fc4e44d140b80f0b1c7fdb6102c", // USDCi
            "0xc3b730dd10a7e9a69204bdf6cb5a426e4f1f09e3", // LunaGens
            "0xe3f5a90f9cb311505cd691a46596599aa1a0ad7d", // USDT
            "0x765277eebeca2e31912c9946eae1021199b39c61", // USDC
            "0x31226b28add9062c5064a9bd35ea155f323c6ca6", // PRDS
            "0x11203a00a9134db8586381c4b2fca0816476b3fd", // YPC
            "0x71946a5c9da7c95ee804a9be561ec15a3f286a7d", // BPAD
            "0x41c5ae56681fb19334ecf7d914919805dae2ec8f", // BROGE
            "0x9b8535dd9281e48484725bc9eb6ed2f66cea2a36", // BRZILLA
            "0xd6447d2fa919811c41a064bdbdab1e281f8de9b2", // VEF
            "0xc89fcd3e1cf5a355fc41e160d18bac5f624610d4", // WMF
            "0x0e11dce06ef2fed6f78cef5144f970e1184b4298", // SPHYNX
        ]),
        min_liquidity_native: "100000000".to_string(),
    }
}

fn lightlink() -> DeploymentSettings {
    DeploymentSettings {
        network: "lightlink".to_string(),
        native_wrapped_address: "0x7EbeF2A4b1B09381Ec5B9dF8C5c6f2dBECA59c73".to_string(),
        factory_address: Some("0xC87De04e2EC1F4282dFF2933A2D58199f688fC3d".to_string()),
        start_block: 79635816,
        stable_pools: vec![
            // WETH/USDC, USDC sorts first
            pool("0x119258E1e790fcD812915936C5f2447ecf8F6Ad1", PoolSide::Token0),
            pool("0x0000000000000000000000000000000000000000", PoolSide::Token0),
        ],
        whitelist: addresses(&[
            "0x7EbeF2A4b1B09381Ec5B9dF8C5c6f2dBECA59c73", // WETH
            "0x18fB38404DADeE1727Be4b805c5b242B5413Fa40", // USDC
        ]),
        min_liquidity_native: "0.1".to_string(),
    }
}
