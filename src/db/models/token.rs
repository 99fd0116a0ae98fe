use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// ERC-20 token observed in at least one pair.
///
/// Primary Key: `id` (lowercase token address)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,

    // On-chain metadata (immutable after first fetch)
    pub symbol: String,
    pub name: String,
    pub decimals: u8,

    /// Price in native-asset units. `None` until first derived.
    pub derived_native: Option<BigDecimal>,

    // Lifetime stats
    pub trade_volume: BigDecimal,
    pub trade_volume_usd: BigDecimal,
    pub untracked_volume_usd: BigDecimal,
    pub tx_count: u64,
}

impl Token {
    pub fn new(id: String, symbol: String, name: String, decimals: u8) -> Self {
        Self {
            // Always lowercase addresses for consistent comparisons
            id: id.to_lowercase(),
            symbol,
            name,
            decimals,
            derived_native: None,
            trade_volume: BigDecimal::zero(),
            trade_volume_usd: BigDecimal::zero(),
            untracked_volume_usd: BigDecimal::zero(),
            tx_count: 0,
        }
    }

    /// Derived price with "not yet derived" read as zero.
    pub fn derived_native_or_zero(&self) -> BigDecimal {
        self.derived_native.clone().unwrap_or_else(BigDecimal::zero)
    }
}
