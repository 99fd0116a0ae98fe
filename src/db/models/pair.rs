use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::{
    config::PoolSide,
    utils::{round_price, safe_div},
};

/// Constant-product liquidity pair and its current state.
///
/// Primary Key: `id` (lowercase pair address)
///
/// Reserves are decimal-adjusted by each token's decimals. Prices follow the
/// Uniswap V2 convention:
/// - `token0_price` = token0 per token1 (`reserve0 / reserve1`)
/// - `token1_price` = token1 per token0 (`reserve1 / reserve0`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub id: String,
    pub token0: String,
    pub token1: String,

    // Reserve state
    pub reserve0: BigDecimal,
    pub reserve1: BigDecimal,
    pub token0_price: BigDecimal,
    pub token1_price: BigDecimal,

    // Liquidity valuation
    /// Native-asset value of both reserves, used as the pricing liquidity gate
    pub reserve_native: BigDecimal,
    pub reserve_usd: BigDecimal,
    /// Whitelist-attributed liquidity, in native units
    pub tracked_reserve_native: BigDecimal,

    // Lifetime stats
    pub volume_token0: BigDecimal,
    pub volume_token1: BigDecimal,
    pub volume_usd: BigDecimal,
    pub untracked_volume_usd: BigDecimal,
    pub tx_count: u64,

    pub created_at_block: u64,
    pub block_number: u64,
}

impl Pair {
    pub fn new(id: String, token0: String, token1: String, block_number: u64) -> Self {
        Self {
            id,
            token0,
            token1,
            reserve0: BigDecimal::zero(),
            reserve1: BigDecimal::zero(),
            token0_price: BigDecimal::zero(),
            token1_price: BigDecimal::zero(),
            reserve_native: BigDecimal::zero(),
            reserve_usd: BigDecimal::zero(),
            tracked_reserve_native: BigDecimal::zero(),
            volume_token0: BigDecimal::zero(),
            volume_token1: BigDecimal::zero(),
            volume_usd: BigDecimal::zero(),
            untracked_volume_usd: BigDecimal::zero(),
            tx_count: 0,
            created_at_block: block_number,
            block_number,
        }
    }

    /// Apply new reserves from a `Sync` and recompute both spot prices.
    pub fn update_reserves(&mut self, reserve0: BigDecimal, reserve1: BigDecimal, block_number: u64) {
        self.token0_price = round_price(safe_div(&reserve0, &reserve1));
        self.token1_price = round_price(safe_div(&reserve1, &reserve0));
        self.reserve0 = reserve0;
        self.reserve1 = reserve1;
        self.block_number = self.block_number.max(block_number);
    }

    /// Which side `token` sits on, if it belongs to this pair.
    pub fn side_of(&self, token: &str) -> Option<PoolSide> {
        if self.token0 == token {
            Some(PoolSide::Token0)
        } else if self.token1 == token {
            Some(PoolSide::Token1)
        } else {
            None
        }
    }

    pub fn reserve(&self, side: PoolSide) -> &BigDecimal {
        match side {
            PoolSide::Token0 => &self.reserve0,
            PoolSide::Token1 => &self.reserve1,
        }
    }

    pub fn token(&self, side: PoolSide) -> &str {
        match side {
            PoolSide::Token0 => &self.token0,
            PoolSide::Token1 => &self.token1,
        }
    }

    /// Units of the opposite token per one unit of the token on `side`.
    pub fn counterpart_price(&self, side: PoolSide) -> &BigDecimal {
        match side {
            PoolSide::Token0 => &self.token1_price,
            PoolSide::Token1 => &self.token0_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn pair() -> Pair {
        Pair::new("0xpair".into(), "0xaaa".into(), "0xbbb".into(), 10)
    }

    #[test]
    fn test_update_reserves_sets_uniswap_prices() {
        let mut p = pair();
        p.update_reserves(BigDecimal::from(100), BigDecimal::from(400), 11);

        assert_eq!(p.token0_price, BigDecimal::from_str("0.25").unwrap());
        assert_eq!(p.token1_price, BigDecimal::from(4));
        assert_eq!(p.block_number, 11);
        assert_eq!(p.created_at_block, 10);
    }

    #[test]
    fn test_update_reserves_zero_side_gives_zero_prices() {
        let mut p = pair();
        p.update_reserves(BigDecimal::zero(), BigDecimal::from(5), 11);
        assert!(p.token1_price.is_zero());
        assert!(p.token0_price.is_zero());
    }

    #[test]
    fn test_counterpart_price_matches_side() {
        let mut p = pair();
        p.update_reserves(BigDecimal::from(2), BigDecimal::from(6), 11);

        // One 0xaaa is worth 3 0xbbb
        let side = p.side_of("0xaaa").unwrap();
        assert_eq!(side, PoolSide::Token0);
        assert_eq!(p.counterpart_price(side), &BigDecimal::from(3));
        assert_eq!(p.token(side.opposite()), "0xbbb");
        assert!(p.side_of("0xccc").is_none());
    }

    #[test]
    fn test_repeating_ratio_is_rounded() {
        let mut p = pair();
        p.update_reserves(BigDecimal::from(3), BigDecimal::from(7), 11);

        assert_eq!(p.token0_price.digits(), crate::utils::PRICE_PRECISION);
        assert_eq!(p.token1_price.digits(), crate::utils::PRICE_PRECISION);
    }

    #[test]
    fn test_stale_block_does_not_rewind() {
        let mut p = pair();
        p.update_reserves(BigDecimal::from(1), BigDecimal::from(1), 20);
        p.update_reserves(BigDecimal::from(2), BigDecimal::from(2), 15);
        assert_eq!(p.block_number, 20);
    }
}
