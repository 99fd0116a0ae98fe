use bigdecimal::BigDecimal;
use num_traits::Zero;

use crate::{
    config::{DeploymentProfile, Whitelist},
    db::models::{Bundle, Token},
};

/// Which legs of a two-token event are trusted for USD statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrustedLegs {
    Both,
    Token0,
    Token1,
    Neither,
}

/// Decides how much of a swap or liquidity event counts as tracked USD.
///
/// Only whitelisted tokens are trusted to carry real value, so a pair of two
/// long-tail tokens never contributes, however its reserves are priced.
pub struct VolumeTracker<'a> {
    whitelist: &'a Whitelist,
}

impl<'a> VolumeTracker<'a> {
    pub fn new(profile: &'a DeploymentProfile) -> Self {
        Self {
            whitelist: &profile.whitelist,
        }
    }

    fn trusted_legs(&self, token0: &Token, token1: &Token) -> TrustedLegs {
        match (
            self.whitelist.contains(&token0.id),
            self.whitelist.contains(&token1.id),
        ) {
            (true, true) => TrustedLegs::Both,
            (true, false) => TrustedLegs::Token0,
            (false, true) => TrustedLegs::Token1,
            (false, false) => TrustedLegs::Neither,
        }
    }

    /// Tracked USD volume of a swap.
    ///
    /// Both legs trusted: their average. One leg trusted: that leg alone.
    /// Neither: zero.
    pub fn tracked_volume_usd(
        &self,
        bundle: &Bundle,
        amount0: &BigDecimal,
        token0: &Token,
        amount1: &BigDecimal,
        token1: &Token,
    ) -> BigDecimal {
        let price0 = token0.derived_native_or_zero() * &bundle.native_price_usd;
        let price1 = token1.derived_native_or_zero() * &bundle.native_price_usd;

        match self.trusted_legs(token0, token1) {
            TrustedLegs::Both => (amount0 * price0 + amount1 * price1) / BigDecimal::from(2),
            TrustedLegs::Token0 => amount0 * price0,
            TrustedLegs::Token1 => amount1 * price1,
            TrustedLegs::Neither => BigDecimal::zero(),
        }
    }

    /// Tracked USD liquidity of a reserve set or a mint/burn.
    ///
    /// Both legs trusted: their sum. One leg trusted: twice that leg, since a
    /// constant-product pair holds equal value on both sides. Neither: zero.
    pub fn tracked_liquidity_usd(
        &self,
        bundle: &Bundle,
        amount0: &BigDecimal,
        token0: &Token,
        amount1: &BigDecimal,
        token1: &Token,
    ) -> BigDecimal {
        let price0 = token0.derived_native_or_zero() * &bundle.native_price_usd;
        let price1 = token1.derived_native_or_zero() * &bundle.native_price_usd;

        match self.trusted_legs(token0, token1) {
            TrustedLegs::Both => amount0 * price0 + amount1 * price1,
            TrustedLegs::Token0 => amount0 * price0 * BigDecimal::from(2),
            TrustedLegs::Token1 => amount1 * price1 * BigDecimal::from(2),
            TrustedLegs::Neither => BigDecimal::zero(),
        }
    }
}
