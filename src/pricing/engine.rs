use bigdecimal::BigDecimal;
use log::{debug, error, warn};
use num_traits::{One, Zero};

use super::resolver::{PairLookup, PairResolver};
use crate::{config::DeploymentProfile, db::ReferenceStore, utils::round_price};

/// Reference price derivation for one deployment.
///
/// Two questions are answered here, both as pure functions of the store:
/// 1. What is the native asset worth in the chain's stablecoin?
///    Liquidity-weighted across every canonical stable pool that exists.
/// 2. What is a token worth in native units?
///    One hop through the first whitelist anchor that has a liquid pair with it.
///
/// The anchor's own `derived_native` is used as stored. It is not re-derived,
/// which bounds the work per event and rules out pricing cycles between
/// whitelisted tokens; an anchor repriced earlier in the same event but not
/// yet saved contributes its previous price.
pub struct PriceEngine<'a> {
    profile: &'a DeploymentProfile,
}

impl<'a> PriceEngine<'a> {
    pub fn new(profile: &'a DeploymentProfile) -> Self {
        Self { profile }
    }

    /// Native asset price in USD from the canonical stable pools.
    ///
    /// `sum(stable reserves) / sum(native reserves)` over the pools that are
    /// already in the store, so a deeper pool weighs more. Zero while none of
    /// them exist.
    pub fn compute_native_price_usd<S: ReferenceStore>(&self, store: &S) -> BigDecimal {
        let mut total_stable = BigDecimal::zero();
        let mut total_native = BigDecimal::zero();

        for pool in &self.profile.canonical_stable_pools {
            let Some(pair) = store.load_pair(&pool.address) else {
                continue;
            };

            total_stable += pair.reserve(pool.stable_side);
            total_native += pair.reserve(pool.stable_side.opposite());
        }

        if total_native.is_zero() {
            return BigDecimal::zero();
        }

        round_price(total_stable / total_native)
    }

    /// Price of `token_id` in native-asset units.
    ///
    /// Walks the whitelist in configured order and returns on the first anchor
    /// whose pair with the token holds more than `min_liquidity_native`. Zero
    /// means "unknown", not "worthless".
    pub fn derive_native_price<S, R>(&self, token_id: &str, store: &S, resolver: &R) -> BigDecimal
    where
        S: ReferenceStore,
        R: PairResolver,
    {
        if self.profile.is_native(token_id) {
            return BigDecimal::one();
        }

        for anchor in self.profile.whitelist.iter() {
            let pair_address = match resolver.try_get_pair(token_id, anchor) {
                PairLookup::Found(address) => address,
                PairLookup::Missing => continue,
                PairLookup::Reverted => {
                    error!(
                        "getPair({}, {}) reverted, skipping anchor",
                        token_id, anchor
                    );
                    continue;
                },
            };

            let Some(pair) = store.load_pair(&pair_address) else {
                warn!(
                    "Pair {} for {}/{} is not indexed yet, skipping anchor",
                    pair_address, token_id, anchor
                );
                continue;
            };

            let Some(side) = pair.side_of(token_id) else {
                warn!(
                    "Pair {} resolved for {} does not contain it, skipping anchor",
                    pair_address, token_id
                );
                continue;
            };

            if pair.reserve_native <= self.profile.min_liquidity_native {
                debug!(
                    "Pair {} below liquidity threshold ({} <= {}), skipping anchor {}",
                    pair.id, pair.reserve_native, self.profile.min_liquidity_native, anchor
                );
                continue;
            }

            let anchor_native = store
                .load_token(pair.token(side.opposite()))
                .map(|t| t.derived_native_or_zero())
                .unwrap_or_else(BigDecimal::zero);

            // anchor per token * native per anchor
            return round_price(pair.counterpart_price(side) * anchor_native);
        }

        BigDecimal::zero()
    }
}
