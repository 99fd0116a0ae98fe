use std::sync::Arc;

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use log::{debug, info, warn};
use num_traits::{One, Zero};
use rustc_hash::FxHashMap;

use super::parser::ParsedLog;
use crate::{
    config::DeploymentProfile,
    db::{
        models::{Bundle, Pair, Token},
        MemoryStore, ReferenceStore,
    },
    pricing::{PairRegistry, PairResolver, PriceEngine, VolumeTracker},
    utils::{address_id, safe_div, u256_to_decimal},
};

/// USD attribution computed for one swap, mint or burn.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedAmounts {
    pub tracked_usd: BigDecimal,
    pub tracked_native: BigDecimal,
    pub untracked_usd: BigDecimal,
}

/// Outcome of re-pricing a whole store.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSummary {
    pub native_price_usd: BigDecimal,
    pub priced_tokens: usize,
    pub unpriced_tokens: usize,
}

/// Applies V2 exchange events to a reference store.
///
/// Events must be fed strictly in chain order: every handler reads the
/// state left by the previous one.
pub struct ExchangeIndexer<S: ReferenceStore, R: PairResolver = PairRegistry> {
    profile: Arc<DeploymentProfile>,
    store: S,
    resolver: R,
}

impl<S: ReferenceStore, R: PairResolver> ExchangeIndexer<S, R> {
    pub fn new(profile: Arc<DeploymentProfile>, store: S, resolver: R) -> Self {
        Self {
            profile,
            store,
            resolver,
        }
    }

    pub fn profile(&self) -> &DeploymentProfile {
        &self.profile
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn bundle(&self) -> Bundle {
        self.store.load_bundle().unwrap_or_default()
    }

    /// Load a pair with both of its tokens. `None` for pairs this deployment
    /// never created.
    fn load_pair_with_tokens(&self, pair_address: &str) -> Option<(Pair, Token, Token)> {
        let pair = self.store.load_pair(pair_address)?;

        let (Some(token0), Some(token1)) = (
            self.store.load_token(&pair.token0),
            self.store.load_token(&pair.token1),
        ) else {
            warn!("Pair {} references unknown tokens, ignoring event", pair.id);
            return None;
        };

        Some((pair, token0, token1))
    }

    /// Dispatch one parsed log. `metadata` supplies tokens first seen in a
    /// `PairCreated`.
    pub fn apply(&mut self, log: &ParsedLog, metadata: &FxHashMap<String, Token>) -> Option<TrackedAmounts> {
        match log {
            ParsedLog::PairCreated {
                event,
                log_address,
                block_number,
                ..
            } => {
                if let Some(factory) = &self.profile.factory_address {
                    if factory != log_address {
                        return None;
                    }
                }

                let token0 = self.token_for_creation(&address_id(&event.token0), metadata)?;
                let token1 = self.token_for_creation(&address_id(&event.token1), metadata)?;

                self.handle_pair_created(&address_id(&event.pair), token0, token1, *block_number);
                None
            },
            ParsedLog::Sync {
                event,
                log_address,
                block_number,
                ..
            } => {
                self.handle_sync(
                    log_address,
                    U256::from(event.reserve0),
                    U256::from(event.reserve1),
                    *block_number,
                );
                None
            },
            ParsedLog::Swap {
                event,
                log_address,
                block_number,
                ..
            } => self.handle_swap(
                log_address,
                event.amount0In,
                event.amount1In,
                event.amount0Out,
                event.amount1Out,
                *block_number,
            ),
            ParsedLog::Mint {
                event,
                log_address,
                block_number,
                ..
            } => self.handle_mint(log_address, event.amount0, event.amount1, *block_number),
            ParsedLog::Burn {
                event,
                log_address,
                block_number,
                ..
            } => self.handle_burn(log_address, event.amount0, event.amount1, *block_number),
        }
    }

    fn token_for_creation(&self, id: &str, metadata: &FxHashMap<String, Token>) -> Option<Token> {
        if let Some(token) = self.store.load_token(id) {
            return Some(token);
        }

        match metadata.get(id) {
            Some(token) => Some(token.clone()),
            None => {
                warn!("No metadata for token {}, skipping its pair", id);
                None
            },
        }
    }

    /// Register a new pair with zero reserves. Returns `false` if the pair
    /// already exists.
    pub fn handle_pair_created(&mut self, pair_address: &str, token0: Token, token1: Token, block_number: u64) -> bool {
        if self.store.load_pair(pair_address).is_some() {
            debug!("Pair {} already indexed", pair_address);
            return false;
        }

        let pair = Pair::new(
            pair_address.to_string(),
            token0.id.clone(),
            token1.id.clone(),
            block_number,
        );

        for mut token in [token0, token1] {
            if self.store.load_token(&token.id).is_some() {
                continue;
            }
            if self.profile.is_native(&token.id) {
                token.derived_native = Some(BigDecimal::one());
            }
            self.store.save_token(token);
        }

        self.resolver
            .on_pair_created(&pair.token0, &pair.token1, &pair.id);

        info!(
            "New pair {} ({}/{}) at block {}",
            pair.id, pair.token0, pair.token1, block_number
        );

        self.store.save_pair(pair);
        true
    }

    /// Apply new reserves, then reprice the bundle, both tokens and the pair's
    /// liquidity. Returns `false` for unknown pairs.
    pub fn handle_sync(&mut self, pair_address: &str, reserve0: U256, reserve1: U256, block_number: u64) -> bool {
        let Some((mut pair, mut token0, mut token1)) = self.load_pair_with_tokens(pair_address) else {
            return false;
        };

        pair.update_reserves(
            u256_to_decimal(reserve0, token0.decimals),
            u256_to_decimal(reserve1, token1.decimals),
            block_number,
        );
        self.store.save_pair(pair.clone());

        let engine = PriceEngine::new(&self.profile);

        let mut bundle = self.bundle();
        bundle.native_price_usd = engine.compute_native_price_usd(&self.store);
        self.store.save_bundle(bundle.clone());

        // Both derived against the store as it stands: neither token sees the
        // other's new price until the next event.
        let derived0 = engine.derive_native_price(&token0.id, &self.store, &self.resolver);
        let derived1 = engine.derive_native_price(&token1.id, &self.store, &self.resolver);
        token0.derived_native = Some(derived0);
        token1.derived_native = Some(derived1);

        self.revalue_pair(&mut pair, &token0, &token1, &bundle);

        self.store.save_pair(pair);
        self.store.save_token(token0);
        self.store.save_token(token1);
        true
    }

    fn revalue_pair(&self, pair: &mut Pair, token0: &Token, token1: &Token, bundle: &Bundle) {
        let tracked_liquidity_usd = VolumeTracker::new(&self.profile).tracked_liquidity_usd(
            bundle,
            &pair.reserve0,
            token0,
            &pair.reserve1,
            token1,
        );

        pair.reserve_native =
            &pair.reserve0 * token0.derived_native_or_zero() + &pair.reserve1 * token1.derived_native_or_zero();
        pair.reserve_usd = &pair.reserve_native * &bundle.native_price_usd;
        pair.tracked_reserve_native = safe_div(&tracked_liquidity_usd, &bundle.native_price_usd);
    }

    pub fn handle_swap(
        &mut self,
        pair_address: &str,
        amount0_in: U256,
        amount1_in: U256,
        amount0_out: U256,
        amount1_out: U256,
        block_number: u64,
    ) -> Option<TrackedAmounts> {
        let (mut pair, mut token0, mut token1) = self.load_pair_with_tokens(pair_address)?;
        let bundle = self.bundle();

        let amount0 =
            u256_to_decimal(amount0_in, token0.decimals) + u256_to_decimal(amount0_out, token0.decimals);
        let amount1 =
            u256_to_decimal(amount1_in, token1.decimals) + u256_to_decimal(amount1_out, token1.decimals);

        let derived_amount_native = (token0.derived_native_or_zero() * &amount0
            + token1.derived_native_or_zero() * &amount1)
            / BigDecimal::from(2);
        let untracked_usd = derived_amount_native * &bundle.native_price_usd;

        let tracked_usd =
            VolumeTracker::new(&self.profile).tracked_volume_usd(&bundle, &amount0, &token0, &amount1, &token1);
        let tracked_native = safe_div(&tracked_usd, &bundle.native_price_usd);

        for (token, amount) in [(&mut token0, &amount0), (&mut token1, &amount1)] {
            token.trade_volume += amount;
            token.trade_volume_usd += &tracked_usd;
            token.untracked_volume_usd += &untracked_usd;
            token.tx_count += 1;
        }

        pair.volume_token0 += &amount0;
        pair.volume_token1 += &amount1;
        pair.volume_usd += &tracked_usd;
        pair.untracked_volume_usd += &untracked_usd;
        pair.tx_count += 1;
        pair.block_number = pair.block_number.max(block_number);

        self.store.save_pair(pair);
        self.store.save_token(token0);
        self.store.save_token(token1);

        Some(TrackedAmounts {
            tracked_usd,
            tracked_native,
            untracked_usd,
        })
    }

    pub fn handle_mint(&mut self, pair_address: &str, amount0: U256, amount1: U256, block_number: u64) -> Option<TrackedAmounts> {
        self.handle_liquidity(pair_address, amount0, amount1, block_number)
    }

    pub fn handle_burn(&mut self, pair_address: &str, amount0: U256, amount1: U256, block_number: u64) -> Option<TrackedAmounts> {
        self.handle_liquidity(pair_address, amount0, amount1, block_number)
    }

    fn handle_liquidity(
        &mut self,
        pair_address: &str,
        amount0: U256,
        amount1: U256,
        block_number: u64,
    ) -> Option<TrackedAmounts> {
        let (mut pair, mut token0, mut token1) = self.load_pair_with_tokens(pair_address)?;
        let bundle = self.bundle();

        let amount0 = u256_to_decimal(amount0, token0.decimals);
        let amount1 = u256_to_decimal(amount1, token1.decimals);

        let untracked_usd = (token0.derived_native_or_zero() * &amount0
            + token1.derived_native_or_zero() * &amount1)
            * &bundle.native_price_usd;
        let tracked_usd =
            VolumeTracker::new(&self.profile).tracked_liquidity_usd(&bundle, &amount0, &token0, &amount1, &token1);
        let tracked_native = safe_div(&tracked_usd, &bundle.native_price_usd);

        token0.tx_count += 1;
        token1.tx_count += 1;
        pair.tx_count += 1;
        pair.block_number = pair.block_number.max(block_number);

        self.store.save_pair(pair);
        self.store.save_token(token0);
        self.store.save_token(token1);

        Some(TrackedAmounts {
            tracked_usd,
            tracked_native,
            untracked_usd,
        })
    }
}

impl<R: PairResolver> ExchangeIndexer<MemoryStore, R> {
    /// Re-price everything already in the store.
    ///
    /// Whitelisted tokens go first, in whitelist order, so the long tail is
    /// derived against refreshed anchors. Each token is saved as soon as it is
    /// priced. Pair valuations are recomputed last.
    pub fn refresh_prices(&mut self) -> RefreshSummary {
        let engine = PriceEngine::new(&self.profile);

        let bundle = Bundle::new(engine.compute_native_price_usd(&self.store));
        self.store.save_bundle(bundle.clone());

        let mut rest: Vec<String> = self
            .store
            .tokens()
            .filter(|t| !self.profile.is_whitelisted(&t.id))
            .map(|t| t.id.clone())
            .collect();
        rest.sort();

        let mut order: Vec<String> = self
            .profile
            .whitelist
            .iter()
            .filter(|id| self.store.has_token(id))
            .map(str::to_string)
            .collect();
        order.extend(rest);

        let mut priced_tokens = 0;
        for id in &order {
            let Some(mut token) = self.store.load_token(id) else {
                continue;
            };

            let derived = engine.derive_native_price(id, &self.store, &self.resolver);
            if !derived.is_zero() {
                priced_tokens += 1;
            }
            token.derived_native = Some(derived);
            self.store.save_token(token);
        }

        let pair_ids: Vec<String> = self.store.pairs().map(|p| p.id.clone()).collect();
        for id in pair_ids {
            let Some((mut pair, token0, token1)) = self.load_pair_with_tokens(&id) else {
                continue;
            };
            self.revalue_pair(&mut pair, &token0, &token1, &bundle);
            self.store.save_pair(pair);
        }

        RefreshSummary {
            native_price_usd: bundle.native_price_usd,
            priced_tokens,
            unpriced_tokens: order.len() - priced_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pricing::fixtures::*, utils::PRICE_PRECISION};
    use alloy::primitives::{aliases::U112, Address};

    const MEME_POOL: &str = "0x000000000000000000000000000000000000c0de";

    /// Whole tokens at 18 decimals.
    fn units(value: u64) -> U256 {
        U256::from(value) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn indexer() -> ExchangeIndexer<MemoryStore> {
        ExchangeIndexer::new(Arc::new(profile()), MemoryStore::new(), PairRegistry::new())
    }

    /// Stable pool priced at 2000, USDC at 0.0005 and MEME at 0.04 native,
    /// through the two-pass warm up a fresh pair needs.
    fn warmed_indexer() -> ExchangeIndexer<MemoryStore> {
        let mut indexer = indexer();
        indexer.handle_pair_created(STABLE_POOL_A, token(WNATIVE, None), token(USDC, None), 1);
        indexer.handle_pair_created(MEME_POOL, token(USDC, None), token(MEME, None), 2);

        for block in 3..5 {
            assert!(indexer.handle_sync(STABLE_POOL_A, units(50), units(100_000), block));
        }
        for block in 5..7 {
            assert!(indexer.handle_sync(MEME_POOL, units(40_000), units(500), block));
        }
        indexer
    }

    fn derived(indexer: &ExchangeIndexer<MemoryStore>, id: &str) -> Option<BigDecimal> {
        indexer.store().load_token(id).unwrap().derived_native
    }

    #[test]
    fn test_pair_created_registers_pair_and_tokens() {
        let mut indexer = indexer();
        assert!(indexer.handle_pair_created(STABLE_POOL_A, token(WNATIVE, None), token(USDC, None), 7));
        assert!(!indexer.handle_pair_created(STABLE_POOL_A, token(WNATIVE, None), token(USDC, None), 8));

        let pair = indexer.store().load_pair(STABLE_POOL_A).unwrap();
        assert_eq!(pair.created_at_block, 7);
        assert!(pair.reserve0.is_zero());

        assert_eq!(derived(&indexer, WNATIVE), Some(BigDecimal::one()));
        assert_eq!(derived(&indexer, USDC), None);
        assert_eq!(
            indexer.resolver().try_get_pair(USDC, WNATIVE),
            crate::pricing::PairLookup::Found(STABLE_POOL_A.to_string())
        );
    }

    #[test]
    fn test_sync_uses_previous_reserve_native_for_threshold() {
        let mut indexer = indexer();
        indexer.handle_pair_created(STABLE_POOL_A, token(WNATIVE, None), token(USDC, None), 1);

        indexer.handle_sync(STABLE_POOL_A, units(50), units(100_000), 2);
        assert_eq!(indexer.store().load_bundle().unwrap().native_price_usd, bd("2000"));
        // Pair had no native value yet when USDC was derived
        assert_eq!(derived(&indexer, USDC), Some(BigDecimal::zero()));
        assert_eq!(indexer.store().load_pair(STABLE_POOL_A).unwrap().reserve_native, bd("50"));

        indexer.handle_sync(STABLE_POOL_A, units(50), units(100_000), 3);
        assert_eq!(derived(&indexer, USDC), Some(bd("0.0005")));

        let pair = indexer.store().load_pair(STABLE_POOL_A).unwrap();
        assert_eq!(pair.reserve_native, bd("100"));
        assert_eq!(pair.reserve_usd, bd("200000"));
        assert_eq!(pair.tracked_reserve_native, bd("100"));
        assert_eq!(pair.block_number, 3);
    }

    #[test]
    fn test_sync_prices_long_tail_token_through_anchor() {
        let indexer = warmed_indexer();
        assert_eq!(derived(&indexer, MEME), Some(bd("0.04")));

        let pair = indexer.store().load_pair(MEME_POOL).unwrap();
        // 40000 * 0.0005 + 500 * 0.04
        assert_eq!(pair.reserve_native, bd("40"));
        // Only USDC is trusted: twice its side, 80000 USD at 2000
        assert_eq!(pair.tracked_reserve_native, bd("40"));
    }

    #[test]
    fn test_sync_without_stable_pool_leaves_usd_at_zero() {
        let mut indexer = indexer();
        indexer.handle_pair_created(MEME_POOL, token(USDC, Some("0.0005")), token(MEME, None), 1);
        indexer.handle_sync(MEME_POOL, units(40_000), units(500), 2);

        let pair = indexer.store().load_pair(MEME_POOL).unwrap();
        assert!(indexer.store().load_bundle().unwrap().native_price_usd.is_zero());
        assert!(pair.reserve_usd.is_zero());
        assert!(pair.tracked_reserve_native.is_zero());
    }

    #[test]
    fn test_swap_attribution_and_accumulation() {
        let mut indexer = warmed_indexer();

        // 100 USDC in, 1.25 MEME out
        let amounts = indexer
            .handle_swap(
                MEME_POOL,
                units(100),
                U256::ZERO,
                U256::ZERO,
                U256::from(1_250_000_000_000_000_000u128),
                7,
            )
            .unwrap();

        assert_eq!(amounts.tracked_usd, bd("100"));
        assert_eq!(amounts.tracked_native, bd("0.05"));
        assert_eq!(amounts.untracked_usd, bd("100"));

        let pair = indexer.store().load_pair(MEME_POOL).unwrap();
        assert_eq!(pair.volume_token0, bd("100"));
        assert_eq!(pair.volume_token1, bd("1.25"));
        assert_eq!(pair.volume_usd, bd("100"));
        assert_eq!(pair.tx_count, 1);

        let meme = indexer.store().load_token(MEME).unwrap();
        assert_eq!(meme.trade_volume, bd("1.25"));
        assert_eq!(meme.trade_volume_usd, bd("100"));
        assert_eq!(meme.tx_count, 1);
    }

    #[test]
    fn test_mint_and_burn_attribution() {
        let mut indexer = warmed_indexer();

        let mint = indexer.handle_mint(MEME_POOL, units(400), units(5), 7).unwrap();
        assert_eq!(mint.tracked_usd, bd("800"));
        assert_eq!(mint.untracked_usd, bd("800"));
        assert_eq!(mint.tracked_native, bd("0.4"));

        let burn = indexer.handle_burn(MEME_POOL, units(200), U256::ZERO, 8).unwrap();
        assert_eq!(burn.tracked_usd, bd("400"));

        assert_eq!(indexer.store().load_pair(MEME_POOL).unwrap().tx_count, 2);
        assert_eq!(indexer.store().load_token(USDC).unwrap().tx_count, 2);
    }

    #[test]
    fn test_mutually_anchored_prices_keep_bounded_precision() {
        // USDC and ICE only trade against each other, so each one's first
        // qualifying anchor is the other.
        let mut store = MemoryStore::new();
        store.save_token(token(USDC, Some("0.0003")));
        store.save_token(token(ICE, Some("0.7")));
        store.save_pair(pair(MEME_POOL, USDC, ICE, "30000", "70", "58"));

        let registry = PairRegistry::from_pairs(store.pairs());
        let mut indexer = ExchangeIndexer::new(Arc::new(profile()), store, registry);

        for i in 0..60u64 {
            assert!(indexer.handle_sync(MEME_POOL, units(30_001 + i), units(70), 10 + i));

            for id in [USDC, ICE] {
                let price = derived(&indexer, id).unwrap();
                assert!(!price.is_zero());
                assert!(price.digits() <= PRICE_PRECISION, "{} has {} digits", id, price.digits());
            }
        }

        let pair = indexer.store().load_pair(MEME_POOL).unwrap();
        assert!(pair.token0_price.digits() <= PRICE_PRECISION);
        assert!(pair.token1_price.digits() <= PRICE_PRECISION);
        assert!(pair.reserve_native.digits() < 3 * PRICE_PRECISION);
    }

    #[test]
    fn test_events_for_unknown_pairs_are_ignored() {
        let mut indexer = warmed_indexer();
        let unknown = "0x000000000000000000000000000000000000dead";

        assert!(!indexer.handle_sync(unknown, units(1), units(1), 9));
        assert!(indexer.handle_swap(unknown, units(1), U256::ZERO, U256::ZERO, units(1), 9).is_none());
        assert!(indexer.handle_mint(unknown, units(1), units(1), 9).is_none());
    }

    #[test]
    fn test_apply_ignores_foreign_factory() {
        let mut indexer = indexer();
        let mut metadata = FxHashMap::default();
        metadata.insert(WNATIVE.to_string(), token(WNATIVE, None));
        metadata.insert(USDC.to_string(), token(USDC, None));

        let created = |log_address: &str| ParsedLog::PairCreated {
            event: crate::abis::PairCreated {
                token0: WNATIVE.parse::<Address>().unwrap(),
                token1: USDC.parse::<Address>().unwrap(),
                pair: STABLE_POOL_A.parse::<Address>().unwrap(),
                _3: U256::from(1u64),
            },
            log_address: log_address.to_string(),
            block_number: 1,
            log_index: 0,
        };

        indexer.apply(&created("0x0000000000000000000000000000000000000bad"), &metadata);
        assert!(indexer.store().load_pair(STABLE_POOL_A).is_none());

        indexer.apply(&created("0x00000000000000000000000000000000000000ff"), &metadata);
        assert!(indexer.store().load_pair(STABLE_POOL_A).is_some());

        let sync = ParsedLog::Sync {
            event: crate::abis::Sync {
                reserve0: U112::from(10u64),
                reserve1: U112::from(20_000u64),
            },
            log_address: STABLE_POOL_A.to_string(),
            block_number: 2,
            log_index: 0,
        };
        indexer.apply(&sync, &metadata);
        assert_eq!(indexer.store().load_bundle().unwrap().native_price_usd, bd("2000"));
    }

    #[test]
    fn test_refresh_prices_reprices_in_whitelist_order() {
        let indexer = warmed_indexer();
        let mut store = indexer.into_store();

        // Stale anchor and long-tail prices
        store.save_token(token(USDC, Some("1")));
        store.save_token(token(MEME, None));

        let registry = PairRegistry::from_pairs(store.pairs());
        let mut indexer = ExchangeIndexer::new(Arc::new(profile()), store, registry);
        let summary = indexer.refresh_prices();

        assert_eq!(summary.native_price_usd, bd("2000"));
        assert_eq!(summary.priced_tokens, 3);
        assert_eq!(summary.unpriced_tokens, 0);
        assert_eq!(derived(&indexer, USDC), Some(bd("0.0005")));
        assert_eq!(derived(&indexer, MEME), Some(bd("0.04")));
        assert_eq!(indexer.store().load_pair(MEME_POOL).unwrap().reserve_native, bd("40"));
    }
}
