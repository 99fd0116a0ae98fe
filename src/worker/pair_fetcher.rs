use std::time::Duration;

use alloy::{
    eips::BlockId,
    primitives::Address,
    providers::{DynProvider, MULTICALL3_ADDRESS},
    sol_types::SolCall,
};
use anyhow::{Context, Result};
use log::debug;

use crate::{
    abis::{
        multicall::IMulticall3::{self, Call3},
        IUniswapV2Factory,
    },
    config::Whitelist,
    pricing::{PairLookup, PairLookupTable},
    utils::address_id,
};

const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// `getPair` calls per aggregate3 request
const LOOKUPS_PER_MULTICALL: usize = 200;

/// Resolves token/whitelist pairs through `factory.getPair`.
///
/// All lookups for a batch are answered at one block height, so a pair the
/// factory deploys later in the batch is only known through
/// [`PairResolver::on_pair_created`](crate::pricing::PairResolver::on_pair_created).
#[derive(Clone)]
pub struct PairFetcher {
    provider: DynProvider,
    factory: Address,
}

impl PairFetcher {
    pub fn new(provider: DynProvider, factory: &str) -> Result<Self> {
        let factory = factory.parse().context("Invalid factory address")?;
        Ok(Self { provider, factory })
    }

    /// Look up the pair of every token with every whitelist anchor at
    /// `block`. A sub-call that fails or returns garbage is recorded as
    /// [`PairLookup::Reverted`].
    pub async fn prefetch(&self, tokens: &[String], whitelist: &Whitelist, block: u64) -> Result<PairLookupTable> {
        let factory = IUniswapV2Factory::new(self.factory, &self.provider);
        let multicall = IMulticall3::new(MULTICALL3_ADDRESS, &self.provider);

        let mut combinations: Vec<(&str, &str)> = Vec::with_capacity(tokens.len() * whitelist.len());
        for token in tokens {
            for anchor in whitelist.iter() {
                if token != anchor {
                    combinations.push((token.as_str(), anchor));
                }
            }
        }

        let mut table = PairLookupTable::new();

        for chunk in combinations.chunks(LOOKUPS_PER_MULTICALL) {
            let mut calls = Vec::with_capacity(chunk.len());
            for (token, anchor) in chunk {
                let token_a: Address = token.parse().context("Invalid token address")?;
                let token_b: Address = anchor.parse().context("Invalid whitelist address")?;

                calls.push(Call3 {
                    target: self.factory,
                    allowFailure: true,
                    callData: factory.getPair(token_a, token_b).calldata().clone(),
                });
            }

            let results = tokio::time::timeout(
                RPC_CALL_TIMEOUT,
                multicall
                    .aggregate3(calls)
                    .block(BlockId::number(block))
                    .call(),
            )
            .await
            .context("Multicall timeout")?
            .context("Multicall aggregate3 failed")?;

            for (i, (token, anchor)) in chunk.iter().enumerate() {
                let lookup = match results.get(i) {
                    Some(res) if res.success => {
                        match IUniswapV2Factory::getPairCall::abi_decode_returns(&res.returnData) {
                            Ok(pair) => PairLookup::from_address(address_id(&pair)),
                            Err(_) => PairLookup::Reverted,
                        }
                    },
                    _ => PairLookup::Reverted,
                };
                table.insert(token, anchor, lookup);
            }
        }

        debug!(
            "Prefetched {} pair lookups for {} tokens at block {}",
            table.len(),
            tokens.len(),
            block
        );

        Ok(table)
    }
}
