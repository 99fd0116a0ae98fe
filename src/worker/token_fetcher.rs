use std::time::Duration;

use alloy::{
    primitives::Address,
    providers::{DynProvider, MULTICALL3_ADDRESS},
    sol_types::SolCall,
};
use anyhow::{Context, Result};
use log::{debug, warn};
use moka::future::Cache;
use rustc_hash::FxHashMap;

use crate::{
    abis::{
        multicall::IMulticall3::{self, Call3},
        IERC20Metadata,
    },
    db::models::Token,
};

/// Maximum retries for multicall
const MAX_RETRIES: u32 = 3;

/// Delay between retries (exponential backoff base)
const RETRY_DELAY_MS: u64 = 100;

/// Timeout for individual RPC calls
const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Tokens reporting more decimals than this are treated as broken contracts
const MAX_DECIMALS: u8 = 36;

/// ERC-20 metadata fetcher using Multicall3.
///
/// Callers only ask for tokens they do not hold yet; results are not cached,
/// failures are.
#[derive(Clone)]
pub struct TokenFetcher {
    provider: DynProvider,
    /// Token addresses that failed to fetch (no code, no decimals, ...)
    invalid_tokens: Cache<String, ()>,
}

impl TokenFetcher {
    /// Batch size for multicall requests to avoid RPC congestion/timeouts
    const MULTICALL_BATCH_SIZE: usize = 20;

    pub fn new(provider: DynProvider) -> Self {
        // TTL so a token that was not deployed yet is retried eventually
        let invalid_tokens = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Self {
            provider,
            invalid_tokens,
        }
    }

    /// Fetch metadata for `addresses`. Tokens that cannot be fetched are left
    /// out of the result.
    pub async fn get_tokens(&self, addresses: &[String]) -> FxHashMap<String, Token> {
        let mut result = FxHashMap::default();

        let valid_addresses: Vec<String> = addresses
            .iter()
            .filter(|addr| !self.invalid_tokens.contains_key(*addr))
            .cloned()
            .collect();

        if valid_addresses.is_empty() {
            return result;
        }

        let mut fetched: Vec<Option<Token>> = Vec::with_capacity(valid_addresses.len());
        for chunk in valid_addresses.chunks(Self::MULTICALL_BATCH_SIZE) {
            fetched.extend(self.fetch_metadata_chunk_with_retry(chunk).await);
        }

        for (requested_addr, maybe_token) in valid_addresses.iter().zip(fetched) {
            match maybe_token {
                Some(token) => {
                    result.insert(requested_addr.clone(), token);
                },
                None => {
                    warn!("Could not fetch metadata for token {}", requested_addr);
                    self.invalid_tokens.insert(requested_addr.clone(), ()).await;
                },
            }
        }

        debug!("Fetched metadata for {}/{} tokens", result.len(), addresses.len());

        result
    }

    async fn fetch_metadata_chunk_with_retry(&self, addresses: &[String]) -> Vec<Option<Token>> {
        for attempt in 0..MAX_RETRIES {
            match self.fetch_metadata_chunk(addresses).await {
                Ok(tokens) => return tokens,
                Err(e) => {
                    debug!("Token multicall attempt {} failed: {:?}", attempt + 1, e);
                    if attempt < MAX_RETRIES - 1 {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(attempt));
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        // All retries failed - try individual fetches as fallback
        self.fetch_tokens_individually(addresses).await
    }

    /// Fallback when multicall fails (e.g. Multicall3 not deployed at that height)
    async fn fetch_tokens_individually(&self, addresses: &[String]) -> Vec<Option<Token>> {
        let tasks = addresses.iter().map(|addr| self.fetch_single_token(addr));
        futures::future::join_all(tasks).await
    }

    async fn fetch_single_token(&self, addr: &str) -> Option<Token> {
        let address: Address = addr.parse().ok()?;
        let contract = IERC20Metadata::new(address, &self.provider);

        // Decimals is required
        let decimals = match tokio::time::timeout(RPC_CALL_TIMEOUT, contract.decimals().call()).await {
            Ok(Ok(d)) => d,
            _ => return None,
        };

        if decimals > MAX_DECIMALS {
            return None;
        }

        let name = tokio::time::timeout(RPC_CALL_TIMEOUT, contract.name().call())
            .await
            .ok()
            .and_then(|r| r.ok())
            .unwrap_or_default();

        let symbol = tokio::time::timeout(RPC_CALL_TIMEOUT, contract.symbol().call())
            .await
            .ok()
            .and_then(|r| r.ok())
            .unwrap_or_default();

        Some(Token::new(addr.to_string(), symbol, name, decimals))
    }

    async fn fetch_metadata_chunk(&self, addresses: &[String]) -> Result<Vec<Option<Token>>> {
        let multicall = IMulticall3::new(MULTICALL3_ADDRESS, &self.provider);
        let mut calls = Vec::with_capacity(addresses.len() * 3);

        for addr in addresses {
            let target: Address = addr.parse().context("Invalid token address")?;
            let token = IERC20Metadata::new(target, &self.provider);

            for call_data in [
                token.name().calldata().clone(),
                token.symbol().calldata().clone(),
                token.decimals().calldata().clone(),
            ] {
                calls.push(Call3 {
                    target,
                    allowFailure: true,
                    callData: call_data,
                });
            }
        }

        let results = tokio::time::timeout(RPC_CALL_TIMEOUT, multicall.aggregate3(calls).call())
            .await
            .context("Multicall timeout")?
            .context("Multicall aggregate3 failed")?;

        // Index-aligned with `addresses`
        let mut tokens: Vec<Option<Token>> = Vec::with_capacity(addresses.len());

        for (addr, chunk) in addresses.iter().zip(results.chunks(3)) {
            let [name_res, symbol_res, decimals_res] = chunk else {
                tokens.push(None);
                continue;
            };

            let decimals = if decimals_res.success {
                IERC20Metadata::decimalsCall::abi_decode_returns(&decimals_res.returnData).ok()
            } else {
                None
            };

            let Some(decimals) = decimals.filter(|d| *d <= MAX_DECIMALS) else {
                tokens.push(None);
                continue;
            };

            let name = if name_res.success {
                IERC20Metadata::nameCall::abi_decode_returns(&name_res.returnData).unwrap_or_default()
            } else {
                String::new()
            };

            let symbol = if symbol_res.success {
                IERC20Metadata::symbolCall::abi_decode_returns(&symbol_res.returnData).unwrap_or_default()
            } else {
                String::new()
            };

            tokens.push(Some(Token::new(addr.clone(), symbol, name, decimals)));
        }

        // Short response: pad so the caller's zip stays aligned
        tokens.resize(addresses.len(), None);

        Ok(tokens)
    }
}
