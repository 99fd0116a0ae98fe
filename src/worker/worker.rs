use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use alloy::{
    primitives::B256,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::Filter,
};
use anyhow::{bail, Context, Result};
use bigdecimal::BigDecimal;
use log::{info, warn};
use num_traits::Zero;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    config::{DeploymentProfile, IndexerSettings},
    db::{models::Token, MemoryStore, ReferenceStore, Snapshot},
    pricing::{PairLookup, PairLookupTable, PairRegistry, PairResolver},
    utils::address_id,
    worker::{
        handler::ExchangeIndexer,
        pair_fetcher::PairFetcher,
        parser::{self, ParsedLog},
        token_fetcher::TokenFetcher,
    },
};

/// Interval for logging progress updates (10 seconds)
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Timeout for a single `eth_getLogs` request
const GET_LOGS_TIMEOUT: Duration = Duration::from_secs(120);

/// Pair resolution used while applying a batch.
pub enum BatchResolver {
    /// Pairs observed during replay
    Replay(PairRegistry),
    /// `getPair` answers fetched on-chain for the current batch
    Onchain(PairLookupTable),
}

impl PairResolver for BatchResolver {
    fn try_get_pair(&self, token_a: &str, token_b: &str) -> PairLookup {
        match self {
            BatchResolver::Replay(registry) => registry.try_get_pair(token_a, token_b),
            BatchResolver::Onchain(table) => table.try_get_pair(token_a, token_b),
        }
    }

    fn on_pair_created(&mut self, token0: &str, token1: &str, pair: &str) {
        match self {
            BatchResolver::Replay(registry) => registry.on_pair_created(token0, token1, pair),
            BatchResolver::Onchain(table) => table.on_pair_created(token0, token1, pair),
        }
    }
}

/// Totals for one applied batch.
#[derive(Debug, Default)]
struct BatchStats {
    logs: usize,
    tracked_volume_usd: BigDecimal,
}

/// Replays one deployment's exchange logs into a snapshot-backed store.
///
/// Logs are fetched with `eth_getLogs` in block ranges and applied strictly
/// in chain order. The snapshot is rewritten after every range, so a restart
/// resumes from the last fully applied block.
pub struct ChainWorker {
    profile: Arc<DeploymentProfile>,
    provider: DynProvider,
    token_fetcher: TokenFetcher,
    pair_fetcher: Option<PairFetcher>,
    topics: Vec<B256>,
    snapshot_path: PathBuf,
    batch_size: u64,
    tip_poll_interval: Duration,
}

impl ChainWorker {
    /// Requires `rpc_url` and a factory address. `PairCreated` logs from any
    /// other emitter are ignored.
    pub fn new(settings: &IndexerSettings, profile: Arc<DeploymentProfile>) -> Result<Self> {
        let Some(factory) = profile.factory_address.as_deref() else {
            bail!(
                "Replaying {} needs deployment.factory_address",
                profile.network
            );
        };

        let rpc_url = settings
            .rpc_url
            .as_deref()
            .context("indexer.rpc_url is required to replay logs")?;
        let url = Url::parse(rpc_url).context("Invalid RPC URL")?;

        let provider = DynProvider::new(ProviderBuilder::new().connect_http(url));

        let pair_fetcher = if settings.resolve_pairs_onchain {
            Some(PairFetcher::new(provider.clone(), factory)?)
        } else {
            None
        };

        Ok(Self {
            token_fetcher: TokenFetcher::new(provider.clone()),
            pair_fetcher,
            provider,
            profile,
            topics: parser::event_signatures(),
            snapshot_path: PathBuf::from(&settings.snapshot_path),
            batch_size: settings.batch_size.max(1),
            tip_poll_interval: Duration::from_millis(settings.tip_poll_interval_milliseconds),
        })
    }

    /// Load the snapshot and return the store with the first block to fetch.
    fn restore(&self) -> Result<(MemoryStore, u64)> {
        let Some(snapshot) = Snapshot::load(&self.snapshot_path)? else {
            info!(
                "No snapshot at {}, indexing {} from block {}",
                self.snapshot_path.display(),
                self.profile.network,
                self.profile.start_block
            );
            return Ok((MemoryStore::new(), self.profile.start_block));
        };

        if snapshot.network != self.profile.network {
            bail!(
                "Snapshot {} belongs to {}, not {}",
                self.snapshot_path.display(),
                snapshot.network,
                self.profile.network
            );
        }

        let next_block = snapshot
            .last_block
            .map(|b| b + 1)
            .unwrap_or(self.profile.start_block)
            .max(self.profile.start_block);

        let store = snapshot.into_store();
        info!(
            "Restored {} pairs and {} tokens for {}, resuming at block {}",
            store.pair_count(),
            store.token_count(),
            self.profile.network,
            next_block
        );

        Ok((store, next_block))
    }

    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let (store, mut next_block) = self.restore()?;

        let resolver = match self.pair_fetcher {
            Some(_) => BatchResolver::Onchain(PairLookupTable::new()),
            None => BatchResolver::Replay(PairRegistry::from_pairs(store.pairs())),
        };
        let mut indexer = ExchangeIndexer::new(self.profile.clone(), store, resolver);

        let mut last_progress_log = Instant::now();

        loop {
            if cancellation_token.is_cancelled() {
                info!("Indexer for {} received cancellation signal", self.profile.network);
                break;
            }

            let head = tokio::select! {
                _ = cancellation_token.cancelled() => continue,
                head = self.provider.get_block_number() => head.context("Failed to fetch chain head")?,
            };

            if next_block > head {
                // At the tip
                tokio::select! {
                    _ = cancellation_token.cancelled() => {},
                    _ = tokio::time::sleep(self.tip_poll_interval) => {},
                }
                continue;
            }

            let to_block = head.min(next_block.saturating_add(self.batch_size - 1));
            let stats = self.process_batch(&mut indexer, next_block, to_block).await?;

            // Checkpoint only after the whole range is applied
            Snapshot::from_store(&self.profile.network, Some(to_block), indexer.store())
                .save(&self.snapshot_path)
                .context("Failed to write snapshot checkpoint")?;
            next_block = to_block + 1;

            if last_progress_log.elapsed() >= PROGRESS_LOG_INTERVAL || to_block == head {
                let native_price = indexer
                    .store()
                    .load_bundle()
                    .map(|b| b.native_price_usd)
                    .unwrap_or_else(BigDecimal::zero);

                info!(
                    "{} synced to block {}/{} ({} logs, ${} tracked volume in last batch, native price: ${} USD)",
                    self.profile.network,
                    to_block,
                    head,
                    stats.logs,
                    stats.tracked_volume_usd.with_scale(2),
                    native_price.with_scale(5)
                );
                last_progress_log = Instant::now();
            }
        }

        Ok(())
    }

    async fn process_batch(
        &self,
        indexer: &mut ExchangeIndexer<MemoryStore, BatchResolver>,
        from_block: u64,
        to_block: u64,
    ) -> Result<BatchStats> {
        let filter = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .event_signature(self.topics.clone());

        let logs = tokio::time::timeout(GET_LOGS_TIMEOUT, self.provider.get_logs(&filter))
            .await
            .context("eth_getLogs timeout")?
            .with_context(|| format!("eth_getLogs failed for blocks {from_block}..={to_block}"))?;

        let parser::ParseResult {
            parsed_logs,
            token_addresses,
        } = parser::parse_logs(logs);

        let mut missing_tokens: Vec<String> = token_addresses
            .into_iter()
            .filter(|addr| !indexer.store().has_token(addr))
            .collect();
        missing_tokens.sort();
        missing_tokens.dedup();

        let metadata: FxHashMap<String, Token> = if missing_tokens.is_empty() {
            FxHashMap::default()
        } else {
            self.token_fetcher.get_tokens(&missing_tokens).await
        };

        let lookups = match &self.pair_fetcher {
            Some(pair_fetcher) => {
                let tokens = priced_tokens(&parsed_logs, indexer.store());
                // State before the range; pairs created inside it come in via the creation hook
                let table = pair_fetcher
                    .prefetch(&tokens, &self.profile.whitelist, from_block.saturating_sub(1))
                    .await?;
                Some(table)
            },
            None => None,
        };

        let stats = apply_batch(indexer, &parsed_logs, &metadata, lookups);

        if !missing_tokens.is_empty() && metadata.len() < missing_tokens.len() {
            warn!(
                "{} of {} new tokens in blocks {}..={} had no metadata",
                missing_tokens.len() - metadata.len(),
                missing_tokens.len(),
                from_block,
                to_block
            );
        }

        Ok(stats)
    }
}

/// Apply one range of logs in order. `lookups` replaces the on-chain answers
/// of the previous range.
fn apply_batch(
    indexer: &mut ExchangeIndexer<MemoryStore, BatchResolver>,
    parsed_logs: &[ParsedLog],
    metadata: &FxHashMap<String, Token>,
    lookups: Option<PairLookupTable>,
) -> BatchStats {
    if let Some(table) = lookups {
        *indexer.resolver_mut() = BatchResolver::Onchain(table);
    }

    let mut stats = BatchStats {
        logs: parsed_logs.len(),
        ..Default::default()
    };

    for log in parsed_logs {
        if let Some(amounts) = indexer.apply(log, metadata) {
            if matches!(log, ParsedLog::Swap { .. }) {
                stats.tracked_volume_usd += amounts.tracked_usd;
            }
        }
    }

    stats
}

/// Tokens whose price a `Sync` in this batch will re-derive.
fn priced_tokens(parsed_logs: &[ParsedLog], store: &MemoryStore) -> Vec<String> {
    let mut created: FxHashMap<String, (String, String)> = FxHashMap::default();
    let mut tokens: FxHashSet<String> = FxHashSet::default();

    for log in parsed_logs {
        match log {
            ParsedLog::PairCreated { event, .. } => {
                created.insert(
                    address_id(&event.pair),
                    (address_id(&event.token0), address_id(&event.token1)),
                );
            },
            ParsedLog::Sync { log_address, .. } => {
                if let Some(pair) = store.load_pair(log_address) {
                    tokens.insert(pair.token0);
                    tokens.insert(pair.token1);
                } else if let Some((token0, token1)) = created.get(log_address) {
                    tokens.insert(token0.clone());
                    tokens.insert(token1.clone());
                }
            },
            _ => {},
        }
    }

    let mut tokens: Vec<String> = tokens.into_iter().collect();
    tokens.sort();
    tokens
}
