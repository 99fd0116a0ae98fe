use std::{future::Future, sync::Arc};

use anyhow::{anyhow, Context};
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use pricebook::{
    pricing::PairRegistry, worker::ExchangeIndexer, ChainWorker, DeploymentProfile, Settings,
    Snapshot,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    let level: LevelFilter = settings
        .indexer
        .log_level
        .parse()
        .with_context(|| format!("Invalid log level: {}", settings.indexer.log_level))?;

    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to install logger")?;

    let profile = Arc::new(
        settings
            .deployment_profile()
            .context("Invalid deployment configuration")?,
    );

    info!(
        "Deployment {}: {} canonical stable pools, {} whitelisted tokens, min liquidity {} native",
        profile.network,
        profile.canonical_stable_pools.len(),
        profile.whitelist.len(),
        profile.min_liquidity_native
    );

    if settings.indexer.rpc_url.is_none() {
        return refresh_offline(&settings, profile);
    }

    run_indexer(&settings, profile).await
}

/// Re-price an existing snapshot without touching the chain.
fn refresh_offline(settings: &Settings, profile: Arc<DeploymentProfile>) -> anyhow::Result<()> {
    let path = &settings.indexer.snapshot_path;
    let snapshot = Snapshot::load(path)?
        .with_context(|| format!("No rpc_url configured and no snapshot at {path}"))?;

    if snapshot.network != profile.network {
        anyhow::bail!(
            "Snapshot {} belongs to {}, not {}",
            path,
            snapshot.network,
            profile.network
        );
    }

    let last_block = snapshot.last_block;
    let store = snapshot.into_store();
    let registry = PairRegistry::from_pairs(store.pairs());

    let mut indexer = ExchangeIndexer::new(profile.clone(), store, registry);
    let summary = indexer.refresh_prices();

    Snapshot::from_store(&profile.network, last_block, indexer.store()).save(path)?;

    info!(
        "Re-priced {}: native price ${} USD, {} tokens priced, {} unpriced",
        profile.network, summary.native_price_usd, summary.priced_tokens, summary.unpriced_tokens
    );

    Ok(())
}

async fn run_indexer(settings: &Settings, profile: Arc<DeploymentProfile>) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    let worker = ChainWorker::new(&settings.indexer, profile.clone())
        .context("Failed to create chain worker")?;

    let worker_token = cancellation_token.child_token();
    let worker_handle = tokio::spawn(async move { worker.run(worker_token).await });

    let shutdown = shutdown_signal()?;

    info!("Indexer for {} running. Press Ctrl+C to stop.", profile.network);

    supervise(worker_handle, shutdown, cancellation_token).await
}

/// Resolves on Ctrl+C or SIGTERM. Handlers are installed before returning.
#[cfg(unix)]
fn shutdown_signal() -> anyhow::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm_stream = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    Ok(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> anyhow::Result<impl Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
    })
}

/// Wait for `shutdown` or for the worker to stop on its own, whichever comes
/// first. A worker that stops before shutdown is an error.
async fn supervise(
    mut worker_handle: JoinHandle<anyhow::Result<()>>,
    shutdown: impl Future<Output = ()>,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    tokio::select! {
        _ = shutdown => {},
        res = &mut worker_handle => {
            cancellation_token.cancel();
            return match res {
                Ok(Ok(())) => Err(anyhow!("Chain worker stopped unexpectedly")),
                Ok(Err(e)) => {
                    error!("Chain worker failed: {:#}", e);
                    Err(e.context("Chain worker failed"))
                },
                Err(e) => Err(anyhow!("Chain worker task aborted: {}", e)),
            };
        },
    };

    cancellation_token.cancel();

    info!("Waiting for chain worker to stop...");
    match worker_handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.context("Chain worker failed during shutdown")),
        Err(e) => Err(anyhow!("Chain worker task aborted: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_supervise_fails_when_worker_errors() {
        let handle = tokio::spawn(async { Err(anyhow!("getLogs failed")) });
        let result = supervise(handle, std::future::pending(), CancellationToken::new()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_supervise_fails_when_worker_returns_early() {
        let handle = tokio::spawn(async { Ok(()) });
        let token = CancellationToken::new();
        let result = supervise(handle, std::future::pending(), token.clone()).await;

        assert!(result.is_err());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_supervise_stops_worker_on_shutdown() {
        let token = CancellationToken::new();
        let worker_token = token.child_token();
        let handle = tokio::spawn(async move {
            worker_token.cancelled().await;
            Ok(())
        });

        assert!(supervise(handle, async {}, token).await.is_ok());
    }
}
