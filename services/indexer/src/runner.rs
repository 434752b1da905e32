//! Block runner.
//!
//! Drives whole blocks through the walker with bounded parallelism
//! across transaction groups, applies the resulting events to pool
//! state, then recomputes prices and aggregates from a snapshot and
//! publishes the enriched records. A memory-pressure gauge collapses
//! the parallelism to sequential processing, and a watch channel
//! requests shutdown between groups; the monotonic gate in the state
//! manager makes a retried group idempotent.

use crate::config::RunnerConfig;
use crate::registry::ProcessorRegistry;
use crate::walker::{TransactionWalker, WalkOutcome};
use crate::window::TxWindow;
use futures::future::join_all;
use pool_state::oracle::pool_tvl_usd;
use pool_state::{
    aggregate_pools, compute_asset_stats, compute_prices, enrich_liquidity, enrich_trade,
    ApplyOutcome, AssetRepository, EventSink, PoolRepository, PoolStateManager, StoreError,
    TrustConfig,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};
use types::{
    AggregatedPool, BlockContext, DexProtocol, Pool, PoolKey, Transaction, TxState,
};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("group worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("concurrency limiter closed: {0}")]
    Concurrency(#[from] tokio::sync::AcquireError),
}

/// One transaction group as delivered by the chain.
#[derive(Debug, Clone)]
pub struct TxGroup {
    pub digest: Option<String>,
    pub txns: Vec<Transaction>,
}

/// Reports current process memory usage in bytes; injected so the
/// pressure source stays testable.
pub type MemoryGauge = Arc<dyn Fn() -> u64 + Send + Sync>;

#[derive(Debug, Default)]
pub struct BlockSummary {
    pub trades: usize,
    pub liquidity: usize,
    pub pools_stored: usize,
    pub assets_updated: usize,
    pub aggregates: Vec<AggregatedPool>,
    /// Set when shutdown was requested before every group ran.
    pub aborted: bool,
}

pub struct BlockRunner {
    registry: Arc<ProcessorRegistry>,
    walker: TransactionWalker,
    manager: Arc<PoolStateManager>,
    pools: Arc<dyn PoolRepository>,
    assets: Arc<dyn AssetRepository>,
    sink: Arc<dyn EventSink>,
    trust: TrustConfig,
    config: RunnerConfig,
    memory_gauge: MemoryGauge,
    shutdown: watch::Receiver<bool>,
}

impl BlockRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ProcessorRegistry>,
        manager: Arc<PoolStateManager>,
        pools: Arc<dyn PoolRepository>,
        assets: Arc<dyn AssetRepository>,
        sink: Arc<dyn EventSink>,
        trust: TrustConfig,
        config: RunnerConfig,
        memory_gauge: MemoryGauge,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            walker: TransactionWalker::new(registry.clone()),
            registry,
            manager,
            pools,
            assets,
            sink,
            trust,
            config,
            memory_gauge,
            shutdown,
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn concurrency_limit(&self) -> usize {
        let used = (self.memory_gauge)();
        if used >= self.config.memory_pressure_bytes {
            warn!(
                used_bytes = used,
                threshold_bytes = self.config.memory_pressure_bytes,
                "memory pressure: processing groups sequentially"
            );
            1
        } else {
            self.config.max_concurrent_groups.max(1)
        }
    }

    /// Process one block's transaction groups end to end: walk, apply,
    /// price, enrich, publish.
    pub async fn process_block(
        &self,
        block: &BlockContext,
        groups: Vec<TxGroup>,
        tx_state: TxState,
    ) -> Result<BlockSummary, RunnerError> {
        let mut summary = BlockSummary::default();

        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit()));
        let mut handles = Vec::with_capacity(groups.len());
        for group in groups {
            if self.shutdown_requested() {
                summary.aborted = true;
                break;
            }
            let permit = semaphore.clone().acquire_owned().await?;
            let walker = self.walker.clone();
            let block = block.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                walker.walk_group(&group.txns, &block, group.digest.as_deref(), tx_state)
            }));
        }

        let mut outcome = WalkOutcome::default();
        for walked in join_all(handles).await {
            let out = walked?;
            outcome.trades.extend(out.trades);
            outcome.liquidity.extend(out.liquidity);
        }

        // Confirmed events mutate pool state; pending ones are dropped
        // at the gate but still published below.
        for trade in &outcome.trades {
            self.manager.apply_trade(trade);
        }
        for liq in &outcome.liquidity {
            self.manager.apply_liquidity(liq);
        }

        let snapshot = self.manager.snapshot();
        let prices = compute_prices(&snapshot, &self.trust);

        for mut trade in outcome.trades {
            if let Some(pool) = self.pool_for(&trade.pool_address, trade.pool_app_id, trade.protocol) {
                enrich_trade(&mut trade, &pool, &prices);
            }
            self.sink.register_trade(&trade).await?;
            summary.trades += 1;
        }
        for mut liq in outcome.liquidity {
            if let Some(pool) = self.pool_for(&liq.pool_address, liq.pool_app_id, liq.protocol) {
                enrich_liquidity(&mut liq, &pool, &prices);
            }
            self.sink.register_liquidity(&liq).await?;
            summary.liquidity += 1;
        }

        for pool in &snapshot {
            let (tvl_a, tvl_b) = pool_tvl_usd(pool, &prices);
            self.manager.set_pool_tvl(&pool.key(), tvl_a, tvl_b);
        }
        for pool in self.manager.snapshot() {
            self.pools.store_pool(&pool).await?;
            summary.pools_stored += 1;
        }

        let assets = compute_asset_stats(&snapshot, &self.trust, &prices, block.timestamp);
        for asset in &assets {
            self.assets.set_asset(asset).await?;
        }
        summary.assets_updated = assets.len();

        summary.aggregates = aggregate_pools(&snapshot, &self.trust, block.timestamp);

        info!(
            block_id = block.block_id,
            trades = summary.trades,
            liquidity = summary.liquidity,
            pools = summary.pools_stored,
            aborted = summary.aborted,
            "processed block"
        );
        Ok(summary)
    }

    fn pool_for(&self, address: &str, app_id: u64, protocol: DexProtocol) -> Option<Pool> {
        self.manager.get(&PoolKey {
            address: address.to_string(),
            app_id,
            protocol,
        })
    }

    /// Re-derive full pool state from an app call. When the recorded
    /// protocol's refresher does not match, the shape-sharing alternate
    /// is tried before giving up; the pool keeps last-known-good state
    /// on total failure.
    pub fn refresh_pool(&self, win: &TxWindow<'_>, recorded: DexProtocol) -> Option<Pool> {
        if let Some(refresher) = self.registry.refresher(recorded) {
            if let Some(pool) = refresher.refresh(win) {
                return Some(pool);
            }
        }
        if let Some(alternate) = recorded.fallback() {
            if let Some(refresher) = self.registry.refresher(alternate) {
                if let Some(mut pool) = refresher.refresh(win) {
                    debug!(%recorded, %alternate, pool = %pool.pool_address, "pool refresh matched fallback protocol");
                    pool.protocol = alternate;
                    return Some(pool);
                }
            }
        }
        warn!(%recorded, tx_id = %win.current.tx_id, "pool refresh failed for both protocols");
        None
    }

    /// Refresh and fold into the state manager in one step.
    pub fn apply_refresh(&self, win: &TxWindow<'_>, recorded: DexProtocol) -> Option<ApplyOutcome> {
        self.refresh_pool(win, recorded)
            .map(|pool| self.manager.upsert_pool(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::{pact, tinyman};
    use crate::testutil::*;
    use pool_state::{InMemoryAssetRepository, InMemoryPoolRepository, RecordingSink};
    use rust_decimal_macros::dec;

    const USDC: u64 = 31_566_704;

    struct Fixture {
        runner: BlockRunner,
        manager: Arc<PoolStateManager>,
        pools: Arc<InMemoryPoolRepository>,
        assets: Arc<InMemoryAssetRepository>,
        sink: Arc<RecordingSink>,
        shutdown_tx: watch::Sender<bool>,
    }

    fn fixture_with_gauge(gauge: MemoryGauge) -> Fixture {
        let manager = Arc::new(PoolStateManager::new());
        let pools = Arc::new(InMemoryPoolRepository::new());
        let assets = Arc::new(InMemoryAssetRepository::new());
        let sink = Arc::new(RecordingSink::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = BlockRunner::new(
            Arc::new(ProcessorRegistry::standard()),
            manager.clone(),
            pools.clone(),
            assets.clone(),
            sink.clone(),
            TrustConfig::default(),
            RunnerConfig::default(),
            gauge,
            shutdown_rx,
        );
        Fixture { runner, manager, pools, assets, sink, shutdown_tx }
    }

    fn fixture() -> Fixture {
        fixture_with_gauge(Arc::new(|| 0))
    }

    fn usdc_swap_group() -> TxGroup {
        // 1.0 of asset 555 into the pool, 1.9 USDC out; post-trade
        // reserves price 555 near 2 USDC.
        let transfer = axfer("ALICE", "PACTPOOL", 555, 1_000_000);
        let call = appcall("ALICE", 9, pact::SWAP_SELECTOR)
            .inner(axfer("PACTPOOL", "ALICE", USDC, 1_900_000))
            .global(&[(b"A", 1_000_000), (b"B", 2_000_000), (b"L", 1_400_000)])
            .build();
        TxGroup { digest: Some("G1".into()), txns: vec![transfer, call] }
    }

    #[tokio::test]
    async fn block_flow_applies_prices_and_publishes() {
        let f = fixture();
        let block = block_at(1_700_000_000);

        let summary = f
            .runner
            .process_block(&block, vec![usdc_swap_group()], TxState::Confirmed)
            .await
            .unwrap();

        assert_eq!(summary.trades, 1);
        assert_eq!(summary.pools_stored, 1);
        assert!(!summary.aborted);
        assert_eq!(f.manager.len(), 1);

        // Published trade carries USD enrichment from the oracle pass.
        let trades = f.sink.trades.lock();
        assert_eq!(trades.len(), 1);
        assert!(trades[0].value_usd.is_some());
        assert_eq!(trades[0].price_usd, Some(dec!(1.9)));
        drop(trades);

        // Asset 555 got priced off the post-trade reserves.
        let asset = f.assets.get_asset(555).await.unwrap().unwrap();
        assert_eq!(asset.price_usd, Some(dec!(2)));

        // Both directional aggregates exist for the pair.
        assert_eq!(summary.aggregates.len(), 2);
        assert!(f.pools.len() == 1);
    }

    #[tokio::test]
    async fn pending_groups_publish_but_never_touch_pool_state() {
        let f = fixture();
        let block = block_at(1_700_000_000);

        let transfer = axfer("ALICE", "PACTPOOL", 555, 1_000_000);
        let stub = appcall("ALICE", 9, pact::SWAP_SELECTOR).foreign(&[USDC]).build();
        let group = TxGroup { digest: None, txns: vec![transfer, stub] };

        let summary = f
            .runner
            .process_block(&block, vec![group], TxState::Pending)
            .await
            .unwrap();
        assert_eq!(summary.trades, 1);
        assert_eq!(f.manager.len(), 0);
        assert_eq!(f.sink.trades.lock().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_aborts_before_walking_groups() {
        let f = fixture();
        f.shutdown_tx.send(true).unwrap();
        let block = block_at(1_700_000_000);

        let summary = f
            .runner
            .process_block(&block, vec![usdc_swap_group()], TxState::Confirmed)
            .await
            .unwrap();
        assert!(summary.aborted);
        assert_eq!(summary.trades, 0);
        assert_eq!(f.manager.len(), 0);
    }

    #[tokio::test]
    async fn memory_pressure_still_processes_sequentially() {
        let f = fixture_with_gauge(Arc::new(|| u64::MAX));
        let block = block_at(1_700_000_000);

        let summary = f
            .runner
            .process_block(&block, vec![usdc_swap_group()], TxState::Confirmed)
            .await
            .unwrap();
        assert_eq!(summary.trades, 1);
    }

    #[tokio::test]
    async fn refresh_falls_back_between_shape_sharing_protocols() {
        let f = fixture();
        let block = block_at(1_700_000_000);

        // A Pact-shaped call: global A/B/L, no Tinyman local state. The
        // pool is recorded as Tinyman, so the first refresh attempt
        // misses and the fallback succeeds.
        let transfer = pay("BOB", "PACTPOOL", 1);
        let call = appcall("BOB", 9, pact::SWAP_SELECTOR)
            .foreign(&[31])
            .global(&[(b"A", 10), (b"B", 20), (b"L", 14)])
            .build();
        let win = window(&call, Some(&transfer), None, &block, TxState::Confirmed);

        let pool = f.runner.refresh_pool(&win, DexProtocol::TinymanV1).unwrap();
        assert_eq!(pool.protocol, DexProtocol::Pact);
        assert_eq!(pool.a, Some(10));

        // A call matching neither shape refreshes nothing.
        let empty = appcall("BOB", 9, tinyman::SWAP_SELECTOR).build();
        let win = window(&empty, Some(&transfer), None, &block, TxState::Confirmed);
        assert!(f.runner.refresh_pool(&win, DexProtocol::TinymanV1).is_none());
    }
}
