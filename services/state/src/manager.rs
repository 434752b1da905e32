//! Pool state manager.
//!
//! Owns the live pool map: an upsert keyed by pool identity
//! (address + app id + protocol) with the monotonic-timestamp check as
//! the sole consistency guard. Mutation is per-pool-key exclusive; the
//! oracle and aggregation read a snapshot instead of locking pools.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use types::pool::update_allowed;
use types::{AmmType, Liquidity, Pool, PoolKey, Trade};

/// Result of offering an event to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Pool state was created or updated.
    Applied,
    /// Event was older than the pool's stored timestamp.
    SkippedStale,
    /// Event came from an unconfirmed transaction.
    SkippedPending,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ManagerStats {
    pub total_pools: usize,
    pub old_amm_pools: usize,
    pub clamm_pools: usize,
    pub stableswap_pools: usize,
    pub events_applied: u64,
    pub events_skipped: u64,
}

/// Manages state for all pools.
#[derive(Default)]
pub struct PoolStateManager {
    pools: DashMap<PoolKey, Arc<RwLock<Pool>>>,
    stats: Arc<RwLock<ManagerStats>>,
}

impl PoolStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn stats(&self) -> ManagerStats {
        self.stats.read().clone()
    }

    /// Current state of one pool, cloned out of the map.
    pub fn get(&self, key: &PoolKey) -> Option<Pool> {
        self.pools.get(key).map(|entry| entry.value().read().clone())
    }

    /// Consistent copy of every pool, for the oracle and aggregation.
    pub fn snapshot(&self) -> Vec<Pool> {
        self.pools
            .iter()
            .map(|entry| entry.value().read().clone())
            .collect()
    }

    /// Fold a trade's post-state into its pool. Creates the pool on
    /// first sighting.
    pub fn apply_trade(&self, trade: &Trade) -> ApplyOutcome {
        if trade.state == types::TxState::Pending {
            self.note_skipped();
            return ApplyOutcome::SkippedPending;
        }
        let key = PoolKey {
            address: trade.pool_address.clone(),
            app_id: trade.pool_app_id,
            protocol: trade.protocol,
        };
        let entry = self
            .pools
            .entry(key)
            .or_insert_with(|| {
                let pool = Pool::from_trade(trade);
                self.note_created(pool.amm_type);
                Arc::new(RwLock::new(pool))
            })
            .clone();
        let mut pool = entry.write();
        if !update_allowed(pool.timestamp, trade.timestamp, trade.state) {
            drop(pool);
            self.note_skipped();
            debug!(tx_id = %trade.tx_id, "dropping stale trade");
            return ApplyOutcome::SkippedStale;
        }
        pool.apply_trade(trade);
        drop(pool);
        self.note_applied();
        ApplyOutcome::Applied
    }

    /// Fold a liquidity event's post-state into its pool.
    pub fn apply_liquidity(&self, liq: &Liquidity) -> ApplyOutcome {
        if liq.state == types::TxState::Pending {
            self.note_skipped();
            return ApplyOutcome::SkippedPending;
        }
        let key = PoolKey {
            address: liq.pool_address.clone(),
            app_id: liq.pool_app_id,
            protocol: liq.protocol,
        };
        let entry = self
            .pools
            .entry(key)
            .or_insert_with(|| {
                let pool = Pool::from_liquidity(liq);
                self.note_created(pool.amm_type);
                Arc::new(RwLock::new(pool))
            })
            .clone();
        let mut pool = entry.write();
        if !update_allowed(pool.timestamp, liq.timestamp, liq.state) {
            drop(pool);
            self.note_skipped();
            debug!(tx_id = %liq.tx_id, "dropping stale liquidity event");
            return ApplyOutcome::SkippedStale;
        }
        pool.apply_liquidity(liq);
        drop(pool);
        self.note_applied();
        ApplyOutcome::Applied
    }

    /// Replace a pool's full state from an on-chain refresh. The same
    /// monotonic gate applies; refreshes carry `Confirmed` semantics.
    pub fn upsert_pool(&self, incoming: Pool) -> ApplyOutcome {
        let entry = self
            .pools
            .entry(incoming.key())
            .or_insert_with(|| {
                self.note_created(incoming.amm_type);
                Arc::new(RwLock::new(incoming.clone()))
            })
            .clone();
        let mut pool = entry.write();
        if incoming.timestamp < pool.timestamp {
            drop(pool);
            self.note_skipped();
            return ApplyOutcome::SkippedStale;
        }
        *pool = incoming;
        drop(pool);
        self.note_applied();
        ApplyOutcome::Applied
    }

    /// Write back oracle-derived USD TVL onto a pool without touching
    /// its reserve state or timestamp.
    pub fn set_pool_tvl(&self, key: &PoolKey, tvl_a_usd: Option<rust_decimal::Decimal>, tvl_b_usd: Option<rust_decimal::Decimal>) {
        if let Some(entry) = self.pools.get(key) {
            let mut pool = entry.value().write();
            pool.tvl_a_usd = tvl_a_usd;
            pool.tvl_b_usd = tvl_b_usd;
        }
    }

    fn note_created(&self, amm_type: AmmType) {
        let mut stats = self.stats.write();
        stats.total_pools += 1;
        match amm_type {
            AmmType::OldAmm => stats.old_amm_pools += 1,
            AmmType::ConcentratedLiquidity => stats.clamm_pools += 1,
            AmmType::StableSwap => stats.stableswap_pools += 1,
        }
    }

    fn note_applied(&self) {
        self.stats.write().events_applied += 1;
    }

    fn note_skipped(&self) {
        self.stats.write().events_skipped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use types::{DexProtocol, TxState};

    fn trade_at(ts_offset: i64, state: TxState) -> Trade {
        Trade {
            asset_in_id: 0,
            asset_out_id: 10,
            amount_in: 100,
            amount_out: 200,
            pool_address: "POOL".into(),
            pool_app_id: 5,
            protocol: DexProtocol::Pact,
            tx_id: format!("TX{ts_offset}"),
            top_tx_id: "TOP".into(),
            block_id: 1,
            timestamp: Utc.timestamp_opt(1_700_000_000 + ts_offset, 0).unwrap(),
            trader: "TRADER".into(),
            state,
            a: 1000 + ts_offset as u64,
            b: 2000,
            l: 1400,
            af: None,
            bf: None,
            value_usd: None,
            price_usd: None,
            fees_usd: None,
            fees_usd_provider: None,
            fees_usd_protocol: None,
        }
    }

    #[test]
    fn first_confirmed_trade_creates_pool() {
        let mgr = PoolStateManager::new();
        assert_eq!(mgr.apply_trade(&trade_at(0, TxState::Confirmed)), ApplyOutcome::Applied);
        assert_eq!(mgr.len(), 1);
        let pool = mgr.snapshot().pop().unwrap();
        assert_eq!(pool.a, Some(1000));
        assert_eq!(pool.asset_id_a, Some(0));
    }

    #[test]
    fn stale_and_pending_events_never_regress_state() {
        let mgr = PoolStateManager::new();
        mgr.apply_trade(&trade_at(100, TxState::Confirmed));

        assert_eq!(
            mgr.apply_trade(&trade_at(50, TxState::Confirmed)),
            ApplyOutcome::SkippedStale
        );
        assert_eq!(
            mgr.apply_trade(&trade_at(200, TxState::Pending)),
            ApplyOutcome::SkippedPending
        );

        let pool = mgr.snapshot().pop().unwrap();
        assert_eq!(pool.a, Some(1100));
        let stats = mgr.stats();
        assert_eq!(stats.events_applied, 1);
        assert_eq!(stats.events_skipped, 2);
    }

    #[test]
    fn equal_timestamp_update_is_allowed() {
        let mgr = PoolStateManager::new();
        mgr.apply_trade(&trade_at(100, TxState::Confirmed));
        let mut same_ts = trade_at(100, TxState::Confirmed);
        same_ts.a = 7777;
        assert_eq!(mgr.apply_trade(&same_ts), ApplyOutcome::Applied);
        assert_eq!(mgr.snapshot().pop().unwrap().a, Some(7777));
    }

    #[test]
    fn upsert_respects_monotonic_gate() {
        let mgr = PoolStateManager::new();
        mgr.apply_trade(&trade_at(100, TxState::Confirmed));
        let key = PoolKey {
            address: "POOL".into(),
            app_id: 5,
            protocol: DexProtocol::Pact,
        };
        let mut refreshed = mgr.get(&key).unwrap();
        refreshed.timestamp = refreshed.timestamp - Duration::seconds(30);
        refreshed.a = Some(1);
        assert_eq!(mgr.upsert_pool(refreshed), ApplyOutcome::SkippedStale);
        assert_eq!(mgr.get(&key).unwrap().a, Some(1100));
    }
}
