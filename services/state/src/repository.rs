//! Repository and event-sink seams.
//!
//! Persistence and fan-out live outside the core; these traits are the
//! narrow interfaces the engine calls out through. The in-memory
//! implementations back tests and single-process deployments.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use types::{Asset, DexProtocol, Liquidity, Pool, PoolKey, Trade};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Filter for bulk pool reads.
#[derive(Debug, Clone, Default)]
pub struct PoolFilter {
    /// Match pools containing this asset on either side.
    pub asset_id: Option<u64>,
    pub protocol: Option<DexProtocol>,
}

impl PoolFilter {
    pub fn matches(&self, pool: &Pool) -> bool {
        if let Some(id) = self.asset_id {
            if pool.asset_id_a != Some(id) && pool.asset_id_b != Some(id) {
                return false;
            }
        }
        if let Some(p) = self.protocol {
            if pool.protocol != p {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait PoolRepository: Send + Sync {
    async fn get_pool(
        &self,
        address: &str,
        app_id: u64,
        protocol: DexProtocol,
    ) -> Result<Option<Pool>, StoreError>;

    /// Returns true when the write created or replaced a record.
    async fn store_pool(&self, pool: &Pool) -> Result<bool, StoreError>;

    async fn get_pools(&self, filter: &PoolFilter) -> Result<Vec<Pool>, StoreError>;
}

#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn get_asset(&self, id: u64) -> Result<Option<Asset>, StoreError>;
    async fn set_asset(&self, asset: &Asset) -> Result<(), StoreError>;
}

/// Called once per emitted record; implementations may batch, persist,
/// or publish.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn register_trade(&self, trade: &Trade) -> Result<(), StoreError>;
    async fn register_liquidity(&self, liquidity: &Liquidity) -> Result<(), StoreError>;
}

/// DashMap-backed pool store.
#[derive(Default)]
pub struct InMemoryPoolRepository {
    pools: DashMap<PoolKey, Pool>,
}

impl InMemoryPoolRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[async_trait]
impl PoolRepository for InMemoryPoolRepository {
    async fn get_pool(
        &self,
        address: &str,
        app_id: u64,
        protocol: DexProtocol,
    ) -> Result<Option<Pool>, StoreError> {
        let key = PoolKey {
            address: address.to_string(),
            app_id,
            protocol,
        };
        Ok(self.pools.get(&key).map(|p| p.clone()))
    }

    async fn store_pool(&self, pool: &Pool) -> Result<bool, StoreError> {
        self.pools.insert(pool.key(), pool.clone());
        Ok(true)
    }

    async fn get_pools(&self, filter: &PoolFilter) -> Result<Vec<Pool>, StoreError> {
        Ok(self
            .pools
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// DashMap-backed asset store.
#[derive(Default)]
pub struct InMemoryAssetRepository {
    assets: DashMap<u64, Asset>,
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn get_asset(&self, id: u64) -> Result<Option<Asset>, StoreError> {
        Ok(self.assets.get(&id).map(|a| a.clone()))
    }

    async fn set_asset(&self, asset: &Asset) -> Result<(), StoreError> {
        self.assets.insert(asset.index, asset.clone());
        Ok(())
    }
}

/// Sink that records every event it sees, for tests and replay tooling.
#[derive(Default)]
pub struct RecordingSink {
    pub trades: Mutex<Vec<Trade>>,
    pub liquidity: Mutex<Vec<Liquidity>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn register_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        self.trades.lock().push(trade.clone());
        Ok(())
    }

    async fn register_liquidity(&self, liquidity: &Liquidity) -> Result<(), StoreError> {
        self.liquidity.lock().push(liquidity.clone());
        Ok(())
    }
}
