//! Pool State, Pricing, and Aggregation
//!
//! Folds Trade/Liquidity records and pool refreshes into per-pool state
//! (gated by the monotonic-timestamp rule), derives USD prices for every
//! asset reachable from the trusted reference set, and reduces pools
//! sharing an asset pair into pair-level aggregates.
//!
//! The pricing and aggregation entry points are pure functions of a pool
//! snapshot plus the trust configuration; they are idempotent and safe to
//! re-run concurrently for different asset pairs.

pub mod aggregation;
pub mod enrich;
pub mod manager;
pub mod oracle;
pub mod repository;

pub use aggregation::aggregate_pools;
pub use enrich::{enrich_liquidity, enrich_trade};
pub use manager::{ApplyOutcome, ManagerStats, PoolStateManager};
pub use oracle::{compute_asset_stats, compute_prices, pool_tvl_usd, TrustConfig, TrustedAsset};
pub use repository::{
    AssetRepository, EventSink, InMemoryAssetRepository, InMemoryPoolRepository, PoolFilter,
    PoolRepository, RecordingSink, StoreError,
};
