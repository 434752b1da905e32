//! Pair-level reduction of all pools sharing an ordered asset pair.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reduction of every pool trading the ordered pair
/// `(asset_id_a, asset_id_b)`. Directional: `(X, Y)` and `(Y, X)` are
/// distinct aggregates related by `Pool::reverse()`. Fully recomputed
/// whenever the contributing pool set changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedPool {
    pub asset_id_a: u64,
    pub asset_id_b: u64,

    /// Virtual reserves summed over pools whose counter side is a
    /// trusted asset.
    pub virtual_a_level1: Decimal,
    pub virtual_b_level1: Decimal,
    /// Virtual reserves summed over every qualifying pool of the pair.
    pub virtual_a_level2: Decimal,
    pub virtual_b_level2: Decimal,

    /// Decimal-adjusted raw reserves summed over every qualifying pool.
    pub real_a: Decimal,
    pub real_b: Decimal,

    /// TVL per side: identical to the real-reserve sums, kept as named
    /// fields because downstream consumers read them independently.
    pub tvl_a: Decimal,
    pub tvl_b: Decimal,

    pub pool_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl AggregatedPool {
    /// Identity string used as the document key downstream.
    pub fn id(&self) -> String {
        format!("{}-{}", self.asset_id_a, self.asset_id_b)
    }
}
