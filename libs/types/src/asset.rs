//! Asset-level price and TVL summary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// USD valuation of one asset, recomputed from the pool snapshot.
/// Asset 0 is the chain's native asset and always exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Asset id (0 = native asset).
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<Decimal>,
    /// Trusted-side-only TVL across every pool containing this asset.
    pub tvl_usd: Decimal,
    /// Both-sides TVL across the same pools.
    pub total_tvl_usd: Decimal,
    pub timestamp: DateTime<Utc>,
}
