//! Trade record: one executed swap reconstructed from a transaction
//! group.

use crate::protocol::{DexProtocol, TxState};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One executed swap. Immutable once constructed; the USD fields are
/// filled in by the enrichment step after the price oracle runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Asset paid into the pool (0 = native asset).
    pub asset_in_id: u64,
    /// Asset received from the pool.
    pub asset_out_id: u64,
    /// Input amount in base units.
    pub amount_in: u64,
    /// Output amount in base units.
    pub amount_out: u64,
    pub pool_address: String,
    pub pool_app_id: u64,
    pub protocol: DexProtocol,
    pub tx_id: String,
    /// Correlates multi-hop routed trades back to the originating
    /// top-level transaction.
    pub top_tx_id: String,
    pub block_id: u64,
    pub timestamp: DateTime<Utc>,
    pub trader: String,
    pub state: TxState,

    /// Post-trade pool reserve of asset A.
    pub a: u64,
    /// Post-trade pool reserve of asset B.
    pub b: u64,
    /// Post-trade curve liquidity.
    pub l: u64,
    /// Protocol-fee accumulator for side A, where the protocol tracks one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub af: Option<u64>,
    /// Protocol-fee accumulator for side B.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bf: Option<u64>,

    // USD enrichment, filled once the oracle has resolved prices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_usd: Option<Decimal>,
    /// USD price per unit of the canonical base asset
    /// (`min(asset_in_id, asset_out_id)`), so swapping direction never
    /// changes the reported price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees_usd: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees_usd_provider: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees_usd_protocol: Option<Decimal>,
}

impl Trade {
    /// Canonical base asset for direction-independent price reporting.
    pub fn base_asset_id(&self) -> u64 {
        self.asset_in_id.min(self.asset_out_id)
    }

    /// The mirror-image trade (direction swapped). Reserve and USD
    /// fields are carried over unchanged; used by direction-invariance
    /// checks.
    pub fn mirrored(&self) -> Trade {
        let mut t = self.clone();
        std::mem::swap(&mut t.asset_in_id, &mut t.asset_out_id);
        std::mem::swap(&mut t.amount_in, &mut t.amount_out);
        t
    }
}
