//! Liquidity record: one deposit or withdrawal reconstructed from a
//! transaction group.

use crate::protocol::{DexProtocol, TxState};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidityDirection {
    Deposit,
    Withdraw,
}

/// One liquidity deposit/withdraw event. Mirrors [`crate::Trade`] but
/// carries both side amounts and the LP token movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liquidity {
    pub asset_id_a: u64,
    pub asset_id_b: u64,
    pub asset_id_lp: u64,
    pub amount_a: u64,
    pub amount_b: u64,
    pub amount_lp: u64,
    pub direction: LiquidityDirection,
    pub pool_address: String,
    pub pool_app_id: u64,
    pub protocol: DexProtocol,
    pub tx_id: String,
    pub top_tx_id: String,
    pub block_id: u64,
    pub timestamp: DateTime<Utc>,
    pub trader: String,
    pub state: TxState,

    /// Post-event pool reserves.
    pub a: u64,
    pub b: u64,
    pub l: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub af: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bf: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_usd: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<Decimal>,
}
