//! Protocol and transaction-state enums shared across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported DEX protocols. Each protocol has its own on-chain call
/// encoding and state-key naming; the indexer registers one swap and one
/// liquidity processor per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DexProtocol {
    /// Constant-product AMM keeping reserves in the pool account's
    /// local state (plain uints).
    TinymanV1,
    /// Constant-product / stableswap AMM keeping reserves in global
    /// state under single-letter keys (plain uints).
    Pact,
    /// Concentrated-liquidity AMM packing reserves as 256-bit
    /// big-endian byte strings in global state.
    BiatecClamm,
}

impl DexProtocol {
    /// The protocol whose transaction shape is close enough to be worth
    /// retrying when this protocol's processor fails to match a pool
    /// refresh. Observed in production between Tinyman and Pact.
    pub fn fallback(&self) -> Option<DexProtocol> {
        match self {
            DexProtocol::TinymanV1 => Some(DexProtocol::Pact),
            DexProtocol::Pact => Some(DexProtocol::TinymanV1),
            DexProtocol::BiatecClamm => None,
        }
    }
}

impl fmt::Display for DexProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DexProtocol::TinymanV1 => write!(f, "tinymanv1"),
            DexProtocol::Pact => write!(f, "pact"),
            DexProtocol::BiatecClamm => write!(f, "biatecclamm"),
        }
    }
}

/// Confirmation state of the transaction an event was reconstructed from.
///
/// Pending events come from gossiped (unconfirmed) groups and may lack
/// inner transactions; they are emitted to sinks but never mutate pool
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxState {
    Pending,
    Confirmed,
}
