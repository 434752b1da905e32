//! Decoded AVM transaction model.
//!
//! The engine assumes a decoded transaction stream: transaction fields,
//! inner-transaction trees, group digests, and key/value state deltas are
//! given, not parsed from raw bytes. This module is the walker's input
//! surface.

use crate::error::TypeError;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction kind, reduced to the variants the walker cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Payment,
    AssetTransfer,
    AppCall,
    Other,
}

/// Native-asset payment payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentFields {
    pub receiver: String,
    pub amount: u64,
}

/// Asset transfer payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetTransferFields {
    pub receiver: String,
    pub asset_id: u64,
    pub amount: u64,
}

/// A single key/value write recorded by the chain for an app call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Uint(u64),
    Bytes(Vec<u8>),
}

impl StateValue {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            StateValue::Uint(v) => Some(*v),
            StateValue::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StateValue::Bytes(b) => Some(b),
            StateValue::Uint(_) => None,
        }
    }
}

/// Key/value state delta. Keys arrive as raw bytes; indexers commonly
/// ship them base64 encoded, so lookups try both spellings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDelta {
    pub entries: Vec<(Vec<u8>, StateValue)>,
}

impl StateDelta {
    pub fn new(entries: Vec<(Vec<u8>, StateValue)>) -> Self {
        Self { entries }
    }

    /// Look up a key, accepting either the raw spelling or its base64
    /// encoding.
    pub fn get(&self, key: &[u8]) -> Option<&StateValue> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(key);
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key || k.as_slice() == encoded.as_bytes())
            .map(|(_, v)| v)
    }

    /// Plain unsigned integer under `key`, or `None` when absent or not
    /// a uint. Absence must stay observable: substituting zero would
    /// silently corrupt AMM math downstream.
    pub fn get_uint(&self, key: &[u8]) -> Option<u64> {
        self.get(key).and_then(StateValue::as_uint)
    }

    /// 256-bit big-endian byte value under `key`, reduced to its low 64
    /// bits.
    pub fn get_uint256(&self, key: &[u8]) -> Option<u64> {
        self.get(key)
            .and_then(StateValue::as_bytes)
            .and_then(|b| uint256_to_u64(b).ok())
    }
}

/// Application-call payload with its recorded state deltas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppCallFields {
    pub app_id: u64,
    pub app_args: Vec<Vec<u8>>,
    pub accounts: Vec<String>,
    pub foreign_assets: Vec<u64>,
    pub global_state_delta: StateDelta,
    /// Local-state deltas keyed per account address.
    pub local_state_delta: Vec<(String, StateDelta)>,
}

impl AppCallFields {
    /// First app argument, the method selector used for processor
    /// dispatch.
    pub fn selector(&self) -> Option<&[u8]> {
        self.app_args.first().map(|a| a.as_slice())
    }

    /// Local-state delta recorded for `account`, if any.
    pub fn local_delta(&self, account: &str) -> Option<&StateDelta> {
        self.local_state_delta
            .iter()
            .find(|(addr, _)| addr == account)
            .map(|(_, d)| d)
    }
}

/// One decoded transaction, possibly carrying a tree of inner
/// transactions recorded by the chain for that call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: String,
    pub tx_type: TxType,
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_transfer: Option<AssetTransferFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_call: Option<AppCallFields>,
    #[serde(default)]
    pub inner_txns: Vec<Transaction>,
}

impl Transaction {
    /// Unified `(receiver, asset_id, amount)` view over payments and
    /// asset transfers. `None` for app calls and other kinds.
    pub fn receiver_and_amount(&self) -> Option<(&str, u64, u64)> {
        match self.tx_type {
            TxType::Payment => self
                .payment
                .as_ref()
                .map(|p| (p.receiver.as_str(), crate::NATIVE_ASSET_ID, p.amount)),
            TxType::AssetTransfer => self
                .asset_transfer
                .as_ref()
                .map(|t| (t.receiver.as_str(), t.asset_id, t.amount)),
            _ => None,
        }
    }

    /// True when this transaction moves value (payment or asset
    /// transfer) into `address`.
    pub fn pays_into(&self, address: &str) -> bool {
        matches!(self.receiver_and_amount(), Some((recv, _, _)) if recv == address)
    }
}

/// Block-level context forwarded to every processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockContext {
    pub block_id: u64,
    pub timestamp: DateTime<Utc>,
}

/// Interpret the trailing 8 bytes of a 256-bit big-endian byte string as
/// a `u64`. Values may arrive base64 encoded; that spelling is tried
/// first when the payload is not already 32 raw bytes.
pub fn uint256_to_u64(bytes: &[u8]) -> Result<u64, TypeError> {
    let decoded;
    let raw: &[u8] = if bytes.len() == 32 {
        bytes
    } else {
        decoded = base64::engine::general_purpose::STANDARD
            .decode(bytes)
            .map_err(|_| TypeError::MalformedUint256 { len: bytes.len() })?;
        &decoded
    };
    if raw.len() < 8 {
        return Err(TypeError::MalformedUint256 { len: raw.len() });
    }
    let tail: [u8; 8] = raw[raw.len() - 8..]
        .try_into()
        .map_err(|_| TypeError::MalformedUint256 { len: raw.len() })?;
    Ok(u64::from_be_bytes(tail))
}
