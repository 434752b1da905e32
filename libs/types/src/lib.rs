//! # AVM DEX Core Types
//!
//! Unified type system for the DEX event-reconstruction engine: the
//! decoded AVM transaction model consumed by the walker, and the domain
//! records (Trade, Liquidity, Pool, AggregatedPool, Asset) it produces.
//!
//! Records serialize as flat JSON objects with stable snake_case field
//! names; numeric ids and base-unit amounts are unsigned 64-bit, derived
//! USD values use `rust_decimal::Decimal`, timestamps are ISO-8601 UTC.

pub mod aggregated;
pub mod asset;
pub mod error;
pub mod liquidity;
pub mod pool;
pub mod protocol;
pub mod trade;
pub mod transaction;

pub use aggregated::AggregatedPool;
pub use asset::Asset;
pub use error::TypeError;
pub use liquidity::{Liquidity, LiquidityDirection};
pub use pool::{AmmType, Pool, PoolKey};
pub use protocol::{DexProtocol, TxState};
pub use trade::Trade;
pub use transaction::{
    uint256_to_u64, AppCallFields, AssetTransferFields, BlockContext, PaymentFields, StateDelta,
    StateValue, Transaction, TxType,
};

/// The chain's native asset id. Always priced and always present.
pub const NATIVE_ASSET_ID: u64 = 0;
