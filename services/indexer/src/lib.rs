//! Transaction Indexer
//!
//! Reconstructs DEX domain events from decoded transaction groups:
//! the walker dispatches app calls by selector to per-protocol
//! processors, the block runner drives groups with bounded parallelism,
//! applies the resulting events to pool state, and back-fills USD
//! valuations once the price oracle has run.

pub mod config;
pub mod processors;
pub mod registry;
pub mod runner;
pub mod walker;
pub mod window;

pub use config::RunnerConfig;
pub use processors::{LiquidityProcessor, PoolRefresher, SwapProcessor};
pub use registry::ProcessorRegistry;
pub use runner::{BlockRunner, BlockSummary, MemoryGauge, RunnerError, TxGroup};
pub use walker::{TransactionWalker, WalkOutcome};
pub use window::TxWindow;
