//! Transaction walker.
//!
//! Converts one transaction group into Trade/Liquidity records:
//! maintains the 2-transaction lookback window at each recursion level,
//! dispatches app calls to the processor registered under their leading
//! argument, and recurses depth-first into inner transactions carrying
//! the originating transaction's identity. The walk itself is pure; a
//! separate entry point forwards the collected records to an event sink.

use crate::registry::ProcessorRegistry;
use crate::window::TxWindow;
use pool_state::{EventSink, StoreError};
use std::sync::Arc;
use tracing::{debug, trace};
use types::{BlockContext, Liquidity, Trade, Transaction, TxState};

/// Records collected from one walk, in emission order. No per-pool
/// grouping is guaranteed; callers group by pool identity themselves.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub trades: Vec<Trade>,
    pub liquidity: Vec<Liquidity>,
}

impl WalkOutcome {
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty() && self.liquidity.is_empty()
    }
}

#[derive(Clone)]
pub struct TransactionWalker {
    registry: Arc<ProcessorRegistry>,
}

impl TransactionWalker {
    pub fn new(registry: Arc<ProcessorRegistry>) -> Self {
        Self { registry }
    }

    /// Walk one group and collect every record it yields.
    pub fn walk_group(
        &self,
        txns: &[Transaction],
        block: &BlockContext,
        group_digest: Option<&str>,
        tx_state: TxState,
    ) -> WalkOutcome {
        let mut out = WalkOutcome::default();
        let mut previous1: Option<&Transaction> = None;
        let mut previous2: Option<&Transaction> = None;
        for tx in txns {
            self.visit(
                tx,
                previous1,
                previous2,
                block,
                group_digest,
                &tx.tx_id,
                &tx.sender,
                tx_state,
                &mut out,
            );
            previous2 = previous1;
            previous1 = Some(tx);
        }
        if !out.is_empty() {
            debug!(
                block_id = block.block_id,
                trades = out.trades.len(),
                liquidity = out.liquidity.len(),
                "walked transaction group"
            );
        }
        out
    }

    /// Walk one group and forward every record to `sink`.
    pub async fn emit_group(
        &self,
        txns: &[Transaction],
        block: &BlockContext,
        group_digest: Option<&str>,
        tx_state: TxState,
        sink: &dyn EventSink,
    ) -> Result<WalkOutcome, StoreError> {
        let out = self.walk_group(txns, block, group_digest, tx_state);
        for trade in &out.trades {
            sink.register_trade(trade).await?;
        }
        for liq in &out.liquidity {
            sink.register_liquidity(liq).await?;
        }
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn visit(
        &self,
        current: &Transaction,
        previous1: Option<&Transaction>,
        previous2: Option<&Transaction>,
        block: &BlockContext,
        group_digest: Option<&str>,
        top_tx_id: &str,
        trader: &str,
        tx_state: TxState,
        out: &mut WalkOutcome,
    ) {
        if let Some(selector) = current.app_call.as_ref().and_then(|a| a.selector()) {
            let win = TxWindow {
                current,
                previous1,
                previous2,
                block,
                group_digest,
                top_tx_id,
                trader,
                tx_state,
            };
            if let Some(processor) = self.registry.swap(selector) {
                if let Some(trade) = processor.process(&win) {
                    trace!(tx_id = %trade.tx_id, protocol = %trade.protocol, "matched swap");
                    out.trades.push(trade);
                }
            } else if let Some(processor) = self.registry.liquidity(selector) {
                if let Some(liq) = processor.process(&win) {
                    trace!(tx_id = %liq.tx_id, protocol = %liq.protocol, "matched liquidity event");
                    out.liquidity.push(liq);
                }
            }
        }

        // Inner transactions form their own window level; identity
        // carries down from the top-level transaction.
        let mut previous1: Option<&Transaction> = None;
        let mut previous2: Option<&Transaction> = None;
        for inner in &current.inner_txns {
            self.visit(
                inner,
                previous1,
                previous2,
                block,
                group_digest,
                top_tx_id,
                trader,
                tx_state,
                out,
            );
            previous2 = previous1;
            previous1 = Some(inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::{pact, tinyman};
    use crate::testutil::*;

    fn walker() -> TransactionWalker {
        TransactionWalker::new(Arc::new(ProcessorRegistry::standard()))
    }

    #[test]
    fn group_walk_matches_swap_after_transfer() {
        let transfer = axfer("ALICE", "POOL", 10, 1_000_000);
        let call = appcall("ALICE", 7, tinyman::SWAP_SELECTOR)
            .inner(pay("POOL", "ALICE", 4_000_000))
            .local("POOL", &[(b"s1", 50), (b"s2", 200), (b"ilt", 100)])
            .build();
        let block = block_at(1_700_000_000);

        let out = walker().walk_group(
            &[transfer, call],
            &block,
            Some("GROUP1"),
            TxState::Confirmed,
        );
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.liquidity.len(), 0);
        assert_eq!(out.trades[0].amount_out, 4_000_000);
    }

    #[test]
    fn unknown_selectors_and_mismatches_emit_nothing() {
        let transfer = axfer("ALICE", "POOL", 10, 1_000_000);
        let bootstrap = appcall("ALICE", 7, b"bootstrap").build();
        // Known selector, but no funding transfer before it.
        let orphan_swap = appcall("ALICE", 7, tinyman::SWAP_SELECTOR)
            .inner(pay("POOL", "ALICE", 1))
            .local("POOL", &[(b"s1", 1), (b"s2", 2), (b"ilt", 3)])
            .build();
        let block = block_at(1_700_000_000);

        let out = walker().walk_group(&[bootstrap, orphan_swap, transfer], &block, None, TxState::Confirmed);
        assert!(out.is_empty());
    }

    #[test]
    fn inner_transactions_are_walked_with_top_level_identity() {
        // A router app call whose inner group performs a Pact swap.
        let inner_transfer = pay("ROUTERAPP", "PACTPOOL", 500_000);
        let inner_swap = appcall("ROUTERAPP", 9, pact::SWAP_SELECTOR)
            .inner(axfer("PACTPOOL", "ROUTERAPP", 31, 900_000))
            .global(&[(b"A", 10), (b"B", 20), (b"L", 14)])
            .build();
        let router = appcall_with_id("TOPTX", "ALICE", 42, b"route")
            .inner(inner_transfer)
            .inner(inner_swap)
            .build();
        let block = block_at(1_700_000_000);

        let out = walker().walk_group(&[router], &block, Some("G"), TxState::Confirmed);
        assert_eq!(out.trades.len(), 1);
        let trade = &out.trades[0];
        assert_eq!(trade.top_tx_id, "TOPTX");
        assert_eq!(trade.trader, "ALICE");
        assert_eq!(trade.protocol, types::DexProtocol::Pact);
    }

    #[test]
    fn lookback_window_spans_two_transactions() {
        let side_a = pay("ALICE", "POOL", 1_000_000);
        let side_b = axfer("ALICE", "POOL", 10, 2_000_000);
        let mint = appcall("ALICE", 7, tinyman::MINT_SELECTOR)
            .inner(axfer("POOL", "ALICE", 99, 1_400_000))
            .local("POOL", &[(b"s1", 1), (b"s2", 2), (b"ilt", 3)])
            .build();
        let block = block_at(1_700_000_000);

        let out = walker().walk_group(&[side_a, side_b, mint], &block, None, TxState::Confirmed);
        assert_eq!(out.liquidity.len(), 1);
        assert_eq!(out.liquidity[0].amount_a, 1_000_000);
        assert_eq!(out.liquidity[0].amount_b, 2_000_000);
    }

    #[tokio::test]
    async fn emit_group_forwards_to_sink() {
        let transfer = pay("BOB", "PACTPOOL", 500_000);
        let call = appcall("BOB", 9, pact::SWAP_SELECTOR)
            .inner(axfer("PACTPOOL", "BOB", 31, 900_000))
            .global(&[(b"A", 10), (b"B", 20), (b"L", 14)])
            .build();
        let block = block_at(1_700_000_000);
        let sink = pool_state::RecordingSink::new();

        let out = walker()
            .emit_group(&[transfer, call], &block, None, TxState::Confirmed, &sink)
            .await
            .unwrap();
        assert_eq!(out.trades.len(), 1);
        assert_eq!(sink.trades.lock().len(), 1);
    }
}
