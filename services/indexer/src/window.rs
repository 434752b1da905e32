//! Processor input window.

use types::{BlockContext, Transaction, TxState};

/// The slice of context a processor sees for one transaction: the
/// current call, up to two predecessors at the same group/recursion
/// level, and the identity carried down from the top-level transaction.
#[derive(Clone, Copy)]
pub struct TxWindow<'a> {
    pub current: &'a Transaction,
    pub previous1: Option<&'a Transaction>,
    pub previous2: Option<&'a Transaction>,
    pub block: &'a BlockContext,
    pub group_digest: Option<&'a str>,
    /// Id of the originating top-level transaction; correlates events
    /// produced inside inner-transaction trees.
    pub top_tx_id: &'a str,
    /// Sender of the top-level transaction.
    pub trader: &'a str,
    pub tx_state: TxState,
}
