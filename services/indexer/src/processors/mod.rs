//! Protocol processors.
//!
//! One stateless matcher pair (swap + liquidity) per protocol, plus a
//! pool refresher that re-derives full pool state from an app call.
//! Every entry point returns `None` for a shape mismatch; that is
//! normal control flow, not an error, and the walker continues.

pub mod biatec;
pub mod pact;
pub mod tinyman;

use crate::window::TxWindow;
use types::{Liquidity, Pool, Trade, Transaction, TxState, NATIVE_ASSET_ID};

pub trait SwapProcessor: Send + Sync {
    fn protocol(&self) -> types::DexProtocol;
    fn process(&self, win: &TxWindow<'_>) -> Option<Trade>;
}

pub trait LiquidityProcessor: Send + Sync {
    fn protocol(&self) -> types::DexProtocol;
    fn process(&self, win: &TxWindow<'_>) -> Option<Liquidity>;
}

/// Re-derives full pool state from one of the protocol's app calls,
/// for explicit refreshes outside the trade/liquidity flow.
pub trait PoolRefresher: Send + Sync {
    fn protocol(&self) -> types::DexProtocol;
    fn refresh(&self, win: &TxWindow<'_>) -> Option<Pool>;
}

/// A payment or asset transfer into some address.
pub(crate) struct Incoming<'a> {
    pub pool: &'a str,
    pub asset_id: u64,
    pub amount: u64,
}

/// View `tx` as a transfer into a pool, if it is one.
pub(crate) fn incoming_transfer(tx: Option<&Transaction>) -> Option<Incoming<'_>> {
    let (pool, asset_id, amount) = tx?.receiver_and_amount()?;
    Some(Incoming { pool, asset_id, amount })
}

/// Payments/asset transfers sent by `pool` among the call's inner
/// transactions, in recorded order.
pub(crate) fn outgoing_inners<'a>(
    current: &'a Transaction,
    pool: &str,
) -> impl Iterator<Item = (u64, u64)> + 'a {
    let pool = pool.to_string();
    current.inner_txns.iter().filter_map(move |tx| {
        if tx.sender != pool {
            return None;
        }
        tx.receiver_and_amount().map(|(_, asset, amount)| (asset, amount))
    })
}

/// The transfer-in / transfer-out skeleton shared by every protocol's
/// swap encoding.
pub(crate) struct SwapShape<'a> {
    pub pool: &'a str,
    pub asset_in: u64,
    pub amount_in: u64,
    pub asset_out: u64,
    pub amount_out: u64,
    pub pending_stub: bool,
}

/// Match the common swap skeleton: a transfer into the pool immediately
/// before the call, and the first inner transaction paying out of the
/// pool. A call with no inner transactions is a pending stub, valid
/// only while the group is unconfirmed.
pub(crate) fn swap_shape<'a>(win: &TxWindow<'a>) -> Option<SwapShape<'a>> {
    let inc = incoming_transfer(win.previous1)?;
    let app = win.current.app_call.as_ref()?;

    if win.current.inner_txns.is_empty() {
        if win.tx_state == TxState::Confirmed {
            return None;
        }
        let asset_out = app
            .foreign_assets
            .iter()
            .copied()
            .find(|&id| id != inc.asset_id)
            .unwrap_or(NATIVE_ASSET_ID);
        return Some(SwapShape {
            pool: inc.pool,
            asset_in: inc.asset_id,
            amount_in: inc.amount,
            asset_out,
            amount_out: 0,
            pending_stub: true,
        });
    }

    let (asset_out, amount_out) = outgoing_inners(win.current, inc.pool).next()?;
    Some(SwapShape {
        pool: inc.pool,
        asset_in: inc.asset_id,
        amount_in: inc.amount,
        asset_out,
        amount_out,
        pending_stub: false,
    })
}

/// Skeleton of a liquidity deposit: two transfers into the same pool
/// address immediately before the call, and the LP token paid back out.
pub(crate) struct AddShape<'a> {
    pub pool: &'a str,
    pub asset_id_a: u64,
    pub amount_a: u64,
    pub asset_id_b: u64,
    pub amount_b: u64,
    pub asset_id_lp: u64,
    pub amount_lp: u64,
    pub pending_stub: bool,
}

pub(crate) fn add_shape<'a>(win: &TxWindow<'a>) -> Option<AddShape<'a>> {
    // previous2 funded side A, previous1 side B; both must target the
    // same pool account.
    let side_a = incoming_transfer(win.previous2)?;
    let side_b = incoming_transfer(win.previous1)?;
    if side_a.pool != side_b.pool || side_a.asset_id == side_b.asset_id {
        return None;
    }
    let app = win.current.app_call.as_ref()?;

    let (asset_id_lp, amount_lp, pending_stub) = if win.current.inner_txns.is_empty() {
        if win.tx_state == TxState::Confirmed {
            return None;
        }
        let lp = app
            .foreign_assets
            .iter()
            .copied()
            .find(|&id| id != side_a.asset_id && id != side_b.asset_id)?;
        (lp, 0, true)
    } else {
        let (lp, amount) = outgoing_inners(win.current, side_a.pool).next()?;
        (lp, amount, false)
    };

    // An LP id equal to either side id signals a misparse.
    if asset_id_lp == side_a.asset_id || asset_id_lp == side_b.asset_id {
        return None;
    }

    Some(AddShape {
        pool: side_a.pool,
        asset_id_a: side_a.asset_id,
        amount_a: side_a.amount,
        asset_id_b: side_b.asset_id,
        amount_b: side_b.amount,
        asset_id_lp,
        amount_lp,
        pending_stub,
    })
}

/// Skeleton of a withdrawal: an LP burn into the pool immediately
/// before the call, and two inner transactions paying the sides back.
/// `reverse_outputs` flips the recorded order of the two payouts.
pub(crate) struct RemoveShape<'a> {
    pub pool: &'a str,
    pub asset_id_a: u64,
    pub amount_a: u64,
    pub asset_id_b: u64,
    pub amount_b: u64,
    pub asset_id_lp: u64,
    pub amount_lp: u64,
}

pub(crate) fn remove_shape<'a>(win: &TxWindow<'a>, reverse_outputs: bool) -> Option<RemoveShape<'a>> {
    let burn = incoming_transfer(win.previous1)?;
    let mut outs = outgoing_inners(win.current, burn.pool);
    let first = outs.next()?;
    let second = outs.next()?;
    let ((asset_id_a, amount_a), (asset_id_b, amount_b)) = if reverse_outputs {
        (second, first)
    } else {
        (first, second)
    };
    if burn.asset_id == asset_id_a || burn.asset_id == asset_id_b {
        return None;
    }
    Some(RemoveShape {
        pool: burn.pool,
        asset_id_a,
        amount_a,
        asset_id_b,
        amount_b,
        asset_id_lp: burn.asset_id,
        amount_lp: burn.amount,
    })
}

/// Post-event reserves read from a call's state delta.
pub(crate) struct Reserves {
    pub a: u64,
    pub b: u64,
    pub l: u64,
    pub af: Option<u64>,
    pub bf: Option<u64>,
}

impl Reserves {
    /// Placeholder reserves for pending stubs, which carry no state
    /// delta yet. Never reaches pool state; the manager drops pending
    /// events at the gate.
    pub(crate) fn pending() -> Self {
        Reserves { a: 0, b: 0, l: 0, af: None, bf: None }
    }
}

pub(crate) fn build_trade(win: &TxWindow<'_>, shape: &SwapShape<'_>, r: Reserves, protocol: types::DexProtocol) -> Trade {
    Trade {
        asset_in_id: shape.asset_in,
        asset_out_id: shape.asset_out,
        amount_in: shape.amount_in,
        amount_out: shape.amount_out,
        pool_address: shape.pool.to_string(),
        pool_app_id: win.current.app_call.as_ref().map(|a| a.app_id).unwrap_or(0),
        protocol,
        tx_id: win.current.tx_id.clone(),
        top_tx_id: win.top_tx_id.to_string(),
        block_id: win.block.block_id,
        timestamp: win.block.timestamp,
        trader: win.trader.to_string(),
        state: win.tx_state,
        a: r.a,
        b: r.b,
        l: r.l,
        af: r.af,
        bf: r.bf,
        value_usd: None,
        price_usd: None,
        fees_usd: None,
        fees_usd_provider: None,
        fees_usd_protocol: None,
    }
}

pub(crate) fn build_liquidity(
    win: &TxWindow<'_>,
    pool: &str,
    sides: (u64, u64, u64, u64),
    lp: (u64, u64),
    direction: types::LiquidityDirection,
    r: Reserves,
    protocol: types::DexProtocol,
) -> Liquidity {
    let (asset_id_a, amount_a, asset_id_b, amount_b) = sides;
    Liquidity {
        asset_id_a,
        asset_id_b,
        asset_id_lp: lp.0,
        amount_a,
        amount_b,
        amount_lp: lp.1,
        direction,
        pool_address: pool.to_string(),
        pool_app_id: win.current.app_call.as_ref().map(|a| a.app_id).unwrap_or(0),
        protocol,
        tx_id: win.current.tx_id.clone(),
        top_tx_id: win.top_tx_id.to_string(),
        block_id: win.block.block_id,
        timestamp: win.block.timestamp,
        trader: win.trader.to_string(),
        state: win.tx_state,
        a: r.a,
        b: r.b,
        l: r.l,
        af: r.af,
        bf: r.bf,
        value_usd: None,
        price_usd: None,
    }
}

/// Pool address an app call acts on: the first referenced account, or
/// the receiver of the funding transfer when the call names none.
pub(crate) fn pool_account<'a>(win: &TxWindow<'a>) -> Option<&'a str> {
    let app = win.current.app_call.as_ref()?;
    if let Some(first) = app.accounts.first() {
        return Some(first.as_str());
    }
    incoming_transfer(win.previous1).map(|inc| inc.pool)
}
